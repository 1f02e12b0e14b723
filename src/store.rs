//! Secret lookup and a directory-backed implementation.

#[async_trait::async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(
        &self,
        secret_ref: &crate::secret::SecretRef,
    ) -> Result<crate::secret::SecretObject, crate::error::Error>;
}

#[async_trait::async_trait]
impl<T: SecretStore + ?Sized> SecretStore for std::sync::Arc<T> {
    async fn get(
        &self,
        secret_ref: &crate::secret::SecretRef,
    ) -> Result<crate::secret::SecretObject, crate::error::Error> {
        (**self).get(secret_ref).await
    }
}

fn validate_name(kind: &str, name: &str) -> Result<(), crate::error::Error> {
    if name.is_empty() {
        return Err(crate::error::Error::ConfigError(format!(
            "{kind} cannot be empty"
        )));
    }
    if name.starts_with('.') {
        return Err(crate::error::Error::ConfigError(format!(
            "{kind} cannot start with '.' (dot)"
        )));
    }
    if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
        return Err(crate::error::Error::ConfigError(format!(
            "{kind} cannot include path separator"
        )));
    }
    Ok(())
}

/// Secrets stored as `<config_dir>/secrets/<namespace>/<name>.json`
#[derive(Debug, Clone)]
pub struct DirectorySecretStore {
    config: crate::config::Config,
}

impl DirectorySecretStore {
    pub fn new(config: crate::config::Config) -> Self {
        Self { config }
    }

    fn path(
        &self,
        secret_ref: &crate::secret::SecretRef,
    ) -> Result<std::path::PathBuf, crate::error::Error> {
        validate_name("namespace", &secret_ref.namespace)?;
        validate_name("secret name", &secret_ref.name)?;
        Ok(self
            .config
            .path_for_secret(&secret_ref.namespace, &secret_ref.name))
    }

    /// Replace a secret atomically; readers see either the old or the new object.
    pub async fn save(
        &self,
        secret: &crate::secret::SecretObject,
    ) -> Result<std::path::PathBuf, crate::error::Error> {
        use tokio::io::AsyncWriteExt;

        let secret_ref = secret.secret_ref();
        let path = self.path(&secret_ref)?;
        let json = serde_json::to_vec_pretty(secret)?;

        let dir = self.config.ensure_namespace_dir(&secret_ref.namespace).await?;
        let wip_path = dir.join(format!(".wip.{}", secret_ref.name));
        remove_file_ignoring_enoent(&wip_path).await?;
        {
            let mut file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(0o600)
                .open(&wip_path)
                .await?;
            file.write_all(&json).await?;
            file.write_all("\n".as_bytes()).await?;
            file.sync_all().await?;
        }
        tokio::fs::rename(&wip_path, &path).await?;
        tracing::debug!(message = "Saved secret", secret = %secret_ref, path = ?path);
        Ok(path)
    }

    pub async fn remove(
        &self,
        secret_ref: &crate::secret::SecretRef,
    ) -> Result<(), crate::error::Error> {
        let path = self.path(secret_ref)?;
        remove_file_ignoring_enoent(&path).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SecretStore for DirectorySecretStore {
    async fn get(
        &self,
        secret_ref: &crate::secret::SecretRef,
    ) -> Result<crate::secret::SecretObject, crate::error::Error> {
        let unavailable = |reason: String| {
            crate::error::Error::LoginSecretUnavailable(secret_ref.to_string(), reason)
        };

        let path = self.path(secret_ref).map_err(|e| unavailable(e.to_string()))?;
        let json = match tokio::fs::read(&path).await {
            Ok(v) => v,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(unavailable("not found".to_string()));
            }
            Err(e) => {
                tracing::error!(message = "Failed to read secret", secret = %secret_ref, path = ?path, error = ?e);
                return Err(unavailable(e.to_string()));
            }
        };
        serde_json::from_slice(&json).map_err(|e| unavailable(format!("invalid json: {e}")))
    }
}

async fn remove_file_ignoring_enoent(path: &std::path::Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(v) => Ok(v),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
