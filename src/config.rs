#[derive(Debug, Clone, Default)]
pub struct Config {
    config_dir: std::path::PathBuf,
    inner: ConfigData,
}

impl Config {
    pub fn new(
        config_dir: Option<std::path::PathBuf>,
        inner: ConfigData,
    ) -> Result<Self, crate::error::Error> {
        let config_dir_ = match config_dir {
            Some(v) => v,
            None => std::env::var("RUNTIME_DIRECTORY")
                .map_err(|_| {
                    crate::error::Error::ConfigError(
                        "--configuration-directory is required or provide $RUNTIME_DIRECTORY"
                            .to_string(),
                    )
                })?
                .into(),
        };

        Ok(Self {
            config_dir: config_dir_,
            inner,
        })
    }

    pub fn into_inner(self) -> ConfigData {
        self.inner
    }

    pub fn config_dir(&self) -> std::path::PathBuf {
        self.config_dir.clone()
    }

    pub(crate) fn path_for_secret(&self, namespace: &str, name: &str) -> std::path::PathBuf {
        self.config_dir()
            .join(SUBDIR_SECRETS)
            .join(namespace)
            .join(format!("{name}.json"))
    }

    /// Ensure subdirectories
    pub(crate) async fn ensure_namespace_dir(
        &self,
        namespace: &str,
    ) -> Result<std::path::PathBuf, crate::error::Error> {
        use std::os::unix::fs::PermissionsExt;

        let path = self.config_dir().join(SUBDIR_SECRETS).join(namespace);
        tokio::fs::create_dir_all(&path).await?;
        let mut perm = tokio::fs::metadata(&path).await?.permissions();
        perm.set_mode(0o700);
        tokio::fs::set_permissions(&path, perm).await?;
        Ok(path)
    }
}

impl std::ops::Deref for Config {
    type Target = ConfigData;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// IdP and AWS parameters shared by every exchange.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ConfigData {
    /// ADFS endpoint URL used to authenticate
    pub idp_endpoint: String,
    pub aws_region: String,
    /// Session duration in duration syntax, e.g. `1h`
    pub session_duration: String,
    /// Alternate STS endpoint; regional endpoint is used when absent
    #[serde(default)]
    pub sts_endpoint: Option<String>,
}

const SUBDIR_SECRETS: &str = "secrets";

impl ConfigData {
    pub async fn from_file(path: &std::path::Path) -> Result<Self, crate::error::Error> {
        let json = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&json)?)
    }

    /// Fill fields left empty with values from `other`.
    pub fn or(self, other: ConfigData) -> Self {
        fn pick(a: String, b: String) -> String {
            if a.is_empty() {
                b
            } else {
                a
            }
        }
        Self {
            idp_endpoint: pick(self.idp_endpoint, other.idp_endpoint),
            aws_region: pick(self.aws_region, other.aws_region),
            session_duration: pick(self.session_duration, other.session_duration),
            sts_endpoint: self.sts_endpoint.or(other.sts_endpoint),
        }
    }

    pub fn validate(&self) -> Result<(), crate::error::Error> {
        if self.idp_endpoint.is_empty() {
            return Err(crate::error::Error::ConfigError(
                "IdP endpoint (--idp-endpoint) is missing".to_string(),
            ));
        }
        url::Url::parse(&self.idp_endpoint).map_err(|_| {
            crate::error::Error::ConfigError("IdP endpoint (--idp-endpoint) is malformed".to_string())
        })?;
        if self.aws_region.is_empty() {
            return Err(crate::error::Error::ConfigError(
                "AWS region not specified; use --region or $AWS_REGION".to_string(),
            ));
        }
        if self.session_duration.is_empty() {
            return Err(crate::error::Error::ConfigError(
                "session duration (--session-duration) is missing".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn data(idp: &str, region: &str, duration: &str) -> ConfigData {
        ConfigData {
            idp_endpoint: idp.to_string(),
            aws_region: region.to_string(),
            session_duration: duration.to_string(),
            sts_endpoint: None,
        }
    }

    #[test]
    fn test_or_prefers_self() {
        let merged = data("https://adfs.example.com", "", "").or(ConfigData {
            sts_endpoint: Some("http://localhost:4566".to_string()),
            ..data("https://other.example.com", "eu-west-1", "1h")
        });
        assert_eq!(merged.idp_endpoint, "https://adfs.example.com");
        assert_eq!(merged.aws_region, "eu-west-1");
        assert_eq!(merged.session_duration, "1h");
        assert_eq!(merged.sts_endpoint.as_deref(), Some("http://localhost:4566"));
    }

    #[test]
    fn test_validate() {
        data("https://adfs.example.com", "us-east-1", "1h")
            .validate()
            .unwrap();
        assert!(data("", "us-east-1", "1h").validate().is_err());
        assert!(data("not a url", "us-east-1", "1h").validate().is_err());
        assert!(data("https://adfs.example.com", "", "1h").validate().is_err());
        assert!(data("https://adfs.example.com", "us-east-1", "")
            .validate()
            .is_err());
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = temp_dir::TempDir::with_prefix("saml2sts-config").unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            indoc::indoc! {r#"
                {
                  "idp_endpoint": "https://adfs.example.com/adfs/ls/IdpInitiatedSignOn.aspx",
                  "aws_region": "ap-northeast-1",
                  "session_duration": "2h"
                }
            "#},
        )
        .unwrap();
        let data = ConfigData::from_file(&path).await.unwrap();
        assert_eq!(data.aws_region, "ap-northeast-1");
        assert_eq!(data.session_duration, "2h");
        assert!(data.sts_endpoint.is_none());
    }

    #[test]
    fn test_path_for_secret() {
        let config = Config::new(Some("/run/saml2sts".into()), ConfigData::default()).unwrap();
        assert_eq!(
            config.path_for_secret("team-a", "login"),
            std::path::PathBuf::from("/run/saml2sts/secrets/team-a/login.json")
        );
    }
}
