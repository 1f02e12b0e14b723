//! Identity provider authentication.
//!
//! The provider protocol itself (ADFS forms login, Azure MFA push, ...) lives outside this crate;
//! [`Authenticator`] is the single atomic call the exchange relies on.

pub struct LoginDetails {
    pub username: String,
    pub url: String,
    pub password: secrecy::SecretString,
}

impl std::fmt::Debug for LoginDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginDetails")
            .field("username", &self.username)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

/// base64 encoded SAML response as returned by the IdP
#[derive(Clone, PartialEq, Eq)]
pub struct Assertion(String);

impl Assertion {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Assertion({} bytes)", self.0.len())
    }
}

#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate and return the assertion. Any failure is `Error::AuthenticationFailed`.
    async fn authenticate(
        &self,
        details: &LoginDetails,
    ) -> Result<Assertion, crate::error::Error>;
}

#[async_trait::async_trait]
impl<T: Authenticator + ?Sized> Authenticator for std::sync::Arc<T> {
    async fn authenticate(
        &self,
        details: &LoginDetails,
    ) -> Result<Assertion, crate::error::Error> {
        (**self).authenticate(details).await
    }
}

pub const ENV_USERNAME: &str = "SAML2STS_USERNAME";
pub const ENV_URL: &str = "SAML2STS_URL";

/// Runs a helper program that speaks the provider protocol.
///
/// The helper gets the username and URL through the environment and the password on stdin,
/// and prints the base64 assertion on stdout.
#[derive(Debug, Clone)]
pub struct CommandAuthenticator {
    program: String,
    args: Vec<String>,
}

impl CommandAuthenticator {
    pub fn new(program: String, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

fn auth_failed(message: String) -> crate::error::Error {
    crate::error::Error::AuthenticationFailed(message)
}

#[async_trait::async_trait]
impl Authenticator for CommandAuthenticator {
    async fn authenticate(
        &self,
        details: &LoginDetails,
    ) -> Result<Assertion, crate::error::Error> {
        use secrecy::ExposeSecret;
        use tokio::io::AsyncWriteExt;

        tracing::debug!(message = "Running IdP helper", program = %self.program, username = %details.username, url = %details.url);

        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .env(ENV_USERNAME, &details.username)
            .env(ENV_URL, &details.url)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| auth_failed(format!("failed to spawn {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            let written = async {
                stdin
                    .write_all(details.password.expose_secret().as_bytes())
                    .await?;
                stdin.write_all(b"\n").await
            }
            .await;
            if let Err(e) = written {
                tracing::warn!(message = "IdP helper did not accept password on stdin", program = %self.program, error = ?e);
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| auth_failed(format!("failed to wait for {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(auth_failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let assertion = String::from_utf8(output.stdout)
            .map_err(|_| auth_failed(format!("{} printed non-utf8 output", self.program)))?
            .trim()
            .to_owned();
        if assertion.is_empty() {
            return Err(auth_failed(format!(
                "{} printed no assertion",
                self.program
            )));
        }
        Ok(Assertion::new(assertion))
    }
}
