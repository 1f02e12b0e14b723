#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Invalid session duration {0:?}: {1}")]
    InvalidDuration(String, &'static str),

    #[error("Login secret {0} is unavailable: {1}")]
    LoginSecretUnavailable(String, String),

    #[error("Login secret {0} is malformed: {1}")]
    MalformedLoginSecret(String, &'static str),

    #[error("Authentication to IdP failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed SAML assertion: {0}")]
    MalformedAssertion(String),

    #[error("Role {0} is not granted by the SAML assertion")]
    RoleNotGranted(String),

    #[error("Failed to create STS session: {0}")]
    SessionCreationFailed(String),

    #[error("STS credential exchange failed ({}): {code}: {message}", display_status(.status))]
    CredentialExchangeFailed {
        status: Option<reqwest::StatusCode>,
        code: String,
        message: String,
    },

    #[error("Failed to link owner: {0}")]
    OwnerLinkFailed(String),

    #[error(transparent)]
    StdIoError(#[from] std::io::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn exchange_failed(code: &str, message: impl Into<String>) -> Self {
        Self::CredentialExchangeFailed {
            status: None,
            code: code.to_owned(),
            message: message.into(),
        }
    }
}

fn display_status(status: &Option<reqwest::StatusCode>) -> String {
    match status {
        Some(s) => s.to_string(),
        None => "no status".to_string(),
    }
}
