//! Render exchanged credentials as an AWS shared credentials file profile.

pub const AWS_ACCESS_KEY_ID: &str = "aws_access_key_id";
pub const AWS_SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
pub const AWS_SESSION_TOKEN: &str = "aws_session_token";
pub const AWS_SECURITY_TOKEN: &str = "aws_security_token";
pub const X_PRINCIPAL_ARN: &str = "x_principal_arn";
pub const X_SECURITY_TOKEN_EXPIRES: &str = "x_security_token_expires";
pub const REGION: &str = "region";

pub struct CredentialsProfile<'a> {
    profile: &'a str,
    entries: Vec<(&'static str, String)>,
}

impl<'a> CredentialsProfile<'a> {
    pub fn new(profile: &'a str, credential: &crate::sts::ExchangedCredential) -> Self {
        use secrecy::ExposeSecret;

        let mut entries = vec![
            (AWS_ACCESS_KEY_ID, credential.access_key_id.clone()),
            (
                AWS_SECRET_ACCESS_KEY,
                credential.secret_access_key.expose_secret().to_owned(),
            ),
            (AWS_SESSION_TOKEN, credential.session_token.clone()),
            (AWS_SECURITY_TOKEN, credential.security_token.clone()),
            (X_PRINCIPAL_ARN, credential.principal_arn.clone()),
            (X_SECURITY_TOKEN_EXPIRES, credential.expires.to_rfc3339()),
        ];
        if !credential.region.is_empty() {
            entries.push((REGION, credential.region.clone()));
        }
        Self { profile, entries }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl<'a> std::fmt::Display for CredentialsProfile<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        writeln!(f, "[{}]", self.profile)?;
        for (k, v) in self.entries.iter() {
            writeln!(f, "{k} = {v}")?;
        }
        Ok(())
    }
}
