//! IdP account descriptor for a single exchange

pub const DEFAULT_PROFILE: &str = "saml";
pub const AMAZON_WEBSERVICES_URN: &str = "urn:amazon:webservices";

/// Identity provider backends. Each kind fixes the MFA flavour it drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
pub enum ProviderKind {
    #[serde(rename = "ADFS")]
    Adfs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MfaKind {
    Azure,
}

impl ProviderKind {
    pub fn mfa(&self) -> MfaKind {
        match *self {
            Self::Adfs => MfaKind::Azure,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Adfs => "ADFS",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for MfaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Azure => f.write_str("Azure"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AccountDescriptor {
    pub url: String,
    pub username: String,
    pub provider: ProviderKind,
    pub mfa: MfaKind,
    pub skip_verify: bool,
    pub region: String,
    pub role_arn: String,
    pub session_duration: u32,
    pub profile: &'static str,
    pub amazon_webservices_urn: &'static str,
    /// Alternate STS endpoint carried from configuration
    pub sts_endpoint: Option<String>,
}

impl AccountDescriptor {
    /// Build an ADFS descriptor. Fails with `InvalidDuration` before anything else is touched.
    pub fn build(
        config: &crate::config::ConfigData,
        username: &str,
        role_arn: &str,
    ) -> Result<Self, crate::error::Error> {
        Self::build_for(ProviderKind::Adfs, config, username, role_arn)
    }

    pub fn build_for(
        provider: ProviderKind,
        config: &crate::config::ConfigData,
        username: &str,
        role_arn: &str,
    ) -> Result<Self, crate::error::Error> {
        let session_duration = crate::duration::parse_seconds(&config.session_duration)?;

        Ok(Self {
            url: config.idp_endpoint.clone(),
            username: username.to_owned(),
            provider,
            mfa: provider.mfa(),
            skip_verify: false,
            region: config.aws_region.clone(),
            role_arn: role_arn.to_owned(),
            session_duration,
            profile: DEFAULT_PROFILE,
            amazon_webservices_urn: AMAZON_WEBSERVICES_URN,
            sts_endpoint: config.sts_endpoint.clone(),
        })
    }

    pub fn login_details(&self, password: secrecy::SecretString) -> crate::idp::LoginDetails {
        crate::idp::LoginDetails {
            username: self.username.clone(),
            url: self.url.clone(),
            password,
        }
    }
}
