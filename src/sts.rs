//! sts:AssumeRoleWithSAML client

const API_VERSION: &str = "2011-06-15";

/// https://docs.aws.amazon.com/STS/latest/APIReference/API_AssumeRoleWithSAML.html
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleWithSamlRequest {
    pub principal_arn: String,
    pub role_arn: String,
    pub saml_assertion: String,
    pub duration_seconds: u32,
}

#[derive(Debug, Clone)]
pub struct AssumeRoleWithSamlResponse {
    pub assumed_role_user: AssumedRoleUser,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumedRoleUser {
    pub arn: String,
    pub assumed_role_id: String,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub expiration: chrono::DateTime<chrono::Utc>,
    pub secret_access_key: secrecy::SecretString,
    pub session_token: String,
}

/// Where to send the request
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub region: &'a str,
    /// Overrides the regional endpoint when given
    pub endpoint: Option<&'a str>,
}

impl<'a> Target<'a> {
    pub fn url(&self) -> Result<url::Url, crate::error::Error> {
        let u = match self.endpoint {
            Some(e) => e.to_owned(),
            None => format!("https://sts.{}.amazonaws.com/", self.region),
        };
        let url = url::Url::parse(&u).map_err(|e| {
            crate::error::Error::SessionCreationFailed(format!("STS endpoint {u:?} is malformed: {e}"))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            s => Err(crate::error::Error::SessionCreationFailed(format!(
                "STS endpoint {u:?} has unsupported scheme {s}"
            ))),
        }
    }
}

#[async_trait::async_trait]
pub trait TokenService: Send + Sync {
    async fn assume_role_with_saml(
        &self,
        target: Target<'_>,
        request: &AssumeRoleWithSamlRequest,
    ) -> Result<AssumeRoleWithSamlResponse, crate::error::Error>;
}

#[async_trait::async_trait]
impl<T: TokenService + ?Sized> TokenService for std::sync::Arc<T> {
    async fn assume_role_with_saml(
        &self,
        target: Target<'_>,
        request: &AssumeRoleWithSamlRequest,
    ) -> Result<AssumeRoleWithSamlResponse, crate::error::Error> {
        (**self).assume_role_with_saml(target, request).await
    }
}

/// Temporary credentials produced by one exchange
#[derive(Debug, Clone)]
pub struct ExchangedCredential {
    pub access_key_id: String,
    pub secret_access_key: secrecy::SecretString,
    pub session_token: String,
    /// Same value as `session_token`; some consumers still read the older field name
    pub security_token: String,
    pub principal_arn: String,
    pub expires: chrono::DateTime<chrono::Local>,
    pub region: String,
}

/// Exchange `assertion` for credentials of `grant`'s role.
pub async fn exchange(
    service: &dyn TokenService,
    account: &crate::account::AccountDescriptor,
    grant: &crate::saml::RoleGrant,
    assertion: &crate::idp::Assertion,
) -> Result<ExchangedCredential, crate::error::Error> {
    let request = AssumeRoleWithSamlRequest {
        principal_arn: grant.principal_arn.clone(),
        role_arn: grant.role_arn.clone(),
        saml_assertion: assertion.as_str().to_owned(),
        duration_seconds: account.session_duration,
    };
    let target = Target {
        region: &account.region,
        endpoint: account.sts_endpoint.as_deref(),
    };

    tracing::info!(message = "Requesting AWS credentials using SAML assertion", role_arn = %request.role_arn, principal_arn = %request.principal_arn, duration_seconds = request.duration_seconds, region = %target.region, endpoint = ?target.endpoint);

    let resp = service.assume_role_with_saml(target, &request).await?;

    Ok(ExchangedCredential {
        access_key_id: resp.credentials.access_key_id,
        secret_access_key: resp.credentials.secret_access_key,
        security_token: resp.credentials.session_token.clone(),
        session_token: resp.credentials.session_token,
        principal_arn: resp.assumed_role_user.arn,
        expires: resp.credentials.expiration.with_timezone(&chrono::Local),
        region: account.region.clone(),
    })
}

/// AWS Query protocol client for STS. AssumeRoleWithSAML is an unsigned call.
#[derive(Debug, Clone)]
pub struct StsClient {
    http_client: reqwest::Client,
}

impl StsClient {
    pub fn new() -> Result<Self, crate::error::Error> {
        let http_client = reqwest::ClientBuilder::new()
            .user_agent(concat!("saml2sts/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| crate::error::Error::SessionCreationFailed(e.to_string()))?;
        Ok(Self { http_client })
    }
}

fn transport_error(e: reqwest::Error) -> crate::error::Error {
    if e.is_connect() || e.is_builder() {
        crate::error::Error::SessionCreationFailed(e.to_string())
    } else {
        crate::error::Error::exchange_failed("TransportError", e.to_string())
    }
}

#[async_trait::async_trait]
impl TokenService for StsClient {
    async fn assume_role_with_saml(
        &self,
        target: Target<'_>,
        request: &AssumeRoleWithSamlRequest,
    ) -> Result<AssumeRoleWithSamlResponse, crate::error::Error> {
        let url = target.url()?;
        let duration = request.duration_seconds.to_string();
        let params = [
            ("Action", "AssumeRoleWithSAML"),
            ("Version", API_VERSION),
            ("PrincipalArn", request.principal_arn.as_str()),
            ("RoleArn", request.role_arn.as_str()),
            ("SAMLAssertion", request.saml_assertion.as_str()),
            ("DurationSeconds", duration.as_str()),
        ];

        let resp = self
            .http_client
            .post(url)
            .form(&params)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let body = resp.text().await.map_err(transport_error)?;
        if status.is_success() {
            parse_response(&body)
        } else {
            let (code, message) = parse_error_response(&body);
            tracing::warn!(message = "STS rejected AssumeRoleWithSAML", status = %status, code = %code, error_message = %message);
            Err(crate::error::Error::CredentialExchangeFailed {
                status: Some(status),
                code,
                message,
            })
        }
    }
}

fn invalid_response(message: impl Into<String>) -> crate::error::Error {
    crate::error::Error::exchange_failed("InvalidResponse", message)
}

fn find_text<'a>(node: roxmltree::Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(|n| n.text())
        .map(|t| t.trim())
}

fn find_element<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

pub(crate) fn parse_response(body: &str) -> Result<AssumeRoleWithSamlResponse, crate::error::Error> {
    let doc = roxmltree::Document::parse(body).map_err(|e| invalid_response(e.to_string()))?;
    let root = doc.root_element();

    let credentials = find_element(root, "Credentials")
        .ok_or_else(|| invalid_response("Credentials is missing"))?;
    let user = find_element(root, "AssumedRoleUser")
        .ok_or_else(|| invalid_response("AssumedRoleUser is missing"))?;

    let required = |node, name: &'static str| {
        find_text(node, name).ok_or_else(|| invalid_response(format!("{name} is missing")))
    };

    let expiration = required(credentials, "Expiration")?;
    let expiration = chrono::DateTime::parse_from_rfc3339(expiration)
        .map_err(|e| invalid_response(format!("Expiration {expiration:?} is malformed: {e}")))?
        .with_timezone(&chrono::Utc);

    Ok(AssumeRoleWithSamlResponse {
        assumed_role_user: AssumedRoleUser {
            arn: required(user, "Arn")?.to_owned(),
            assumed_role_id: find_text(user, "AssumedRoleId")
                .unwrap_or_default()
                .to_owned(),
        },
        credentials: Credentials {
            access_key_id: required(credentials, "AccessKeyId")?.to_owned(),
            expiration,
            secret_access_key: secrecy::SecretString::new(
                required(credentials, "SecretAccessKey")?.to_owned(),
            ),
            session_token: required(credentials, "SessionToken")?.to_owned(),
        },
    })
}

/// `(Code, Message)` of an ErrorResponse; falls back to the raw body.
pub(crate) fn parse_error_response(body: &str) -> (String, String) {
    if let Ok(doc) = roxmltree::Document::parse(body) {
        let root = doc.root_element();
        if let Some(code) = find_text(root, "Code") {
            let message = find_text(root, "Message").unwrap_or_default();
            return (code.to_owned(), message.to_owned());
        }
    }
    ("Unknown".to_owned(), body.trim().to_owned())
}
