pub struct TestConfig {
    inner: crate::config::Config,
    pub tmpdir: temp_dir::TempDir,
}

impl std::ops::Deref for TestConfig {
    type Target = crate::config::Config;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl TestConfig {
    pub fn new() -> Self {
        let tmpdir = temp_dir::TempDir::with_prefix("saml2sts-dev").unwrap();
        let inner =
            crate::config::Config::new(Some(tmpdir.path().into()), test_config_data()).unwrap();
        Self { inner, tmpdir }
    }

    pub fn config(&self) -> crate::config::Config {
        self.inner.clone()
    }
}

pub fn test_config_data() -> crate::config::ConfigData {
    crate::config::ConfigData {
        idp_endpoint: "https://adfs.test.invalid/adfs/ls/IdpInitiatedSignOn.aspx".to_string(),
        aws_region: "us-east-1".to_string(),
        session_duration: "1h".to_string(),
        sts_endpoint: None,
    }
}

pub fn federation_request() -> crate::secret::FederationRequest {
    crate::secret::FederationRequest {
        api_version: "saml.example.com/v1".to_string(),
        kind: "Saml2Aws".to_string(),
        name: "dev".to_string(),
        namespace: "team-a".to_string(),
        uid: "6c4f9a8e-0000-4000-8000-000000000001".to_string(),
        login_secret_name: "adfs-login".to_string(),
        role_arn: "arn:aws:iam::111:role/Dev".to_string(),
        target_secret_name: "dev-aws-credentials".to_string(),
    }
}

pub fn login_secret(username: Option<&str>, password: Option<&str>) -> crate::secret::SecretObject {
    let mut secret = crate::secret::SecretObject::new(crate::secret::ObjectMeta {
        name: "adfs-login".to_string(),
        namespace: "team-a".to_string(),
        owner_references: vec![],
    });
    if let Some(u) = username {
        secret
            .data
            .insert(crate::secret::USERNAME_KEY.to_string(), u.as_bytes().to_vec());
    }
    if let Some(p) = password {
        secret
            .data
            .insert(crate::secret::PASSWORD_KEY.to_string(), p.as_bytes().to_vec());
    }
    secret
}

pub const TEST_EXPIRATION: &str = "2026-10-18T13:34:41Z";

pub fn exchanged_credential() -> crate::sts::ExchangedCredential {
    crate::sts::ExchangedCredential {
        access_key_id: "AK1".to_string(),
        secret_access_key: secrecy::SecretString::new("SK1".to_string()),
        session_token: "TOK1".to_string(),
        security_token: "TOK1".to_string(),
        principal_arn: "arn:aws:sts::111:assumed-role/Dev/alice@example.com".to_string(),
        expires: chrono::DateTime::parse_from_rfc3339(TEST_EXPIRATION)
            .unwrap()
            .with_timezone(&chrono::Local),
        region: "us-east-1".to_string(),
    }
}

/// base64 SAML response granting `(role ARN, principal ARN)` pairs
pub fn assertion(roles: &[(&str, &str)]) -> crate::idp::Assertion {
    let entries: Vec<String> = roles.iter().map(|(r, p)| format!("{r},{p}")).collect();
    assertion_with_entries(&entries.iter().map(|e| e.as_str()).collect::<Vec<_>>())
}

pub fn assertion_with_entries(entries: &[&str]) -> crate::idp::Assertion {
    use base64ct::Encoding;

    let values: String = entries
        .iter()
        .map(|e| format!("        <saml:AttributeValue>{e}</saml:AttributeValue>\n"))
        .collect();
    let xml = indoc::formatdoc!(
        r#"
            <samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion">
              <saml:Assertion>
                <saml:AttributeStatement>
                  <saml:Attribute Name="https://aws.amazon.com/SAML/Attributes/RoleSessionName">
                    <saml:AttributeValue>alice@example.com</saml:AttributeValue>
                  </saml:Attribute>
                  <saml:Attribute Name="https://aws.amazon.com/SAML/Attributes/Role">
            {}      </saml:Attribute>
                </saml:AttributeStatement>
              </saml:Assertion>
            </samlp:Response>
        "#,
        values
    );
    crate::idp::Assertion::new(base64ct::Base64::encode_string(xml.as_bytes()))
}

pub fn sts_response_xml(access_key_id: &str, secret_access_key: &str, session_token: &str) -> String {
    indoc::formatdoc!(
        r#"
            <AssumeRoleWithSAMLResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
              <AssumeRoleWithSAMLResult>
                <Audience>https://signin.aws.amazon.com/saml</Audience>
                <AssumedRoleUser>
                  <AssumedRoleId>AROAEXAMPLE:alice@example.com</AssumedRoleId>
                  <Arn>arn:aws:sts::111:assumed-role/Dev/alice@example.com</Arn>
                </AssumedRoleUser>
                <Credentials>
                  <AccessKeyId>{}</AccessKeyId>
                  <SecretAccessKey>{}</SecretAccessKey>
                  <SessionToken>{}</SessionToken>
                  <Expiration>{}</Expiration>
                </Credentials>
                <Issuer>http://adfs.test.invalid/adfs/services/trust</Issuer>
                <Subject>alice@example.com</Subject>
                <SubjectType>persistent</SubjectType>
              </AssumeRoleWithSAMLResult>
              <ResponseMetadata>
                <RequestId>c6104cbe-af31-11e0-8154-cbc7ccf896c7</RequestId>
              </ResponseMetadata>
            </AssumeRoleWithSAMLResponse>
        "#,
        access_key_id, secret_access_key, session_token, TEST_EXPIRATION
    )
}

pub fn sts_error_xml(code: &str, message: &str) -> String {
    indoc::formatdoc!(
        r#"
            <ErrorResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
              <Error>
                <Type>Sender</Type>
                <Code>{}</Code>
                <Message>{}</Message>
              </Error>
              <RequestId>c6104cbe-af31-11e0-8154-cbc7ccf896c7</RequestId>
            </ErrorResponse>
        "#,
        code, message
    )
}

/// Authenticator returning a fixed assertion (or failure), recording `(username, url, password)`.
pub struct MockAuthenticator {
    result: Result<crate::idp::Assertion, String>,
    calls: std::sync::Mutex<Vec<(String, String, String)>>,
}

impl MockAuthenticator {
    pub fn new(assertion: crate::idp::Assertion) -> Self {
        Self {
            result: Ok(assertion),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl crate::idp::Authenticator for MockAuthenticator {
    async fn authenticate(
        &self,
        details: &crate::idp::LoginDetails,
    ) -> Result<crate::idp::Assertion, crate::error::Error> {
        use secrecy::ExposeSecret;
        self.calls.lock().unwrap().push((
            details.username.clone(),
            details.url.clone(),
            details.password.expose_secret().clone(),
        ));
        self.result
            .clone()
            .map_err(crate::error::Error::AuthenticationFailed)
    }
}

type RecordedStsRequest = (String, Option<String>, crate::sts::AssumeRoleWithSamlRequest);

/// Token service handing out `AK<n>`/`SK<n>`/`TOK<n>` for the n-th call.
pub struct MockTokenService {
    requests: std::sync::Mutex<Vec<RecordedStsRequest>>,
    failure: std::sync::Mutex<Option<fn() -> crate::error::Error>>,
}

impl MockTokenService {
    pub fn new() -> Self {
        Self {
            requests: std::sync::Mutex::new(Vec::new()),
            failure: std::sync::Mutex::new(None),
        }
    }

    pub fn fail_with(&self, f: fn() -> crate::error::Error) {
        *self.failure.lock().unwrap() = Some(f);
    }

    pub fn requests(&self) -> Vec<RecordedStsRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl crate::sts::TokenService for MockTokenService {
    async fn assume_role_with_saml(
        &self,
        target: crate::sts::Target<'_>,
        request: &crate::sts::AssumeRoleWithSamlRequest,
    ) -> Result<crate::sts::AssumeRoleWithSamlResponse, crate::error::Error> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push((
                target.region.to_owned(),
                target.endpoint.map(|e| e.to_owned()),
                request.clone(),
            ));
            requests.len()
        };
        if let Some(f) = *self.failure.lock().unwrap() {
            return Err(f());
        }
        crate::sts::parse_response(&sts_response_xml(
            &format!("AK{n}"),
            &format!("SK{n}"),
            &format!("TOK{n}"),
        ))
    }
}

#[derive(Default)]
pub struct MemorySecretStore {
    secrets: std::sync::Mutex<
        std::collections::HashMap<crate::secret::SecretRef, crate::secret::SecretObject>,
    >,
}

impl MemorySecretStore {
    pub fn insert(&self, secret: crate::secret::SecretObject) {
        self.secrets
            .lock()
            .unwrap()
            .insert(secret.secret_ref(), secret);
    }
}

#[async_trait::async_trait]
impl crate::store::SecretStore for MemorySecretStore {
    async fn get(
        &self,
        secret_ref: &crate::secret::SecretRef,
    ) -> Result<crate::secret::SecretObject, crate::error::Error> {
        self.secrets
            .lock()
            .unwrap()
            .get(secret_ref)
            .cloned()
            .ok_or_else(|| {
                crate::error::Error::LoginSecretUnavailable(
                    secret_ref.to_string(),
                    "not found".to_string(),
                )
            })
    }
}

pub const FAKE_STS_EXPIRED_ASSERTION: &str = "expired";

async fn fake_sts(
    axum::Form(params): axum::Form<std::collections::HashMap<String, String>>,
) -> (axum::http::StatusCode, String) {
    let get = |k: &str| params.get(k).cloned().unwrap_or_default();
    if get("SAMLAssertion") == FAKE_STS_EXPIRED_ASSERTION {
        return (
            axum::http::StatusCode::BAD_REQUEST,
            sts_error_xml("ExpiredTokenException", "Token has expired"),
        );
    }
    let token = [
        "Action",
        "Version",
        "PrincipalArn",
        "RoleArn",
        "SAMLAssertion",
        "DurationSeconds",
    ]
    .iter()
    .map(|k| get(k))
    .collect::<Vec<_>>()
    .join("|");
    (
        axum::http::StatusCode::OK,
        sts_response_xml("AKFAKE", "SKFAKE", &token),
    )
}

/// Serve a fake STS on an ephemeral port; returns its endpoint URL.
pub async fn spawn_fake_sts() -> String {
    let app = axum::Router::new().route("/", axum::routing::post(fake_sts));
    let server = axum::Server::bind(&std::net::SocketAddr::from(([127, 0, 0, 1], 0)))
        .serve(app.into_make_service());
    let addr = server.local_addr();
    tokio::spawn(server);
    format!("http://{addr}/")
}
