//! SAML to STS exchange pipeline
//!
//! `ReadingLogin -> BuildingDescriptor -> Authenticating -> ResolvingRole -> ExchangingCredentials`,
//! aborting on the first failure. Nothing is cached between runs and nothing is persisted here;
//! callers store the materialized secret themselves.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    ReadingLogin,
    BuildingDescriptor,
    Authenticating,
    ResolvingRole,
    ExchangingCredentials,
    Materializing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match *self {
            Self::ReadingLogin => "reading-login",
            Self::BuildingDescriptor => "building-descriptor",
            Self::Authenticating => "authenticating",
            Self::ResolvingRole => "resolving-role",
            Self::ExchangingCredentials => "exchanging-credentials",
            Self::Materializing => "materializing",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Running(Stage),
    Done,
    Failed(Stage),
}

/// Error annotated with the stage that produced it
#[derive(thiserror::Error, Debug)]
#[error("{stage} failed: {error}")]
pub struct Failure {
    pub stage: Stage,
    #[source]
    pub error: crate::error::Error,
}

impl Failure {
    pub fn state(&self) -> State {
        State::Failed(self.stage)
    }
}

struct Progress {
    state: State,
}

impl Progress {
    fn new() -> Self {
        Self { state: State::Idle }
    }

    fn enter(&mut self, stage: Stage) {
        tracing::debug!(message = "Entering stage", from = ?self.state, stage = %stage);
        self.state = State::Running(stage);
    }

    fn done(&mut self) {
        self.state = State::Done;
    }

    /// Attach the current stage to `error`.
    fn fail(&mut self, error: crate::error::Error) -> Failure {
        let stage = match self.state {
            State::Running(s) => s,
            _ => unreachable!("failure outside of a running stage (BUG)"),
        };
        self.state = State::Failed(stage);
        tracing::error!(message = "Credential exchange failed", stage = %stage, error = %error);
        Failure { stage, error }
    }
}

pub struct Exchanger<S, A, T> {
    config: crate::config::ConfigData,
    provider: crate::account::ProviderKind,
    secrets: S,
    authenticator: A,
    token_service: T,
}

impl<S, A, T> Exchanger<S, A, T>
where
    S: crate::store::SecretStore,
    A: crate::idp::Authenticator,
    T: crate::sts::TokenService,
{
    pub fn new(
        config: crate::config::ConfigData,
        secrets: S,
        authenticator: A,
        token_service: T,
    ) -> Self {
        Self {
            config,
            provider: crate::account::ProviderKind::Adfs,
            secrets,
            authenticator,
            token_service,
        }
    }

    pub fn with_provider(mut self, provider: crate::account::ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    /// Run the whole pipeline for `request`, returning the credential and its profile label.
    pub async fn run(
        &self,
        request: &crate::secret::FederationRequest,
    ) -> Result<(crate::sts::ExchangedCredential, String), Failure> {
        use tracing::Instrument;
        let span = tracing::info_span!("exchange", request = %format!("{}/{}", request.namespace, request.name), role_arn = %request.role_arn);
        async move {
            let mut progress = Progress::new();

            progress.enter(Stage::ReadingLogin);
            let login = self
                .read_login(request)
                .await
                .map_err(|e| progress.fail(e))?;

            progress.enter(Stage::BuildingDescriptor);
            let account = crate::account::AccountDescriptor::build_for(
                self.provider,
                &self.config,
                &login.username,
                &request.role_arn,
            )
            .map_err(|e| progress.fail(e))?;
            tracing::debug!(account = ?account);

            progress.enter(Stage::Authenticating);
            let assertion = self
                .authenticator
                .authenticate(&account.login_details(login.password))
                .await
                .map_err(|e| progress.fail(e))?;

            progress.enter(Stage::ResolvingRole);
            let grant = crate::saml::resolve(&assertion, &account.role_arn)
                .map_err(|e| progress.fail(e))?;

            progress.enter(Stage::ExchangingCredentials);
            let credential =
                crate::sts::exchange(&self.token_service, &account, &grant, &assertion)
                    .await
                    .map_err(|e| progress.fail(e))?;

            progress.done();
            tracing::info!(message = "Exchanged SAML assertion for AWS credentials", access_key_id = %credential.access_key_id, principal_arn = %credential.principal_arn, expires = %credential.expires);
            Ok((credential, account.profile.to_owned()))
        }
        .instrument(span)
        .await
    }

    async fn read_login(
        &self,
        request: &crate::secret::FederationRequest,
    ) -> Result<crate::secret::LoginIdentity, crate::error::Error> {
        let secret_ref = request.login_secret();
        let secret = match self.secrets.get(&secret_ref).await {
            Ok(v) => v,
            Err(e @ crate::error::Error::LoginSecretUnavailable(_, _)) => return Err(e),
            Err(e) => {
                return Err(crate::error::Error::LoginSecretUnavailable(
                    secret_ref.to_string(),
                    e.to_string(),
                ))
            }
        };
        crate::secret::LoginIdentity::from_secret(&secret)
    }
}

/// Package `credential` into the secret owned by `request`.
pub fn materialize(
    linker: &dyn crate::secret::OwnerLinker,
    request: &crate::secret::FederationRequest,
    credential: &crate::sts::ExchangedCredential,
    profile: &str,
) -> Result<crate::secret::SecretObject, Failure> {
    let payload = crate::credentials_file::CredentialsProfile::new(profile, credential).into_bytes();
    crate::secret::materialize(linker, payload, request).map_err(|error| {
        tracing::error!(message = "Failed to materialize secret", stage = %Stage::Materializing, error = %error);
        Failure {
            stage: Stage::Materializing,
            error,
        }
    })
}
