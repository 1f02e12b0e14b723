#[derive(clap::Args)]
pub struct ExchangeArgs {
    /// Path to a JSON file with idp_endpoint, aws_region, session_duration and sts_endpoint
    ///
    /// Command line options take precedence over values in the file.
    #[clap(long)]
    config: Option<std::path::PathBuf>,
    /// ADFS endpoint URL
    #[clap(long, env = "SAML2STS_IDP_ENDPOINT")]
    idp_endpoint: Option<String>,
    /// AWS region for STS
    #[clap(long, env = "AWS_REGION")]
    region: Option<String>,
    /// Session duration, e.g. `1h` or `90m`; defaults to 1h
    #[clap(long, env = "SAML2STS_SESSION_DURATION")]
    session_duration: Option<String>,
    /// Alternate STS endpoint URL
    #[clap(long, env = "AWS_ENDPOINT")]
    sts_endpoint: Option<String>,
    /// Directory holding secrets; defaults to $RUNTIME_DIRECTORY
    #[clap(long)]
    configuration_directory: Option<std::path::PathBuf>,

    /// Identity provider kind
    #[clap(arg_enum, long, default_value = "adfs")]
    provider: crate::account::ProviderKind,
    /// Program performing the IdP login
    ///
    /// Receives SAML2STS_USERNAME and SAML2STS_URL in its environment and the password on stdin,
    /// and must print a base64 encoded SAML response on stdout.
    #[clap(long)]
    helper: String,
    /// Argument to pass to the helper; can specify multiple times
    #[clap(long = "helper-arg")]
    helper_args: Vec<String>,

    /// Namespace of the login secret and the target secret
    #[clap(long)]
    namespace: String,
    /// Name of the secret holding `username` and `password`
    #[clap(long)]
    login_secret: String,
    /// IAM Role ARN to assume
    #[clap(long)]
    role_arn: String,
    /// Name of the secret to write credentials into
    #[clap(long)]
    target_secret: String,

    /// apiVersion of the owning resource
    #[clap(long)]
    owner_api_version: String,
    /// Kind of the owning resource
    #[clap(long)]
    owner_kind: String,
    /// Name of the owning resource
    #[clap(long)]
    owner_name: String,
    /// UID of the owning resource
    #[clap(long)]
    owner_uid: String,

    /// Print the secret as JSON instead of storing it
    #[clap(long, action = clap::ArgAction::SetTrue)]
    print: bool,
}

const DEFAULT_SESSION_DURATION: &str = "1h";

impl ExchangeArgs {
    async fn config_data(&self) -> Result<crate::config::ConfigData, crate::error::Error> {
        let given = crate::config::ConfigData {
            idp_endpoint: self.idp_endpoint.clone().unwrap_or_default(),
            aws_region: self.region.clone().unwrap_or_default(),
            session_duration: self.session_duration.clone().unwrap_or_default(),
            sts_endpoint: self.sts_endpoint.clone(),
        };
        let from_file = match self.config {
            Some(ref path) => crate::config::ConfigData::from_file(path).await?,
            None => crate::config::ConfigData::default(),
        };
        let data = given.or(from_file).or(crate::config::ConfigData {
            session_duration: DEFAULT_SESSION_DURATION.to_string(),
            ..Default::default()
        });
        data.validate()?;
        Ok(data)
    }

    fn request(&self) -> crate::secret::FederationRequest {
        crate::secret::FederationRequest {
            api_version: self.owner_api_version.clone(),
            kind: self.owner_kind.clone(),
            name: self.owner_name.clone(),
            namespace: self.namespace.clone(),
            uid: self.owner_uid.clone(),
            login_secret_name: self.login_secret.clone(),
            role_arn: self.role_arn.clone(),
            target_secret_name: self.target_secret.clone(),
        }
    }
}

#[tokio::main]
pub async fn run(args: &ExchangeArgs) -> Result<(), anyhow::Error> {
    let data = args.config_data().await?;
    let config = crate::config::Config::new(args.configuration_directory.clone(), data)?;
    tracing::debug!(config = ?config);

    let store = crate::store::DirectorySecretStore::new(config.clone());
    let exchanger = crate::exchange::Exchanger::new(
        config.into_inner(),
        store.clone(),
        crate::idp::CommandAuthenticator::new(args.helper.clone(), args.helper_args.clone()),
        crate::sts::StsClient::new()?,
    )
    .with_provider(args.provider);

    let request = args.request();
    let (credential, profile) = exchanger.run(&request).await?;
    let secret = crate::exchange::materialize(
        &crate::secret::ControllerOwnerLinker,
        &request,
        &credential,
        &profile,
    )?;

    if args.print {
        serde_json::to_writer_pretty(std::io::stdout(), &secret)?;
        println!();
    } else {
        let path = store.save(&secret).await?;
        tracing::info!(message = "Stored credentials", secret = %secret.secret_ref(), path = ?path, expires = %credential.expires);
    }
    Ok(())
}
