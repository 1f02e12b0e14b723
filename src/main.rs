#[derive(clap::Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Authenticate to the IdP, assume a role with the SAML assertion and store the credentials
    Exchange(saml2sts::cmd::exchange::ExchangeArgs),
    /// Show AWS role grants carried by a SAML assertion
    ResolveRoles(saml2sts::cmd::resolve_roles::ResolveRolesArgs),
}

fn main() -> Result<(), anyhow::Error> {
    use clap::Parser;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Exchange(args) => saml2sts::cmd::exchange::run(args),
        Commands::ResolveRoles(args) => saml2sts::cmd::resolve_roles::run(args),
    }
}
