#[derive(clap::Args)]
pub struct ResolveRolesArgs {
    /// Path to a file holding a base64 encoded SAML response
    #[clap(long)]
    assertion_file: std::path::PathBuf,
    /// Only show the grant for this IAM Role ARN; fails when the role is not granted
    #[clap(long)]
    role_arn: Option<String>,
}

pub fn run(args: &ResolveRolesArgs) -> Result<(), anyhow::Error> {
    let grants = resolve(args)?;
    serde_json::to_writer_pretty(std::io::stdout(), &grants)?;
    println!();
    Ok(())
}

fn resolve(args: &ResolveRolesArgs) -> Result<Vec<crate::saml::RoleGrant>, crate::error::Error> {
    let text = std::fs::read_to_string(&args.assertion_file)?;
    let assertion = crate::idp::Assertion::new(text.trim().to_owned());
    match args.role_arn {
        Some(ref role_arn) => Ok(vec![crate::saml::resolve(&assertion, role_arn)?]),
        None => crate::saml::grants(&assertion),
    }
}
