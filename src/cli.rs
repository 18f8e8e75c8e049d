use clap::Parser;

/// Provisioning takes no subcommands: a bare invocation converges the host.
/// Run-time values come from the environment, the env file, or prompts.
#[derive(Parser)]
#[command(name = "stackup")]
#[command(version)]
#[command(
    about = "Provision an Apache + MySQL + Certbot web stack on Ubuntu",
    long_about = None
)]
#[command(after_help = "\
Environment:
  DB_NAME         database name (default: project_db)
  DB_USER         database user (default: project_user)
  DB_PASS         database password (prompted without echo if unset)
  DOMAIN          site domain, certificate also covers www.DOMAIN (prompted if unset)
  CERTBOT_EMAIL   registration email for certbot (optional)")]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only report failures
    #[arg(short, long)]
    pub quiet: bool,

    /// Check every step and report what would change, without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// List the provisioning steps and exit
    #[arg(long)]
    pub list_steps: bool,

    /// Key-value file with DB_NAME, DB_USER, DB_PASS, DOMAIN, CERTBOT_EMAIL
    #[arg(long, env = "STACKUP_ENV_FILE", value_name = "PATH")]
    pub env_file: Option<String>,
}
