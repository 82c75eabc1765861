use anyhow::Result;
use changegen::cli::Cli;
use changegen::error::ChangegenError;
use console::style;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.common.verbose);

    let err = match cli.execute() {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };

    match err.downcast_ref::<ChangegenError>() {
        Some(source_err) if source_err.is_source_access() => {
            eprintln!("\n{} {err:#}", style("Error:").red().bold());
            eprintln!("{}", remediation(source_err));
            std::process::exit(1);
        }
        _ => Err(err),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn remediation(err: &ChangegenError) -> &'static str {
    match err {
        ChangegenError::NotFound(_) => {
            "Check the repository URL and that your GITHUB_TOKEN can see it (private repositories need the `repo` scope)."
        }
        ChangegenError::Unauthorized(_) => {
            "Check GITHUB_TOKEN: private repositories need the `repo` scope, public ones `public_repo`.\n  export GITHUB_TOKEN='your-token'"
        }
        ChangegenError::Network(_) => "Check your network connection and try again.",
        ChangegenError::GitRepo(_) | ChangegenError::GitDiscover(_) => {
            "Check that --local points at a git repository with at least one commit."
        }
        _ => "Check the repository reference and your access to it.",
    }
}
