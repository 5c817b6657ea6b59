mod cmd;
mod config;
mod error;

use clap::Parser;

use config::{Cli, Commands};
use error::ServerError;

/// Config problems are operator mistakes and get their own exit code
/// so init scripts can tell them apart from runtime failures.
fn exit_code(e: &ServerError) -> i32 {
    match e {
        ServerError::Config { .. } => 2,
        _ => 1,
    }
}

async fn dispatch(cli: Cli) -> Result<(), ServerError> {
    match cli.command {
        Commands::Serve(args) => cmd::serve::run(args).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,deals_server=debug".into()),
        )
        .init();

    if let Err(e) = dispatch(Cli::parse()).await {
        tracing::error!(error = %e, "deals-server exited with error");
        std::process::exit(exit_code(&e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_distinctly() {
        let config = ServerError::Config {
            context: "parse",
            detail: "bad toml".to_string(),
        };
        let runtime = ServerError::Signal(std::io::Error::other("boom"));
        assert_eq!(exit_code(&config), 2);
        assert_eq!(exit_code(&runtime), 1);
    }
}
