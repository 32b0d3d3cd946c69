mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a board connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "duetlink", &mut std::io::stdout());
            Ok(())
        }

        // All other commands talk to a board
        cmd => {
            let cfg = duetlink_config::load_config()?;
            let (profile, controller_config) = config::resolve(&cli.global, &cfg)?;

            tracing::debug!(command = ?cmd, profile = %profile, url = %controller_config.url, "dispatching command");
            commands::dispatch(cmd, controller_config, &cli.global)
                .await
                .map_err(|e| e.with_profile(&profile))
        }
    }
}
