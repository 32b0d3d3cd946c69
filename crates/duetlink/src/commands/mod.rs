//! Command dispatch: bridges CLI args -> core controller -> output formatting.

pub mod config_cmd;
pub mod file_info;
pub mod gcode;
pub mod machine_config;
pub mod monitor;
pub mod status;

use std::future::Future;
use std::io::IsTerminal;

use secrecy::SecretString;
use tracing::debug;

use duetlink_core::{Controller, ControllerConfig, CoreError};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Password prompts before giving up on a board that keeps rejecting them.
const PASSWORD_ATTEMPTS: usize = 3;

/// Dispatch a board-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: ControllerConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Monitor(args) => monitor::handle(config, args, global).await,
        Command::Status(args) => status::handle(config, &args, global).await,
        Command::Gcode(args) => gcode::handle(config, args, global).await,
        Command::FileInfo => file_info::handle(config, global).await,
        Command::MachineConfig => machine_config::handle(config, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

/// Run `f` inside a short-lived session.
///
/// A rejected password is asked for again on an interactive terminal.
pub async fn oneshot<T, F, Fut>(mut config: ControllerConfig, f: F) -> Result<T, CliError>
where
    F: Fn(Controller) -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let mut attempts = 0;
    loop {
        match Controller::oneshot(config.clone(), &f).await {
            Err(CoreError::PasswordRequired) if attempts < PASSWORD_ATTEMPTS && can_prompt() => {
                attempts += 1;
                config.password = prompt_password().await?;
            }
            other => return other.map_err(CliError::from),
        }
    }
}

/// Connect a long-lived controller, prompting for the password if needed.
pub async fn connect(controller: &Controller) -> Result<(), CliError> {
    let mut password = None;
    let mut attempts = 0;
    loop {
        match controller.connect(password.take()).await {
            Ok(()) => return Ok(()),
            Err(CoreError::PasswordRequired) if attempts < PASSWORD_ATTEMPTS && can_prompt() => {
                attempts += 1;
                password = Some(prompt_password().await?);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn can_prompt() -> bool {
    std::io::stdin().is_terminal()
}

async fn prompt_password() -> Result<SecretString, CliError> {
    debug!("board asked for a password");
    let entered = tokio::task::spawn_blocking(|| rpassword::prompt_password("Board password: "))
        .await
        .map_err(|e| CliError::Prompt(e.to_string()))??;
    Ok(SecretString::from(entered))
}

/// Ask a yes/no question, auto-approving if `--yes` was passed.
///
/// Without a terminal the answer is no.
pub async fn confirm(message: String, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !can_prompt() {
        return Ok(false);
    }
    tokio::task::spawn_blocking(move || {
        dialoguer::Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
    })
    .await
    .map_err(|e| CliError::Prompt(e.to_string()))?
    .map_err(|e| CliError::Prompt(e.to_string()))
}
