// crecon - courier charge reconciliation, headless

mod exit_codes;
mod export;
mod recon;

use std::process::ExitCode;

use clap::Parser;

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};
use recon::ReconCommands;

#[derive(Parser)]
#[command(name = "crecon")]
#[command(about = "Reconcile courier-billed shipping charges against a contracted rate card")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CRECON_COMMIT"), ")"))]
struct Cli {
    #[command(subcommand)]
    command: ReconCommands,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    log::debug!("crecon {}", env!("CARGO_PKG_VERSION"));

    match recon::cmd_recon(cli.command) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
