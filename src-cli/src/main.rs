//! StudyAI command-line client
//!
//! Every command prints a JSON envelope on stdout; logs go to stderr.
//! Session-only logins last for a single invocation.

pub use self::error::{Error, Result};
mod error;

mod cli;
mod commands;
#[cfg(test)]
mod test_support;

use clap::Parser;
use cli::Cli;
use commands::CommandResult;
use studyai_core::{App, Config};

#[tokio::main]
async fn main() {
    studyai_core::init_logging();

    let args = Cli::parse();

    match run(args).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            let _ = CommandResult::<()>::err(e.to_string()).emit();
            std::process::exit(1);
        }
    }
}

async fn run(args: Cli) -> Result<bool> {
    let config = Config::from_env()?;
    let app = App::new(config)?;

    commands::execute(&app, args.command).await
}
