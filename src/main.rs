use std::io::Write;
use std::process::ExitCode;

use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;

use crate::error::SubmitError;
use crate::settings::Settings;

mod error;
mod model;
mod security;
mod settings;
mod submission;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Begin logging
    // Logs go to stderr so the receipt is the only thing on stdout
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Could not install logger: {e}");
    }

    report(run().await, &mut std::io::stdout().lock())
}

async fn run() -> Result<String, SubmitError> {
    let settings = Settings::from_env()?;
    submission::submit_application(&settings).await
}

/// Writes the receipt as the only line of output, or logs the failure.
fn report(result: Result<String, SubmitError>, out: &mut impl Write) -> ExitCode {
    match result {
        Ok(receipt) => {
            if let Err(e) = writeln!(out, "{receipt}") {
                error!("Could not write receipt {receipt}: {e}");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
