pub mod config;
pub mod console;
mod error;
pub mod flow;
pub mod logging;
pub mod storage;

pub use crate::config::Settings;
pub use console::{Console, Terminal};
pub use error::{Field, FlowError};
pub use flow::{Flow, Outcome, Verification};
pub use storage::{SavedFiles, TokenFiles};

use std::future::Future;
use std::io::{self, Write};

/// Load settings and walk the user through the flow on stdin/stdout
pub async fn run() -> Result<(), FlowError> {
    let settings = Settings::new().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("\nSettings are optional. A config.toml may contain:");
        eprintln!("\noutput_dir = \"/path/for/token/files\"");
        eprintln!("request_timeout_secs = 30");
        eprintln!("env_file = \".env.local\"");
        FlowError::from(e)
    })?;

    settings.validate().map_err(|e| {
        eprintln!("Configuration validation failed: {}", e);
        FlowError::Configuration(e)
    })?;

    let client = settings.oauth_client()?;
    let files = TokenFiles::new(settings.output_dir()?);
    tracing::info!(output_dir = %files.dir().display(), "Configuration loaded");

    let mut flow = Flow::new(Console::stdio(), client, files, settings.env_file);
    flow.execute().await
}

/// Drive `flow` until it finishes or `cancel` resolves first.
///
/// Unexpected flow errors are written to `out` with their full cause chain.
/// Returns `true` when the user cancelled.
pub async fn run_until<F, C, W>(flow: F, cancel: C, out: &mut W) -> io::Result<bool>
where
    F: Future<Output = Result<(), FlowError>>,
    C: Future,
    W: Write,
{
    tokio::select! {
        result = flow => {
            if let Err(e) = result {
                let e = anyhow::Error::from(e);
                tracing::error!(error = ?e, "Unhandled error");
                writeln!(out, "\n❌ Error: {}", e)?;
                writeln!(out, "{:?}", e)?;
            }
            Ok(false)
        }
        _ = cancel => {
            tracing::info!("Cancelled by user");
            writeln!(out, "\n\n❌ Script cancelled by user.")?;
            Ok(true)
        }
    }
}
