use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let guard = match dropbox_token::logging::init_logging() {
        Ok((path, guard)) => {
            tracing::info!(log = %path.display(), "Logging initialized");
            Some(guard)
        }
        Err(e) => {
            eprintln!("Logging disabled: {}", e);
            None
        }
    };

    let cancelled = dropbox_token::run_until(
        dropbox_token::run(),
        tokio::signal::ctrl_c(),
        &mut std::io::stdout(),
    )
    .await?;

    // A pending stdin read would block runtime shutdown
    if cancelled {
        drop(guard);
        std::process::exit(0);
    }

    Ok(())
}
