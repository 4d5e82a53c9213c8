//! Tunesync - keeps now-playing assets and text outputs in sync.
//!
//! Usage: `tunesync [config-path]`. Without a path the platform config
//! directory is used and a default config is created on first run.

mod logging;
mod prompt;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, info};
use tunesync_core::AppConfig;

use crate::logging::LoggingConfig;
use crate::prompt::StdinPrompt;

#[tokio::main]
async fn main() -> ExitCode {
    let _guard = match logging::init(&LoggingConfig::auto()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging to file disabled: {e}");
            None
        }
    };

    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(AppConfig::config_file_path, PathBuf::from);
    info!("Starting Tunesync with config {}", config_path.display());

    let shutdown = Arc::new(AtomicBool::new(false));

    // The core is synchronous and uses a blocking HTTP client, so the whole
    // session lives on a blocking thread.
    let mut session = tokio::task::spawn_blocking({
        let shutdown = Arc::clone(&shutdown);
        move || {
            let prompt = StdinPrompt::stdin(Arc::clone(&shutdown));
            session::run(&config_path, &prompt, &shutdown)
        }
    });

    let joined = tokio::select! {
        joined = &mut session => joined,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("Couldn't listen for Ctrl-C: {}", e);
            }
            info!("Shutting down");
            shutdown.store(true, Ordering::SeqCst);
            session.await
        }
    };

    match joined {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            error!("Session failed: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Session task panicked: {}", e);
            ExitCode::FAILURE
        }
    }
}
