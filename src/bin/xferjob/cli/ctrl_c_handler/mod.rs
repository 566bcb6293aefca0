use tokio::task::JoinHandle;
use tokio::{select, signal};
use tracing::{debug, error, warn};

use xferjob::types::token::PipelineCancellationToken;

/// Cancels the run on ctrl-c(and SIGTERM on unix).
///
/// Jobs already in flight are finished as cancelled and the resume state is saved,
/// so the same run id can be resumed later.
pub fn spawn_ctrl_c_handler(cancellation_token: PipelineCancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        select! {
            _ = cancellation_token.cancelled() => {
                debug!("cancellation_token canceled.")
            }
            result = shutdown_signal() => {
                match result {
                    Ok(signal_name) => {
                        warn!(signal = signal_name, "signal received, cancelling outstanding jobs.");
                        cancellation_token.cancel();
                    }
                    Err(e) => {
                        error!("failed to listen for shutdown signal: {e}");
                    }
                }
            }
        }
    })
}

#[cfg(target_family = "unix")]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    select! {
        result = signal::ctrl_c() => result.map(|_| "SIGINT"),
        _ = sigterm.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(target_family = "unix"))]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    signal::ctrl_c().await.map(|_| "ctrl-c")
}
