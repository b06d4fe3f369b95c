//! OS signal shim.
//!
//! Waits for Ctrl-C or SIGTERM and turns the first one into a
//! [`ShutdownSignal`] trigger. The tick loop picks the flag up at the top
//! of its next tick.

use smartshop_core::shutdown::ShutdownSignal;
use tokio::signal;
use tracing::{error, info};

/// Spawn the task that triggers `shutdown` on the first termination signal.
pub fn spawn_listener(shutdown: ShutdownSignal) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => info!(signal = "SIGINT", "Signal received, checking all current sessions out"),
            () = terminate => info!(signal = "SIGTERM", "Signal received, checking all current sessions out"),
        }

        shutdown.trigger();
    })
}
