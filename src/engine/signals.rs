// src/engine/signals.rs

use std::io;

use tokio::task::JoinHandle;
use tracing::info;

use crate::exec::Terminator;
use crate::types::Signal;

/// Forward `SIGTERM`, `SIGINT` and `SIGHUP` received by this process to the
/// child via `terminator`.
///
/// Handlers are installed before this returns, so a signal arriving while
/// the task is still being prepared is not lost. Only the first signal is
/// relayed; the task ends once it has.
#[cfg(unix)]
pub fn spawn_signal_relay(terminator: Terminator) -> io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;
    let mut hup = signal(SignalKind::hangup())?;

    Ok(tokio::spawn(async move {
        let received = tokio::select! {
            _ = term.recv() => Signal::Term,
            _ = int.recv() => Signal::Int,
            _ = hup.recv() => Signal::Hup,
            _ = terminator.token().cancelled() => return,
        };
        info!(signal = %received, "received signal; relaying to child");
        terminator.terminate(received);
    }))
}

#[cfg(not(unix))]
pub fn spawn_signal_relay(terminator: Terminator) -> io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    tracing::warn!(error = %e, "failed to listen for Ctrl+C");
                    return;
                }
                info!("received Ctrl+C; relaying to child");
                terminator.terminate(Signal::Int);
            }
            _ = terminator.token().cancelled() => {}
        }
    }))
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn relay_exits_once_termination_is_requested_elsewhere() {
        let terminator = Terminator::new();
        let relay = spawn_signal_relay(terminator.clone()).unwrap();

        terminator.terminate(Signal::Term);
        tokio::time::timeout(Duration::from_secs(5), relay)
            .await
            .unwrap()
            .unwrap();
    }
}
