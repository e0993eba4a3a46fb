use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    cell::CellInfo,
    error::{Error, Result},
    forward::Forwarder,
    session::ModemSession,
    transport::Transport,
};

/// Shortest accepted polling interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Refreshes the serving cell on a fixed interval and hands each reading to a
/// [`Forwarder`].
pub struct Poller {
    forwarder: Box<dyn Forwarder>,
    interval: Duration,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(
        forwarder: Box<dyn Forwarder>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            forwarder,
            interval: interval.max(MIN_POLL_INTERVAL),
            cancel,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Polls until cancelled or until the session hits an unrecoverable error.
    ///
    /// A cycle that overruns the interval delays the next tick. The session is handed
    /// back on cancellation so the caller decides when the transport is closed.
    pub async fn run<T>(&self, mut session: ModemSession<T>) -> Result<ModemSession<T>>
    where
        T: Transport + 'static,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(port = %session.port(), interval = ?self.interval, "poller started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let (returned, result) = poll_once(session).await?;
            session = returned;

            match result {
                Ok(Some(cell_info)) => {
                    if let Err(e) = self.forwarder.forward(&cell_info).await {
                        warn!(error = %e, "failed to forward cell info");
                    }
                }
                Ok(None) => {
                    debug!(rat = ?session.rat(), "no cell info to forward this cycle");
                }
                Err(Error::Cancelled) => break,
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, "poll cycle failed");
                }
                Err(e) => return Err(e),
            }
        }

        info!(port = %session.port(), "poller stopped");
        Ok(session)
    }
}

/// Runs one blocking refresh off the async runtime and gives the session back.
async fn poll_once<T>(
    mut session: ModemSession<T>,
) -> Result<(ModemSession<T>, Result<Option<CellInfo>>)>
where
    T: Transport + 'static,
{
    let task = tokio::task::spawn_blocking(move || {
        let result = session.refresh_cell_info().map(|c| c.cloned());
        (session, result)
    });

    match task.await {
        Ok(done) => Ok(done),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(_) => Err(Error::Cancelled),
    }
}
