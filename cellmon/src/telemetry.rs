//! Logging setup: journald when running under systemd, stderr otherwise.

use std::io::{self, IsTerminal as _, Write as _};

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{
    EnvFilter,
    layer::SubscriberExt as _,
    util::{SubscriberInitExt as _, TryInitError},
};

pub const SYSLOG_IDENTIFIER: &str = "worldcoin-cellmon";

/// Installs the global subscriber. `RUST_LOG` overrides the default `INFO` level.
///
/// Journald is only tried when stderr is not a terminal. If its socket cannot be
/// reached the daemon logs to stderr and says so once the subscriber is up.
pub fn init() -> Result<LogGuard, TryInitError> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let (journald, journald_err) = if io::stderr().is_terminal() {
        (None, None)
    } else {
        match tracing_journald::layer() {
            Ok(layer) => (
                Some(layer.with_syslog_identifier(SYSLOG_IDENTIFIER.to_owned())),
                None,
            ),
            Err(e) => (None, Some(e)),
        }
    };
    let stderr = journald
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(stderr)
        .with(journald)
        .with(filter)
        .try_init()?;

    if let Some(e) = journald_err {
        warn!(error = %e, "journald socket unavailable, logging to stderr");
    }

    Ok(LogGuard(()))
}

/// Flushes stdout and stderr when dropped, so a report printed right before exit
/// is not lost.
#[must_use = "dropping the guard right away flushes too early"]
pub struct LogGuard(());

impl Drop for LogGuard {
    fn drop(&mut self) {
        io::stderr().flush().ok();
        io::stdout().flush().ok();
    }
}
