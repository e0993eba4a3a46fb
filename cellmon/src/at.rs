//! One AT command per call over an exclusively owned [`Transport`].

use std::{
    io,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    transport::Transport,
};

/// Size of a single read from the transport. Responses larger than this are
/// accumulated over several reads.
pub const READ_CHUNK: usize = 100;

/// Line terminator appended to every command.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Terminator {
    #[default]
    Crlf,
    Cr,
    Lf,
}

impl Terminator {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Terminator::Crlf => b"\r\n",
            Terminator::Cr => b"\r",
            Terminator::Lf => b"\n",
        }
    }
}

/// Command/response channel to the modem.
///
/// Methods take `&mut self`, so a channel can never have two commands in flight.
pub struct AtChannel<T> {
    transport: T,
    terminator: Terminator,
    cancel: CancellationToken,
}

impl<T: Transport> AtChannel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            terminator: Terminator::default(),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_terminator(self, terminator: Terminator) -> Self {
        Self { terminator, ..self }
    }

    /// Reads stop with [`Error::Cancelled`] once `cancel` fires.
    #[must_use]
    pub fn with_cancellation(self, cancel: CancellationToken) -> Self {
        Self { cancel, ..self }
    }

    pub fn port(&self) -> &str {
        self.transport.name()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Sends `command` and reads until a chunk containing a newline arrives.
    ///
    /// Fails with [`Error::TransportUnavailable`] if the transport times out or
    /// reaches end of stream first.
    pub fn execute(&mut self, command: &str) -> Result<Vec<u8>> {
        self.send(command)?;

        let mut response = Vec::with_capacity(READ_CHUNK);
        loop {
            self.check_cancelled()?;
            let start = response.len();
            self.read_chunk(&mut response)
                .map_err(|e| Error::transport(self.transport.name(), e))?;
            if response[start..].contains(&b'\n') {
                break;
            }
        }

        self.log_response(command, &response);
        Ok(response)
    }

    /// Sends `command` and accumulates the response until `is_complete` accepts it
    /// or `max_wait` elapses.
    ///
    /// Running out of time with a partial response is not an error here: the
    /// partial buffer is returned and left to the decoder to reject. Only a
    /// transport that never produces a single byte fails with
    /// [`Error::TransportUnavailable`].
    pub fn execute_until(
        &mut self,
        command: &str,
        is_complete: impl Fn(&[u8]) -> bool,
        max_wait: Duration,
    ) -> Result<Vec<u8>> {
        self.send(command)?;

        let started = Instant::now();
        let mut response = Vec::with_capacity(READ_CHUNK);
        loop {
            self.check_cancelled()?;
            match self.read_chunk(&mut response) {
                Ok(_) if is_complete(&response) => break,
                Ok(_) => {}
                // Slow modems pause mid response, keep going until max_wait.
                Err(e) if e.kind() == io::ErrorKind::TimedOut && !response.is_empty() => {}
                Err(e) => return Err(Error::transport(self.transport.name(), e)),
            }
            if started.elapsed() >= max_wait {
                debug!(
                    command,
                    waited = ?started.elapsed(),
                    "response incomplete, giving up waiting"
                );
                break;
            }
        }

        self.log_response(command, &response);
        Ok(response)
    }

    /// Drops whatever is left in the transport's input and output buffers.
    pub fn reset_buffers(&mut self) -> Result<()> {
        self.transport
            .reset_buffers()
            .map_err(|e| Error::transport(self.transport.name(), e))
    }

    fn send(&mut self, command: &str) -> Result<()> {
        debug!(command, port = %self.transport.name(), "sending AT command");
        let mut line = Vec::with_capacity(command.len() + 2);
        line.extend_from_slice(command.as_bytes());
        line.extend_from_slice(self.terminator.as_bytes());
        self.transport
            .write_all(&line)
            .map_err(|e| Error::transport(self.transport.name(), e))
    }

    /// Appends one read to `response`. End of stream is turned into an error.
    fn read_chunk(&mut self, response: &mut Vec<u8>) -> io::Result<usize> {
        let mut buf = [0u8; READ_CHUNK];
        match self.transport.read(&mut buf)? {
            0 => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no bytes read from modem",
            )),
            n => {
                response.extend_from_slice(&buf[..n]);
                Ok(n)
            }
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    fn log_response(&self, command: &str, response: &[u8]) {
        let text = String::from_utf8_lossy(response);
        if text.contains("ERROR") {
            warn!(command, response = %text, "AT command returned error");
        } else {
            debug!(command, response = %text, "AT command response");
        }
    }
}
