use std::{
    io::{self, Read, Write},
    time::Duration,
};

use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// The byte level duplex channel to the modem.
///
/// Reads block for at most the transport's read timeout. A timeout is reported as an
/// [`io::ErrorKind::TimedOut`] error, end of stream as `Ok(0)`.
pub trait Transport: Send {
    /// The device path, used to name the transport in errors.
    fn name(&self) -> &str;

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Discards anything still pending in the input and output buffers.
    fn reset_buffers(&mut self) -> io::Result<()>;
}

/// Line settings used to open the serial device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub path: String,
    pub baud_rate: u32,
    pub parity: Parity,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub read_timeout: Duration,
}

impl SerialSettings {
    /// 115200 8N1 with a one second read timeout.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: 115_200,
            parity: Parity::None,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            read_timeout: Duration::from_secs(1),
        }
    }
}

/// A [`Transport`] backed by a serial device.
pub struct SerialTransport {
    path: String,
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Opens the serial device with the given line settings.
    pub fn open(settings: &SerialSettings) -> Result<Self> {
        let port = serialport::new(&settings.path, settings.baud_rate)
            .parity(settings.parity)
            .data_bits(settings.data_bits)
            .stop_bits(settings.stop_bits)
            .timeout(settings.read_timeout)
            .open()
            .map_err(|e| Error::transport(&settings.path, e))?;

        info!(
            port = %settings.path,
            baud_rate = settings.baud_rate,
            parity = ?settings.parity,
            data_bits = ?settings.data_bits,
            stop_bits = ?settings.stop_bits,
            read_timeout = ?settings.read_timeout,
            "opened serial port"
        );

        Ok(Self {
            path: settings.path.clone(),
            port,
        })
    }
}

impl Transport for SerialTransport {
    fn name(&self) -> &str {
        &self.path
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }

    fn reset_buffers(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::All)?;
        Ok(())
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        debug!(port = %self.path, "closing serial port");
    }
}

/// Names of the serial ports present on this machine.
pub fn list_ports() -> serialport::Result<Vec<String>> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
