//! Layered configuration: built-in defaults < YAML file < `CELLMON_` environment < CLI.

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use serialport::{DataBits, Parity, StopBits};

use crate::{
    at::Terminator,
    forward::{ForwarderKind, HARVEST_URL},
    poller::MIN_POLL_INTERVAL,
    session::SessionSettings,
    transport::SerialSettings,
};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/cellmon.yml";
pub const ENV_PREFIX: &str = "CELLMON_";

/// Shortest accepted serial read timeout.
pub const MIN_READ_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LineParity {
    #[default]
    None,
    Odd,
    Even,
}

impl From<LineParity> for Parity {
    fn from(parity: LineParity) -> Self {
        match parity {
            LineParity::None => Parity::None,
            LineParity::Odd => Parity::Odd,
            LineParity::Even => Parity::Even,
        }
    }
}

/// Polls a cellular modem over its AT command port and forwards serving cell info.
#[derive(Debug, Parser, Serialize)]
#[command(author, version)]
pub struct Args {
    #[command(subcommand)]
    #[serde(skip)]
    pub command: Option<Command>,
    /// The path to the config file.
    #[arg(long, env = "CELLMON_CONFIG")]
    #[serde(skip)]
    pub config: Option<PathBuf>,
    /// Label used in logs.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Serial device of the modem's AT port.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Polling interval in seconds.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newline_code: Option<Terminator>,
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parity: Option<LineParity>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopbits: Option<u8>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baudrate: Option<u32>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub databits: Option<u8>,
    /// Serial read timeout in seconds.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_timeout: Option<u64>,
    /// Longest time in milliseconds a single AT response is waited for.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_wait: Option<u64>,
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwarder: Option<ForwarderKind>,
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harvest_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Poll the modem and forward cell info until stopped (default).
    Run,
    /// Print the modem identity and current cell info as JSON, then exit.
    Once,
    /// List the serial ports present on this machine.
    ListPorts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub name: String,
    pub path: String,
    /// Seconds between polls.
    pub interval: u64,
    pub newline_code: Terminator,
    pub parity: LineParity,
    pub stopbits: u8,
    pub baudrate: u32,
    pub databits: u8,
    /// Seconds.
    pub read_timeout: u64,
    /// Milliseconds.
    pub response_wait: u64,
    pub forwarder: ForwarderKind,
    pub harvest_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "eg25g".to_owned(),
            path: "/dev/ttyUSB2".to_owned(),
            interval: 60,
            newline_code: Terminator::Crlf,
            parity: LineParity::None,
            stopbits: 1,
            baudrate: 115_200,
            databits: 8,
            read_timeout: 1,
            response_wait: 3000,
            forwarder: ForwarderKind::Harvest,
            harvest_url: HARVEST_URL.to_owned(),
        }
    }
}

impl Config {
    /// Merges the config file named by `args` (or [`DEFAULT_CONFIG_PATH`]), the
    /// environment and the command line over the defaults.
    pub fn load(args: &Args) -> figment::error::Result<Self> {
        let file = args
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::figment(args, file, ENV_PREFIX).extract()
    }

    pub fn figment(args: &Args, file: PathBuf, env_prefix: &str) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(file))
            .merge(Env::prefixed(env_prefix))
            .merge(Serialized::defaults(args))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.interval).max(MIN_POLL_INTERVAL)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout).max(MIN_READ_TIMEOUT)
    }

    pub fn response_wait(&self) -> Duration {
        Duration::from_millis(self.response_wait)
    }

    pub fn serial_settings(&self) -> Result<SerialSettings, ConfigError> {
        let data_bits = match self.databits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            8 => DataBits::Eight,
            n => {
                return Err(ConfigError::Invalid {
                    key: "databits",
                    reason: format!("expected 5 to 8, got {n}"),
                });
            }
        };
        let stop_bits = match self.stopbits {
            1 => StopBits::One,
            2 => StopBits::Two,
            n => {
                return Err(ConfigError::Invalid {
                    key: "stopbits",
                    reason: format!("expected 1 or 2, got {n}"),
                });
            }
        };
        if self.baudrate == 0 {
            return Err(ConfigError::Invalid {
                key: "baudrate",
                reason: "must not be zero".to_owned(),
            });
        }

        Ok(SerialSettings {
            path: self.path.clone(),
            baud_rate: self.baudrate,
            parity: self.parity.into(),
            data_bits,
            stop_bits,
            read_timeout: self.read_timeout(),
        })
    }

    pub fn session_settings(&self) -> Result<SessionSettings, ConfigError> {
        Ok(SessionSettings {
            serial: self.serial_settings()?,
            terminator: self.newline_code,
            response_wait: self.response_wait(),
        })
    }
}
