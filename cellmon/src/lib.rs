//! AT command polling of Quectel cellular modems.
//!
//! A [`session::ModemSession`] owns the modem's serial port, identifies the modem
//! once and then reads its serving cell on request. The [`poller::Poller`] drives
//! it on a timer and hands every reading to a [`forward::Forwarder`].

pub mod at;
pub mod cell;
pub mod config;
pub mod error;
pub mod forward;
pub mod poller;
pub mod profile;
pub mod schema;
pub mod session;
pub mod telemetry;
pub mod transport;

pub use error::{Error, Result};
