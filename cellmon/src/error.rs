use std::{io, num::ParseIntError};

use crate::cell::Rat;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The serial device could not be opened, or a byte level read/write failed.
    #[error("{port} is not available: {source}")]
    TransportUnavailable {
        port: String,
        #[source]
        source: io::Error,
    },

    /// The serving cell state is `SEARCH`.
    #[error("modem is not attached to a network")]
    NotAttached,

    #[error("servingcell mode was not responded")]
    ModeNotResponded,

    #[error("servingcell RAT was not responded")]
    RatNotResponded,

    #[error("{rat} servingcell info has an invalid format")]
    CellInfoMalformed { rat: Rat },

    #[error("model info was not responded")]
    IdentityNotPresent,

    #[error("{0} was not responded")]
    FieldNotPresent(&'static str),

    #[error("{field} is not a number, got {raw:?}")]
    NumericConversionFailed {
        field: &'static str,
        raw: String,
        #[source]
        source: ParseIntError,
    },

    #[error("no command table for modem model {0:?}")]
    UnsupportedModel(String),

    #[error("transaction cancelled by shutdown")]
    Cancelled,

    #[error("failed to forward cell info: {0}")]
    Forward(String),
}

impl Error {
    pub(crate) fn transport(port: &str, source: impl Into<io::Error>) -> Self {
        Self::TransportUnavailable {
            port: port.to_owned(),
            source: source.into(),
        }
    }

    /// Whether the polling loop may carry on with the next cycle after this error.
    ///
    /// Transport, identity and model errors mean the session itself is unusable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotAttached
                | Self::ModeNotResponded
                | Self::RatNotResponded
                | Self::CellInfoMalformed { .. }
                | Self::NumericConversionFailed { .. }
                | Self::Forward(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_names_the_port() {
        let err = Error::transport(
            "/dev/ttyUSB2",
            io::Error::new(io::ErrorKind::TimedOut, "read timed out"),
        );
        assert_eq!(
            err.to_string(),
            "/dev/ttyUSB2 is not available: read timed out"
        );
        assert!(!err.is_recoverable());
    }

    #[test]
    fn numeric_conversion_keeps_field_and_token() {
        let source = "4x0".parse::<i64>().unwrap_err();
        let err = Error::NumericConversionFailed {
            field: "mcc",
            raw: "4x0".into(),
            source,
        };
        assert_eq!(err.to_string(), r#"mcc is not a number, got "4x0""#);
        assert!(err.is_recoverable());
    }

    #[test]
    fn search_state_is_recoverable() {
        assert!(Error::NotAttached.is_recoverable());
        assert!(!Error::FieldNotPresent("IMEI").is_recoverable());
        assert!(!Error::UnsupportedModel("bg96".into()).is_recoverable());
    }
}
