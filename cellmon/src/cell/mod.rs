pub mod data;

use std::{fmt, str::FromStr};

pub use data::{LteCellInfo, WcdmaCellInfo};
use serde::Serialize;

/// Radio Access Technology of the serving cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Rat {
    #[serde(rename = "GSM")]
    Gsm,
    #[serde(rename = "WCDMA")]
    Wcdma,
    #[serde(rename = "LTE")]
    Lte,
    #[serde(rename = "CDMAHDR")]
    CdmaHdr,
    #[serde(rename = "TDSCDMA")]
    TdScdma,
}

impl Rat {
    pub const ALL: [Rat; 5] =
        [Rat::Gsm, Rat::Wcdma, Rat::Lte, Rat::CdmaHdr, Rat::TdScdma];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rat::Gsm => "GSM",
            Rat::Wcdma => "WCDMA",
            Rat::Lte => "LTE",
            Rat::CdmaHdr => "CDMAHDR",
            Rat::TdScdma => "TDSCDMA",
        }
    }
}

/// "State" of the UE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServingCellState {
    /// UE is searching but could not (yet) find a suitable cell.
    Search,
    /// UE is camping on a cell but has not registered on the network.
    LimSrv,
    /// UE is camping on a cell and registered, not in traffic.
    NoConn,
    /// UE is camping on a cell and has a dedicated channel.
    Connect,
}

impl ServingCellState {
    pub const ALL: [ServingCellState; 4] = [
        ServingCellState::Search,
        ServingCellState::LimSrv,
        ServingCellState::NoConn,
        ServingCellState::Connect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServingCellState::Search => "SEARCH",
            ServingCellState::LimSrv => "LIMSRV",
            ServingCellState::NoConn => "NOCONN",
            ServingCellState::Connect => "CONNECT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DuplexMode {
    Tdd,
    Fdd,
}

impl DuplexMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplexMode::Tdd => "TDD",
            DuplexMode::Fdd => "FDD",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} token {token:?}")]
pub struct UnknownToken {
    kind: &'static str,
    token: String,
}

macro_rules! wire_enum {
    ($ty:ident, $kind:literal, [$($variant:ident),+ $(,)?]) => {
        impl FromStr for $ty {
            type Err = UnknownToken;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s == $ty::$variant.as_str() {
                        return Ok($ty::$variant);
                    }
                )+
                Err(UnknownToken {
                    kind: $kind,
                    token: s.to_owned(),
                })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum!(Rat, "RAT", [Gsm, Wcdma, Lte, CdmaHdr, TdScdma]);
wire_enum!(ServingCellState, "state", [Search, LimSrv, NoConn, Connect]);
wire_enum!(DuplexMode, "duplex mode", [Tdd, Fdd]);

/// The most recent serving cell reading, one variant per decodable RAT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CellInfo {
    Lte(LteCellInfo),
    Wcdma(WcdmaCellInfo),
}

impl CellInfo {
    pub fn rat(&self) -> Rat {
        match self {
            CellInfo::Lte(info) => info.rat,
            CellInfo::Wcdma(info) => info.rat,
        }
    }
}

impl fmt::Display for CellInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellInfo::Lte(info) => info.fmt(f),
            CellInfo::Wcdma(info) => info.fmt(f),
        }
    }
}

/// Identity of the modem and its SIM, queried once when the session starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModemIdentity {
    pub manufacture: String,
    pub model: String,
    pub firmware_revision: String,
    pub imei: String,
    pub imsi: String,
    pub iccid: String,
}
