//! Serving cell records as reported by `AT+QENG="servingcell"`.
//!
//! See https://files.pine64.org/doc/datasheet/project_anakin/LTE_module/Quectel_EC25&EC21_QuecCell_AT_Commands_Manual_V1.1.pdf

use std::fmt::{self, Display};

use serde::Serialize;

use super::{DuplexMode, Rat, ServingCellState};

fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Renders a field the way the modem does, zero values become the `-` sentinel.
struct Token<'a, T>(&'a T);

impl<T: Default + PartialEq + Display> Display for Token<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if is_zero(self.0) {
            f.write_str("-")
        } else {
            self.0.fmt(f)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LteCellInfo {
    /// Capture instant, epoch milliseconds (UTC).
    pub time: i64,
    pub rat: Rat,
    pub state: ServingCellState,
    pub is_tdd: DuplexMode,
    #[serde(skip_serializing_if = "is_zero")]
    pub mcc: u16,
    #[serde(skip_serializing_if = "is_zero")]
    pub mnc: u16,
    /// Hex-encoded eNB ID + Cell ID
    #[serde(rename = "cellid", skip_serializing_if = "String::is_empty")]
    pub cell_id: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub pcid: u16,
    #[serde(skip_serializing_if = "is_zero")]
    pub earfcn: u32,
    #[serde(rename = "freq_band_ind", skip_serializing_if = "is_zero")]
    pub band: u16,
    /// Bandwidth code, 0 (1.4 MHz) to 5 (20 MHz)
    #[serde(skip_serializing_if = "is_zero")]
    pub ul_bandwidth: u8,
    #[serde(skip_serializing_if = "is_zero")]
    pub dl_bandwidth: u8,
    #[serde(skip_serializing_if = "is_zero")]
    pub tac: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub rsrp: i16,
    #[serde(skip_serializing_if = "is_zero")]
    pub rsrq: i16,
    #[serde(skip_serializing_if = "is_zero")]
    pub rssi: i16,
    #[serde(skip_serializing_if = "is_zero")]
    pub sinr: i16,
    #[serde(skip_serializing_if = "is_zero")]
    pub srxlev: i16,
}

impl Display for LteCellInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"+QENG: "servingcell","{}","{}","{}",{},{},{},{},{},{},{},{},{},{},{},{},{},{}"#,
            self.state,
            self.rat,
            self.is_tdd,
            Token(&self.mcc),
            Token(&self.mnc),
            Token(&self.cell_id),
            Token(&self.pcid),
            Token(&self.earfcn),
            Token(&self.band),
            Token(&self.ul_bandwidth),
            Token(&self.dl_bandwidth),
            Token(&self.tac),
            Token(&self.rsrp),
            Token(&self.rsrq),
            Token(&self.rssi),
            Token(&self.sinr),
            Token(&self.srxlev),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WcdmaCellInfo {
    /// Capture instant, epoch milliseconds (UTC).
    pub time: i64,
    pub rat: Rat,
    pub state: ServingCellState,
    #[serde(skip_serializing_if = "is_zero")]
    pub mcc: u16,
    #[serde(skip_serializing_if = "is_zero")]
    pub mnc: u16,
    /// Hex-encoded location area code
    #[serde(skip_serializing_if = "String::is_empty")]
    pub lac: String,
    /// Hex-encoded RNC ID + Cell ID
    #[serde(rename = "cellid", skip_serializing_if = "String::is_empty")]
    pub cell_id: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub uarfcn: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub psc: u16,
    #[serde(skip_serializing_if = "is_zero")]
    pub rac: u16,
    #[serde(skip_serializing_if = "is_zero")]
    pub rscp: i16,
    #[serde(skip_serializing_if = "is_zero")]
    pub ecio: i16,
    /// Physical channel, 0 for DPCH and 1 for FDPCH
    #[serde(skip_serializing_if = "is_zero")]
    pub phych: u8,
    /// Spreading factor code
    #[serde(skip_serializing_if = "is_zero")]
    pub sf: u8,
    #[serde(skip_serializing_if = "is_zero")]
    pub slot: u8,
    #[serde(skip_serializing_if = "is_zero")]
    pub speech_code: u16,
    /// Compressed mode flag
    #[serde(skip_serializing_if = "is_zero")]
    pub commod: u8,
}

impl Display for WcdmaCellInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"+QENG: "servingcell","{}","{}",{},{},{},{},{},{},{},{},{},{},{},{},{},{}"#,
            self.state,
            self.rat,
            Token(&self.mcc),
            Token(&self.mnc),
            Token(&self.lac),
            Token(&self.cell_id),
            Token(&self.uarfcn),
            Token(&self.psc),
            Token(&self.rac),
            Token(&self.rscp),
            Token(&self.ecio),
            Token(&self.phych),
            Token(&self.sf),
            Token(&self.slot),
            Token(&self.speech_code),
            Token(&self.commod),
        )
    }
}
