//! Pattern based decoders for modem responses.
//!
//! Comma separated records such as `+QENG: "servingcell",...` are described as data:
//! a literal prefix followed by an ordered list of [`FieldSpec`]s. A [`RecordSchema`]
//! is compiled once into a regex with one named group per field, and every record
//! is decoded through the same [`Fields`] accessor, which applies the `-` sentinel
//! rule and numeric conversion uniformly.

use std::{num::ParseIntError, str::FromStr};

use chrono::Utc;
use regex::{Captures, Regex};

use crate::{
    cell::{
        DuplexMode, LteCellInfo, ModemIdentity, Rat, ServingCellState, WcdmaCellInfo,
    },
    error::{Error, Result},
    profile::Query,
};

/// Token the modem uses for "not applicable / unavailable".
pub const SENTINEL: &str = "-";

/// Expected shape of a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// One of a fixed set of literals, enclosed in double quotes on the wire.
    Quoted(&'static [&'static str]),
    /// Exactly `n` decimal digits.
    Digits(usize),
    Unsigned,
    Signed,
    /// Hex or otherwise alphanumeric identifier.
    Alnum,
}

impl Shape {
    fn pattern(&self) -> String {
        match self {
            Shape::Quoted(options) => options
                .iter()
                .map(|o| regex::escape(o))
                .collect::<Vec<_>>()
                .join("|"),
            Shape::Digits(n) => format!(r"\d{{{n}}}"),
            Shape::Unsigned => r"\d+".to_owned(),
            Shape::Signed => r"-?\d+".to_owned(),
            Shape::Alnum => "[0-9A-Za-z]+".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub shape: Shape,
    /// Whether the field may carry the `-` sentinel instead of a value.
    pub sentinel: bool,
}

impl FieldSpec {
    pub const fn new(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            shape,
            sentinel: false,
        }
    }

    pub const fn or_sentinel(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            shape,
            sentinel: true,
        }
    }

    fn pattern(&self) -> String {
        // Value alternatives come before the sentinel so that a signed value such
        // as `-81` is never cut short to `-` on the last field.
        let mut token = self.shape.pattern();
        if self.sentinel {
            token.push('|');
            token.push_str(SENTINEL);
        }
        match self.shape {
            Shape::Quoted(_) => format!(r#""(?P<{}>{token})""#, self.name),
            _ => format!("(?P<{}>{token})", self.name),
        }
    }
}

/// A literal prefix followed by comma separated fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSchema {
    pub prefix: &'static str,
    pub fields: &'static [FieldSpec],
}

impl RecordSchema {
    pub fn pattern(&self) -> String {
        let fields = self
            .fields
            .iter()
            .map(FieldSpec::pattern)
            .collect::<Vec<_>>()
            .join(",");
        format!("{}{fields}", regex::escape(self.prefix))
    }

    pub fn compile(&self) -> std::result::Result<CompiledSchema, regex::Error> {
        Ok(CompiledSchema {
            regex: Regex::new(&self.pattern())?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledSchema {
    regex: Regex,
}

impl CompiledSchema {
    /// Matches the first record in `haystack`.
    pub fn captures<'h>(&self, haystack: &'h str) -> Option<Fields<'h>> {
        self.regex.captures(haystack).map(|captures| Fields { captures })
    }
}

/// Named tokens of one matched record.
#[derive(Debug)]
pub struct Fields<'h> {
    captures: Captures<'h>,
}

impl Fields<'_> {
    pub fn raw(&self, field: &str) -> Option<&str> {
        self.captures.name(field).map(|m| m.as_str())
    }

    fn value(&self, field: &str) -> Option<&str> {
        self.raw(field).filter(|token| *token != SENTINEL)
    }

    /// The token as text, empty for the sentinel.
    pub fn text(&self, field: &str) -> String {
        self.value(field).unwrap_or_default().to_owned()
    }

    /// The token as an integer, zero for the sentinel.
    pub fn int<N>(&self, field: &'static str) -> Result<N>
    where
        N: FromStr<Err = ParseIntError> + Default,
    {
        let Some(token) = self.value(field) else {
            return Ok(N::default());
        };
        token
            .parse()
            .map_err(|source| Error::NumericConversionFailed {
                field,
                raw: token.to_owned(),
                source,
            })
    }

    /// The token as one of the wire enums. `None` if absent or unknown.
    pub fn token<E: FromStr>(&self, field: &str) -> Option<E> {
        self.value(field).and_then(|token| token.parse().ok())
    }
}

const STATES: &[&str] = &["SEARCH", "LIMSRV", "NOCONN", "CONNECT"];
const RATS: &[&str] = &["GSM", "WCDMA", "LTE", "CDMAHDR", "TDSCDMA"];
const SERVINGCELL_PREFIX: &str = r#"+QENG: "servingcell","#;

/// `+QENG: "servingcell","<state>"`
pub static QENG_STATE: RecordSchema = RecordSchema {
    prefix: SERVINGCELL_PREFIX,
    fields: &[FieldSpec::new("state", Shape::Quoted(STATES))],
};

/// `+QENG: "servingcell","<state>","<rat>"`
pub static QENG_MODE: RecordSchema = RecordSchema {
    prefix: SERVINGCELL_PREFIX,
    fields: &[
        FieldSpec::new("state", Shape::Quoted(STATES)),
        FieldSpec::new("rat", Shape::Quoted(RATS)),
    ],
};

/// `mcc` and `mnc` are held as `u16`. A leading zero, as in the `001`/`01` test
/// network, is lost on decode and the re-encoded line carries `1`/`1` instead.
pub static QENG_LTE: RecordSchema = RecordSchema {
    prefix: SERVINGCELL_PREFIX,
    fields: &[
        FieldSpec::new("state", Shape::Quoted(STATES)),
        FieldSpec::new("rat", Shape::Quoted(&["LTE"])),
        FieldSpec::new("is_tdd", Shape::Quoted(&["TDD", "FDD"])),
        FieldSpec::or_sentinel("mcc", Shape::Digits(3)),
        FieldSpec::or_sentinel("mnc", Shape::Unsigned),
        FieldSpec::or_sentinel("cellid", Shape::Alnum),
        FieldSpec::or_sentinel("pcid", Shape::Unsigned),
        FieldSpec::or_sentinel("earfcn", Shape::Unsigned),
        FieldSpec::or_sentinel("freq_band_ind", Shape::Unsigned),
        FieldSpec::or_sentinel("ul_bandwidth", Shape::Unsigned),
        FieldSpec::or_sentinel("dl_bandwidth", Shape::Unsigned),
        FieldSpec::or_sentinel("tac", Shape::Unsigned),
        FieldSpec::or_sentinel("rsrp", Shape::Signed),
        FieldSpec::or_sentinel("rsrq", Shape::Signed),
        FieldSpec::or_sentinel("rssi", Shape::Signed),
        FieldSpec::or_sentinel("sinr", Shape::Signed),
        FieldSpec::or_sentinel("srxlev", Shape::Signed),
    ],
};

/// Same `mcc`/`mnc` caveat as [`QENG_LTE`].
pub static QENG_WCDMA: RecordSchema = RecordSchema {
    prefix: SERVINGCELL_PREFIX,
    fields: &[
        FieldSpec::new("state", Shape::Quoted(STATES)),
        FieldSpec::new("rat", Shape::Quoted(&["WCDMA"])),
        FieldSpec::or_sentinel("mcc", Shape::Digits(3)),
        FieldSpec::or_sentinel("mnc", Shape::Unsigned),
        FieldSpec::or_sentinel("lac", Shape::Alnum),
        FieldSpec::or_sentinel("cellid", Shape::Alnum),
        FieldSpec::or_sentinel("uarfcn", Shape::Unsigned),
        FieldSpec::or_sentinel("psc", Shape::Unsigned),
        FieldSpec::or_sentinel("rac", Shape::Unsigned),
        FieldSpec::or_sentinel("rscp", Shape::Signed),
        FieldSpec::or_sentinel("ecio", Shape::Signed),
        FieldSpec::or_sentinel("phych", Shape::Unsigned),
        FieldSpec::or_sentinel("sf", Shape::Unsigned),
        FieldSpec::or_sentinel("slot", Shape::Unsigned),
        FieldSpec::or_sentinel("speech_code", Shape::Unsigned),
        FieldSpec::or_sentinel("commod", Shape::Unsigned),
    ],
};

/// Serving cell state and RAT, as read before dispatching to a detail decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServingMode {
    pub state: ServingCellState,
    pub rat: Rat,
}

/// Every decoder used by a session, compiled once at startup.
///
/// IMEI and IMSI share the same shape: a bare 15 digit token. A buffer only means
/// one or the other because of the command that produced it, so the caller picks
/// the decoder that matches the command it sent.
#[derive(Debug, Clone)]
pub struct Schemas {
    identity: Regex,
    imei: Regex,
    imsi: Regex,
    iccid: Regex,
    search: Regex,
    servingcell_line: Regex,
    state: CompiledSchema,
    mode: CompiledSchema,
    lte: CompiledSchema,
    wcdma: CompiledSchema,
}

impl Schemas {
    pub fn new() -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            identity: Regex::new(
                r"(?P<manufacture>[^\r\n]*)\r\n(?P<model>[^\r\n]*)\r\nRevision: (?P<firmware_revision>[^\r\n]*)\r\n",
            )?,
            imei: Regex::new(r"\b\d{15}\b")?,
            imsi: Regex::new(r"\b\d{15}\b")?,
            iccid: Regex::new(r"(?:^|\D)(?P<iccid>\d{19})F")?,
            search: Regex::new(&format!(
                r#"{}"SEARCH""#,
                regex::escape(SERVINGCELL_PREFIX)
            ))?,
            servingcell_line: Regex::new(&format!(
                r"{}[^\r\n]*\r?\n",
                regex::escape(SERVINGCELL_PREFIX)
            ))?,
            state: QENG_STATE.compile()?,
            mode: QENG_MODE.compile()?,
            lte: QENG_LTE.compile()?,
            wcdma: QENG_WCDMA.compile()?,
        })
    }

    /// Whether `buf` holds everything the decoder for `query` needs, or the modem
    /// already answered with an error.
    pub fn is_complete(&self, query: Query, buf: &[u8]) -> bool {
        let text = String::from_utf8_lossy(buf);
        if text.contains("ERROR") {
            return true;
        }
        match query {
            Query::Identity => self.identity.is_match(&text),
            Query::Imei => self.imei.is_match(&text),
            Query::Imsi => self.imsi.is_match(&text),
            Query::Iccid => self.iccid.is_match(&text),
            Query::ServingCell => self.servingcell_line.is_match(&text),
        }
    }

    /// Decodes the `ATI` response: manufacturer, model and revision lines.
    pub fn decode_identity(&self, buf: &str) -> Result<ModemIdentity> {
        let captures = self.identity.captures(buf).ok_or(Error::IdentityNotPresent)?;
        let get = |name: &str| {
            captures
                .name(name)
                .map(|m| m.as_str().trim().to_owned())
                .unwrap_or_default()
        };
        Ok(ModemIdentity {
            manufacture: get("manufacture"),
            model: get("model"),
            firmware_revision: get("firmware_revision"),
            ..ModemIdentity::default()
        })
    }

    pub fn decode_imei(&self, buf: &str) -> Result<String> {
        self.imei
            .find(buf)
            .map(|m| m.as_str().to_owned())
            .ok_or(Error::FieldNotPresent("IMEI"))
    }

    pub fn decode_imsi(&self, buf: &str) -> Result<String> {
        self.imsi
            .find(buf)
            .map(|m| m.as_str().to_owned())
            .ok_or(Error::FieldNotPresent("IMSI"))
    }

    /// The 19 ICCID digits, without the trailing `F` padding.
    pub fn decode_iccid(&self, buf: &str) -> Result<String> {
        self.iccid
            .captures(buf)
            .and_then(|c| c.name("iccid"))
            .map(|m| m.as_str().to_owned())
            .ok_or(Error::FieldNotPresent("ICCID"))
    }

    /// Reads the serving cell state and RAT.
    ///
    /// A `SEARCH` state anywhere in the buffer wins over everything else and yields
    /// [`Error::NotAttached`] without looking at the RAT.
    pub fn decode_mode(&self, buf: &str) -> Result<ServingMode> {
        if self.search.is_match(buf) {
            return Err(Error::NotAttached);
        }
        let state = self
            .state
            .captures(buf)
            .and_then(|f| f.token::<ServingCellState>("state"))
            .ok_or(Error::ModeNotResponded)?;
        let rat = self
            .mode
            .captures(buf)
            .and_then(|f| f.token::<Rat>("rat"))
            .ok_or(Error::RatNotResponded)?;

        Ok(ServingMode { state, rat })
    }

    /// Decodes the full LTE serving cell record, stamped with the current time.
    pub fn decode_lte(&self, buf: &str) -> Result<LteCellInfo> {
        let malformed = || Error::CellInfoMalformed { rat: Rat::Lte };
        let f = self.lte.captures(buf).ok_or_else(malformed)?;

        Ok(LteCellInfo {
            time: Utc::now().timestamp_millis(),
            rat: Rat::Lte,
            state: f.token("state").ok_or_else(malformed)?,
            is_tdd: f.token::<DuplexMode>("is_tdd").ok_or_else(malformed)?,
            mcc: f.int("mcc")?,
            mnc: f.int("mnc")?,
            cell_id: f.text("cellid"),
            pcid: f.int("pcid")?,
            earfcn: f.int("earfcn")?,
            band: f.int("freq_band_ind")?,
            ul_bandwidth: f.int("ul_bandwidth")?,
            dl_bandwidth: f.int("dl_bandwidth")?,
            tac: f.int("tac")?,
            rsrp: f.int("rsrp")?,
            rsrq: f.int("rsrq")?,
            rssi: f.int("rssi")?,
            sinr: f.int("sinr")?,
            srxlev: f.int("srxlev")?,
        })
    }

    /// Decodes the full WCDMA serving cell record, stamped with the current time.
    pub fn decode_wcdma(&self, buf: &str) -> Result<WcdmaCellInfo> {
        let malformed = || Error::CellInfoMalformed { rat: Rat::Wcdma };
        let f = self.wcdma.captures(buf).ok_or_else(malformed)?;

        Ok(WcdmaCellInfo {
            time: Utc::now().timestamp_millis(),
            rat: Rat::Wcdma,
            state: f.token("state").ok_or_else(malformed)?,
            mcc: f.int("mcc")?,
            mnc: f.int("mnc")?,
            lac: f.text("lac"),
            cell_id: f.text("cellid"),
            uarfcn: f.int("uarfcn")?,
            psc: f.int("psc")?,
            rac: f.int("rac")?,
            rscp: f.int("rscp")?,
            ecio: f.int("ecio")?,
            phych: f.int("phych")?,
            sf: f.int("sf")?,
            slot: f.int("slot")?,
            speech_code: f.int("speech_code")?,
            commod: f.int("commod")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn schemas() -> Schemas {
        Schemas::new().expect("patterns compile")
    }

    const LTE_NOCONN: &str = r#"+QENG: "servingcell","NOCONN","LTE","FDD",440,10,2734811,235,6100,19,3,3,1684,-81,-10,-54,19,50"#;
    const LTE_ALL_SENTINEL: &str =
        r#"+QENG: "servingcell","NOCONN","LTE","FDD",-,-,-,-,-,-,-,-,-,-,-,-,-,-"#;
    const WCDMA_NOCONN: &str = r#"+QENG: "servingcell","NOCONN","WCDMA",440,10,75,6FE0090,10736,58,0,-78,-3,-,-,-,-,-"#;

    #[test]
    fn field_pattern_puts_values_before_sentinel() {
        assert_eq!(
            FieldSpec::or_sentinel("rsrp", Shape::Signed).pattern(),
            r"(?P<rsrp>-?\d+|-)"
        );
        assert_eq!(
            FieldSpec::new("rat", Shape::Quoted(&["LTE", "WCDMA"])).pattern(),
            r#""(?P<rat>LTE|WCDMA)""#
        );
        assert_eq!(
            FieldSpec::or_sentinel("mcc", Shape::Digits(3)).pattern(),
            r"(?P<mcc>\d{3}|-)"
        );
    }

    #[test]
    fn record_pattern_escapes_prefix() {
        assert_eq!(
            QENG_STATE.pattern(),
            r#"\+QENG: "servingcell","(?P<state>SEARCH|LIMSRV|NOCONN|CONNECT)""#
        );
    }

    #[test]
    fn decodes_lte_record() {
        let info = schemas().decode_lte(LTE_NOCONN).unwrap();
        assert_eq!(
            info,
            LteCellInfo {
                time: info.time,
                rat: Rat::Lte,
                state: ServingCellState::NoConn,
                is_tdd: DuplexMode::Fdd,
                mcc: 440,
                mnc: 10,
                cell_id: "2734811".into(),
                pcid: 235,
                earfcn: 6100,
                band: 19,
                ul_bandwidth: 3,
                dl_bandwidth: 3,
                tac: 1684,
                rsrp: -81,
                rsrq: -10,
                rssi: -54,
                sinr: 19,
                srxlev: 50,
            }
        );
    }

    #[test]
    fn lte_cell_id_may_be_hex() {
        let buf = r#"+QENG: "servingcell","NOCONN","LTE","FDD",440,10,2C81000,193,1850,3,5,5,1694,-100,-11,-67,11,29"#;
        let info = schemas().decode_lte(buf).unwrap();
        assert_eq!(info.cell_id, "2C81000");
        assert_eq!(info.pcid, 193);
        assert_eq!(info.ul_bandwidth, 5);
        assert_eq!(info.srxlev, 29);
    }

    #[test]
    fn lte_sentinels_decode_to_zero() {
        let info = schemas().decode_lte(LTE_ALL_SENTINEL).unwrap();
        assert_eq!(
            info,
            LteCellInfo {
                time: info.time,
                rat: Rat::Lte,
                state: ServingCellState::NoConn,
                is_tdd: DuplexMode::Fdd,
                mcc: 0,
                mnc: 0,
                cell_id: String::new(),
                pcid: 0,
                earfcn: 0,
                band: 0,
                ul_bandwidth: 0,
                dl_bandwidth: 0,
                tac: 0,
                rsrp: 0,
                rsrq: 0,
                rssi: 0,
                sinr: 0,
                srxlev: 0,
            }
        );
    }

    #[test]
    fn negative_last_field_is_not_cut_to_sentinel() {
        let buf = r#"+QENG: "servingcell","CONNECT","LTE","TDD",460,0,1A2B,12,38950,40,5,5,4660,-95,-9,-70,-3,-7"#;
        let info = schemas().decode_lte(buf).unwrap();
        assert_eq!(info.is_tdd, DuplexMode::Tdd);
        assert_eq!(info.sinr, -3);
        assert_eq!(info.srxlev, -7);
    }

    #[test]
    fn lte_overflow_is_a_conversion_error() {
        let buf = r#"+QENG: "servingcell","NOCONN","LTE","FDD",440,10,2734811,235,6100,19,300,3,1684,-81,-10,-54,19,50"#;
        match schemas().decode_lte(buf).unwrap_err() {
            Error::NumericConversionFailed { field, raw, .. } => {
                assert_eq!(field, "ul_bandwidth");
                assert_eq!(raw, "300");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn lte_decoder_rejects_wcdma_record() {
        let err = schemas().decode_lte(WCDMA_NOCONN).unwrap_err();
        assert!(matches!(err, Error::CellInfoMalformed { rat: Rat::Lte }));
    }

    #[test]
    fn decodes_wcdma_record() {
        let info = schemas().decode_wcdma(WCDMA_NOCONN).unwrap();
        assert_eq!(
            info,
            WcdmaCellInfo {
                time: info.time,
                rat: Rat::Wcdma,
                state: ServingCellState::NoConn,
                mcc: 440,
                mnc: 10,
                lac: "75".into(),
                cell_id: "6FE0090".into(),
                uarfcn: 10736,
                psc: 58,
                rac: 0,
                rscp: -78,
                ecio: -3,
                phych: 0,
                sf: 0,
                slot: 0,
                speech_code: 0,
                commod: 0,
            }
        );
    }

    #[test]
    fn wcdma_partial_sentinels() {
        let info = schemas()
            .decode_wcdma(r#"+QENG: "servingcell","NOCONN","WCDMA",440,20,0,ABCDEFF,0,-,-,-,-,-,-,-,-,-"#)
            .unwrap();
        assert_eq!(info.mnc, 20);
        assert_eq!(info.lac, "0");
        assert_eq!(info.cell_id, "ABCDEFF");
        assert_eq!(info.uarfcn, 0);
        assert_eq!(info.rscp, 0);
    }

    #[test]
    fn wcdma_sentinel_identifiers_are_empty() {
        let info = schemas()
            .decode_wcdma(r#"+QENG: "servingcell","NOCONN","WCDMA",440,20,-,-,-,-,-,-,-,-,-,-,-,-"#)
            .unwrap();
        assert_eq!(info.mcc, 440);
        assert_eq!(info.lac, "");
        assert_eq!(info.cell_id, "");
        assert_eq!(info.commod, 0);
    }

    #[test]
    fn wcdma_overflow_is_a_conversion_error() {
        let buf = r#"+QENG: "servingcell","NOCONN","WCDMA",440,10,75,6FE0090,99999999999,58,0,-78,-3,-,-,-,-,-"#;
        match schemas().decode_wcdma(buf).unwrap_err() {
            Error::NumericConversionFailed { field, raw, .. } => {
                assert_eq!(field, "uarfcn");
                assert_eq!(raw, "99999999999");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn leading_zero_mcc_is_not_preserved() {
        let buf = r#"+QENG: "servingcell","NOCONN","LTE","FDD",001,01,2734811,235,6100,19,3,3,1684,-81,-10,-54,19,50"#;
        let info = schemas().decode_lte(buf).unwrap();
        assert_eq!(info.mcc, 1);
        assert_eq!(info.mnc, 1);
        assert_eq!(
            info.to_string(),
            r#"+QENG: "servingcell","NOCONN","LTE","FDD",1,1,2734811,235,6100,19,3,3,1684,-81,-10,-54,19,50"#
        );
    }

    #[test]
    fn mode_detection() {
        let schemas = schemas();
        assert_eq!(
            schemas.decode_mode(LTE_NOCONN).unwrap(),
            ServingMode {
                state: ServingCellState::NoConn,
                rat: Rat::Lte
            }
        );
        assert_eq!(schemas.decode_mode(WCDMA_NOCONN).unwrap().rat, Rat::Wcdma);
        let gsm = r#"+QENG: "servingcell","CONNECT","GSM",460,00,550A,2BB9,23,94,0,-61"#;
        assert_eq!(
            schemas.decode_mode(gsm).unwrap(),
            ServingMode {
                state: ServingCellState::Connect,
                rat: Rat::Gsm
            }
        );
    }

    #[test]
    fn search_wins_over_everything_else() {
        let schemas = schemas();
        for buf in [
            r#"+QENG: "servingcell","SEARCH""#,
            "AT+QENG=\"servingcell\"\r\r\n+QENG: \"servingcell\",\"SEARCH\"\r\n\r\nOK\r\n",
            r#"+QENG: "servingcell","SEARCH","LTE","FDD",440,10,2734811,235,6100,19,3,3,1684,-81,-10,-54,19,50"#,
        ] {
            assert!(
                matches!(schemas.decode_mode(buf), Err(Error::NotAttached)),
                "{buf:?}"
            );
        }
    }

    #[test]
    fn missing_marker_is_mode_not_responded() {
        let schemas = schemas();
        assert!(matches!(
            schemas.decode_mode("\r\nOK\r\n"),
            Err(Error::ModeNotResponded)
        ));
        let invalid = r#"+QENG: "servingcell","INVALID","INVALID","FDD",440,10,2734811,235,6100,19,3,3,1684,-81,-10,-54,19,50"#;
        assert!(matches!(
            schemas.decode_mode(invalid),
            Err(Error::ModeNotResponded)
        ));
    }

    #[test]
    fn missing_rat_is_rat_not_responded() {
        let schemas = schemas();
        for buf in [
            r#"+QENG: "servingcell","NOCONN""#,
            r#"+QENG: "servingcell","LIMSRV","NR5G""#,
        ] {
            assert!(
                matches!(schemas.decode_mode(buf), Err(Error::RatNotResponded)),
                "{buf:?}"
            );
        }
    }

    #[test]
    fn decodes_identity_after_command_echo() {
        let identity = schemas()
            .decode_identity(
                "ATI\r\r\nQuectel\r\nEG25\r\nRevision: EG25GGBR07A08M2G\r\n\r\nOK\r\n",
            )
            .unwrap();
        assert_eq!(identity.manufacture, "Quectel");
        assert_eq!(identity.model, "EG25");
        assert_eq!(identity.firmware_revision, "EG25GGBR07A08M2G");
        assert!(identity.imei.is_empty());
    }

    #[test]
    fn identity_requires_three_lines() {
        assert!(matches!(
            schemas().decode_identity("ATI\r\r\nQuectel\r\n\r\nOK\r\n"),
            Err(Error::IdentityNotPresent)
        ));
    }

    #[test]
    fn imei_and_imsi_are_the_same_shape() {
        let schemas = schemas();
        let buf = "AT+CGSN\r\r\n867531041234567\r\n\r\nOK\r\n";
        assert_eq!(schemas.decode_imei(buf).unwrap(), "867531041234567");
        // Nothing in the buffer says which identifier it is.
        assert_eq!(schemas.decode_imsi(buf).unwrap(), "867531041234567");
    }

    #[test]
    fn imei_missing() {
        let schemas = schemas();
        assert!(matches!(
            schemas.decode_imei("AT+CGSN\r\r\nERROR\r\n"),
            Err(Error::FieldNotPresent("IMEI"))
        ));
        assert!(matches!(
            schemas.decode_imsi("AT+CIMI\r\r\n44010123\r\n"),
            Err(Error::FieldNotPresent("IMSI"))
        ));
    }

    #[test]
    fn iccid_drops_padding() {
        let schemas = schemas();
        let buf = "AT+QCCID\r\r\n+QCCID: 8981100022152346372F\r\n\r\nOK\r\n";
        assert_eq!(schemas.decode_iccid(buf).unwrap(), "8981100022152346372");
    }

    #[test]
    fn iccid_needs_exactly_nineteen_digits_and_padding() {
        let schemas = schemas();
        for buf in [
            "+QCCID: 8981100022152346372\r\n",
            "+QCCID: 898110002215234637F\r\n",
            "+QCCID: 89811000221523463721F\r\n",
        ] {
            assert!(
                matches!(
                    schemas.decode_iccid(buf),
                    Err(Error::FieldNotPresent("ICCID"))
                ),
                "{buf:?}"
            );
        }
    }

    #[test]
    fn completeness_follows_the_query() {
        let schemas = schemas();
        assert!(!schemas.is_complete(Query::Identity, b"ATI\r\r\nQuectel\r\n"));
        assert!(schemas.is_complete(
            Query::Identity,
            b"ATI\r\r\nQuectel\r\nEG25\r\nRevision: EG25GGBR07A08M2G\r\n"
        ));
        assert!(!schemas.is_complete(
            Query::ServingCell,
            br#"+QENG: "servingcell","NOCONN","LTE","FDD",440,1"#
        ));
        assert!(schemas.is_complete(
            Query::ServingCell,
            b"+QENG: \"servingcell\",\"SEARCH\"\r\n"
        ));
        assert!(schemas.is_complete(Query::Iccid, b"AT+QCCID\r\r\nERROR\r\n"));
    }

    fn signed() -> impl Strategy<Value = i16> {
        -150i16..100
    }

    prop_compose! {
        fn lte_info()(
            state in prop::sample::select(ServingCellState::ALL.to_vec()),
            is_tdd in prop::sample::select(vec![DuplexMode::Tdd, DuplexMode::Fdd]),
            (mcc, mnc) in (prop_oneof![Just(0u16), 100u16..1000], 0u16..1000),
            cell_id in "([0-9A-F]{1,8})?",
            (pcid, earfcn, band) in (0u16..504, 0u32..70000, 0u16..72),
            (ul_bandwidth, dl_bandwidth, tac) in (0u8..6, 0u8..6, 0u32..65536),
            (rsrp, rsrq, rssi, sinr, srxlev) in (signed(), signed(), signed(), signed(), signed()),
        ) -> LteCellInfo {
            LteCellInfo {
                time: 0,
                rat: Rat::Lte,
                state,
                is_tdd,
                mcc,
                mnc,
                cell_id,
                pcid,
                earfcn,
                band,
                ul_bandwidth,
                dl_bandwidth,
                tac,
                rsrp,
                rsrq,
                rssi,
                sinr,
                srxlev,
            }
        }
    }

    prop_compose! {
        fn wcdma_info()(
            state in prop::sample::select(ServingCellState::ALL.to_vec()),
            (mcc, mnc) in (prop_oneof![Just(0u16), 100u16..1000], 0u16..1000),
            lac in "([0-9A-F]{1,4})?",
            cell_id in "([0-9A-F]{1,7})?",
            (uarfcn, psc, rac) in (0u32..16384, 0u16..512, 0u16..256),
            (rscp, ecio) in (signed(), signed()),
            (phych, sf, slot, speech_code, commod) in (0u8..2, 0u8..8, 0u8..16, 0u16..16, 0u8..2),
        ) -> WcdmaCellInfo {
            WcdmaCellInfo {
                time: 0,
                rat: Rat::Wcdma,
                state,
                mcc,
                mnc,
                lac,
                cell_id,
                uarfcn,
                psc,
                rac,
                rscp,
                ecio,
                phych,
                sf,
                slot,
                speech_code,
                commod,
            }
        }
    }

    proptest! {
        #[test]
        fn lte_decode_of_rendered_record_is_identity(info in lte_info()) {
            let decoded = schemas().decode_lte(&info.to_string()).unwrap();
            prop_assert_eq!(LteCellInfo { time: 0, ..decoded }, info);
        }

        #[test]
        fn wcdma_decode_of_rendered_record_is_identity(info in wcdma_info()) {
            let decoded = schemas().decode_wcdma(&info.to_string()).unwrap();
            prop_assert_eq!(WcdmaCellInfo { time: 0, ..decoded }, info);
        }
    }
}
