//! Per-model AT command tables.

/// The queries a session issues against the modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    Identity,
    Imei,
    Imsi,
    Iccid,
    ServingCell,
}

/// AT commands understood by a modem family, for every query after identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTable {
    pub imei: &'static str,
    pub imsi: &'static str,
    pub iccid: &'static str,
    pub serving_cell: &'static str,
}

impl CommandTable {
    pub fn command(&self, query: Query) -> &'static str {
        match query {
            Query::Identity => IDENTITY_COMMAND,
            Query::Imei => self.imei,
            Query::Imsi => self.imsi,
            Query::Iccid => self.iccid,
            Query::ServingCell => self.serving_cell,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModemProfile {
    /// Lower-case key matched against the model reported by `ATI`.
    pub key: &'static str,
    pub commands: CommandTable,
}

/// Identity is queried before the model is known, so every modem gets `ATI`.
pub const IDENTITY_COMMAND: &str = "ATI";

pub const QUECTEL_EG25: ModemProfile = ModemProfile {
    key: "eg25",
    commands: CommandTable {
        imei: "AT+CGSN",
        imsi: "AT+CIMI",
        iccid: "AT+QCCID",
        serving_cell: r#"AT+QENG="servingcell""#,
    },
};

/// Table of known modem models.
#[derive(Debug, Clone)]
pub struct Profiles {
    profiles: Vec<ModemProfile>,
}

impl Default for Profiles {
    fn default() -> Self {
        Self::new(vec![QUECTEL_EG25])
    }
}

impl Profiles {
    pub fn new(profiles: Vec<ModemProfile>) -> Self {
        Self { profiles }
    }

    /// Finds the profile for the model reported by the modem.
    ///
    /// The model is lower-cased and trimmed, then matched by equality first and by
    /// substring second, so `EG25` and `EG25-G` both resolve to the `eg25` entry.
    pub fn lookup(&self, model: &str) -> Option<&ModemProfile> {
        let model = model.trim().to_lowercase();
        if model.is_empty() {
            return None;
        }
        self.profiles
            .iter()
            .find(|p| p.key == model)
            .or_else(|| self.profiles.iter().find(|p| model.contains(p.key)))
    }
}
