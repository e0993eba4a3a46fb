//! A modem session: the ordered AT transactions that identify the modem and read its
//! serving cell.

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    at::{AtChannel, Terminator},
    cell::{CellInfo, ModemIdentity, Rat},
    error::{Error, Result},
    profile::{CommandTable, IDENTITY_COMMAND, Profiles, Query},
    schema::Schemas,
    transport::{SerialSettings, SerialTransport, Transport},
};

/// Everything needed to open a session on a serial modem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub serial: SerialSettings,
    pub terminator: Terminator,
    /// Upper bound on how long a single response is accumulated.
    pub response_wait: Duration,
}

/// Owns the transport for its whole lifetime. Dropping the session closes it.
pub struct ModemSession<T> {
    channel: AtChannel<T>,
    schemas: Arc<Schemas>,
    profiles: Profiles,
    commands: Option<CommandTable>,
    identity: ModemIdentity,
    cell_info: Option<CellInfo>,
    rat: Option<Rat>,
    response_wait: Duration,
}

impl ModemSession<SerialTransport> {
    /// Opens the serial device described by `settings` and initializes a session on it.
    pub fn open(
        settings: &SessionSettings,
        schemas: Arc<Schemas>,
        profiles: Profiles,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let transport = SerialTransport::open(&settings.serial)?;
        let channel = AtChannel::new(transport)
            .with_terminator(settings.terminator)
            .with_cancellation(cancel);

        Self::initialize(channel, schemas, profiles, settings.response_wait)
    }
}

impl<T: Transport> ModemSession<T> {
    /// Queries identity, IMEI, IMSI, ICCID and the serving cell, in that order, then
    /// clears the transport buffers.
    ///
    /// The first failing step aborts initialization and its error is returned as is.
    /// That includes [`Error::NotAttached`] for a modem still searching for a network.
    pub fn initialize(
        channel: AtChannel<T>,
        schemas: Arc<Schemas>,
        profiles: Profiles,
        response_wait: Duration,
    ) -> Result<Self> {
        let mut session = Self {
            channel,
            schemas,
            profiles,
            commands: None,
            identity: ModemIdentity::default(),
            cell_info: None,
            rat: None,
            response_wait,
        };

        session.refresh_identity()?;
        session.refresh_cell_info()?;
        session.channel.reset_buffers()?;

        Ok(session)
    }

    pub fn port(&self) -> &str {
        self.channel.port()
    }

    pub fn identity(&self) -> &ModemIdentity {
        &self.identity
    }

    /// The serving cell from the last successful refresh.
    pub fn cell_info(&self) -> Option<&CellInfo> {
        self.cell_info.as_ref()
    }

    /// RAT seen on the last refresh. `None` while the modem is searching.
    pub fn rat(&self) -> Option<Rat> {
        self.rat
    }

    /// Re-runs the identity, IMEI, IMSI and ICCID queries.
    ///
    /// The stored identity and command table are only replaced once every query
    /// succeeded.
    pub fn refresh_identity(&mut self) -> Result<&ModemIdentity> {
        let raw = self.transact(Query::Identity, IDENTITY_COMMAND)?;
        let mut identity = self.schemas.decode_identity(&raw)?;

        let commands = self
            .profiles
            .lookup(&identity.model)
            .map(|profile| profile.commands.clone())
            .ok_or_else(|| Error::UnsupportedModel(identity.model.clone()))?;

        let raw = self.transact(Query::Imei, commands.command(Query::Imei))?;
        identity.imei = self.schemas.decode_imei(&raw)?;
        let raw = self.transact(Query::Imsi, commands.command(Query::Imsi))?;
        identity.imsi = self.schemas.decode_imsi(&raw)?;
        let raw = self.transact(Query::Iccid, commands.command(Query::Iccid))?;
        identity.iccid = self.schemas.decode_iccid(&raw)?;

        info!(
            port = %self.port(),
            manufacture = %identity.manufacture,
            model = %identity.model,
            firmware_revision = %identity.firmware_revision,
            imei = %identity.imei,
            "modem identified"
        );
        self.commands = Some(commands);
        self.identity = identity;

        Ok(&self.identity)
    }

    /// Reads the serving cell and replaces the current cell info.
    ///
    /// Returns `Ok(None)` when the modem is attached over a RAT without a detail
    /// decoder. A searching modem fails with [`Error::NotAttached`]. Both clear the
    /// current cell info. Any other failure leaves the RAT and cell info of the
    /// previous reading untouched.
    pub fn refresh_cell_info(&mut self) -> Result<Option<&CellInfo>> {
        let command = self
            .commands
            .as_ref()
            .map(|commands| commands.command(Query::ServingCell))
            .ok_or_else(|| Error::UnsupportedModel(self.identity.model.clone()))?;
        let raw = self.transact(Query::ServingCell, command)?;

        let mode = match self.schemas.decode_mode(&raw) {
            Ok(mode) => mode,
            Err(e @ Error::NotAttached) => {
                self.rat = None;
                self.cell_info = None;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let cell_info = match mode.rat {
            Rat::Lte => CellInfo::Lte(self.schemas.decode_lte(&raw)?),
            Rat::Wcdma => CellInfo::Wcdma(self.schemas.decode_wcdma(&raw)?),
            rat => {
                debug!(%rat, state = %mode.state, "no cell info decoder for RAT");
                self.rat = Some(rat);
                self.cell_info = None;
                return Ok(None);
            }
        };
        debug!(?cell_info, "serving cell refreshed");
        self.rat = Some(mode.rat);

        Ok(Some(&*self.cell_info.insert(cell_info)))
    }

    /// One AT transaction. Buffers are cleared right after the raw read so that
    /// stale bytes never reach the next command.
    fn transact(&mut self, query: Query, command: &str) -> Result<String> {
        let schemas = &self.schemas;
        let raw = self.channel.execute_until(
            command,
            |buf| schemas.is_complete(query, buf),
            self.response_wait,
        )?;
        self.channel.reset_buffers()?;

        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}
