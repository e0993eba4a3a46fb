#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use orb_cellmon::{
    at::AtChannel, profile::Profiles, schema::Schemas, session::ModemSession,
    transport::Transport, Result,
};

pub const PORT: &str = "/dev/ttyMOCK0";
pub const SERVINGCELL: &str = r#"AT+QENG="servingcell""#;

pub const ATI: &str = "ATI\r\r\nQuectel\r\nEG25\r\nRevision: EG25GGBR07A08M2G\r\n\r\nOK\r\n";
pub const CGSN: &str = "AT+CGSN\r\r\n867531041234567\r\n\r\nOK\r\n";
pub const CIMI: &str = "AT+CIMI\r\r\n440101234567890\r\n\r\nOK\r\n";
pub const QCCID: &str = "AT+QCCID\r\r\n+QCCID: 8981100022152346372F\r\n\r\nOK\r\n";

/// Bytes handed out per read, small enough that every response spans several reads.
const CHUNK: usize = 16;

pub fn qeng(record: &str) -> String {
    format!("{SERVINGCELL}\r\r\n{record}\r\n\r\nOK\r\n")
}

pub fn lte_noconn() -> String {
    qeng(
        r#"+QENG: "servingcell","NOCONN","LTE","FDD",440,10,2734811,235,6100,19,3,3,1684,-81,-10,-54,19,50"#,
    )
}

pub fn wcdma_noconn() -> String {
    qeng(
        r#"+QENG: "servingcell","NOCONN","WCDMA",440,10,75,6FE0090,10736,58,0,-78,-3,-,-,-,-,-"#,
    )
}

pub fn searching() -> String {
    qeng(r#"+QENG: "servingcell","SEARCH""#)
}

pub fn error(command: &str) -> String {
    format!("{command}\r\r\nERROR\r\n")
}

#[derive(Default)]
struct State {
    script: HashMap<String, String>,
    pending: VecDeque<Vec<u8>>,
    written: Vec<String>,
    resets: usize,
    unplugged: bool,
}

/// An in-memory modem answering each command with a canned response.
///
/// Responses are queued when the command is written and handed out in small chunks.
/// Resetting the buffers drops whatever was not read yet. Unknown commands get
/// `ERROR`. Clones share state, so a test can keep a handle after moving the
/// modem into a session.
#[derive(Clone, Default)]
pub struct ScriptedModem {
    state: Arc<Mutex<State>>,
}

impl ScriptedModem {
    /// An attached EG25 on LTE.
    pub fn eg25() -> Self {
        let modem = Self::default();
        modem
            .respond("ATI", ATI)
            .respond("AT+CGSN", CGSN)
            .respond("AT+CIMI", CIMI)
            .respond("AT+QCCID", QCCID)
            .respond(SERVINGCELL, &lte_noconn());
        modem
    }

    pub fn respond(&self, command: &str, response: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .script
            .insert(command.to_owned(), response.to_owned());
        self
    }

    /// Every command written so far, without terminator.
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().written.clone()
    }

    pub fn resets(&self) -> usize {
        self.state.lock().unwrap().resets
    }

    /// Makes every following read and write fail.
    pub fn unplug(&self) {
        self.state.lock().unwrap().unplugged = true;
    }
}

fn broken_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "device disconnected")
}

impl Transport for ScriptedModem {
    fn name(&self) -> &str {
        PORT
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.unplugged {
            return Err(broken_pipe());
        }
        let command = String::from_utf8_lossy(bytes)
            .trim_end_matches(['\r', '\n'])
            .to_owned();
        let response = state
            .script
            .get(&command)
            .cloned()
            .unwrap_or_else(|| error(&command));
        state
            .pending
            .extend(response.as_bytes().chunks(CHUNK).map(<[u8]>::to_vec));
        state.written.push(command);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        if state.unplugged {
            return Err(broken_pipe());
        }
        match state.pending.pop_front() {
            Some(chunk) => {
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
            None => Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out")),
        }
    }

    fn reset_buffers(&mut self) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.pending.clear();
        state.resets += 1;
        Ok(())
    }
}

pub const RESPONSE_WAIT: Duration = Duration::from_millis(200);

pub fn schemas() -> Arc<Schemas> {
    Arc::new(Schemas::new().unwrap())
}

pub fn initialize(modem: &ScriptedModem) -> Result<ModemSession<ScriptedModem>> {
    ModemSession::initialize(
        AtChannel::new(modem.clone()),
        schemas(),
        Profiles::default(),
        RESPONSE_WAIT,
    )
}
