//! Host MIDI provider backed by midir (ALSA, CoreMIDI, WinMM, ...)
//!
//! One input and one output client are opened per granted access and shared
//! by every descriptor it hands out; they enumerate ports and answer
//! connection-state queries. Attaching a handler or sending opens its own
//! client, since midir consumes the client on connect.

use std::sync::Arc;

use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;

use super::host::{
    AccessOptions, ConnectionState, InputPort, MidiAccess, MidiHost, OutputPort, PortId,
    RawMessageHandler,
};
use crate::config::Config;
use crate::error::{MidiError, Result};

pub struct MidirHost {
    config: Arc<Config>,
}

impl MidirHost {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl Default for MidirHost {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl MidiHost for MidirHost {
    type Access = MidirAccess;

    async fn request_access(&self, options: AccessOptions) -> Result<MidirAccess> {
        // midir has no permission prompt; being able to open a client on
        // both sides is what "granted" means here.
        let midi_in = MidiInput::new(&self.config.client_name)
            .map_err(|e| MidiError::AccessDenied(format!("MIDI input unavailable: {}", e)))?;
        let midi_out = MidiOutput::new(&self.config.client_name)
            .map_err(|e| MidiError::AccessDenied(format!("MIDI output unavailable: {}", e)))?;

        Ok(MidirAccess {
            config: Arc::clone(&self.config),
            sysex: options.sysex,
            input_client: Arc::new(Mutex::new(midi_in)),
            output_client: Arc::new(Mutex::new(midi_out)),
        })
    }
}

pub struct MidirAccess {
    config: Arc<Config>,
    sysex: bool,
    input_client: Arc<Mutex<MidiInput>>,
    output_client: Arc<Mutex<MidiOutput>>,
}

impl MidiAccess for MidirAccess {
    type Input = MidirInputPort;
    type Output = MidirOutputPort;

    fn inputs(&self) -> Vec<MidirInputPort> {
        let midi_in = self.input_client.lock();
        midi_in
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| MidirInputPort {
                id: PortId::new(port.id()),
                name: midi_in
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Input {}", index)),
                config: Arc::clone(&self.config),
                sysex: self.sysex,
                client: Arc::clone(&self.input_client),
                connection: Arc::new(Mutex::new(None)),
            })
            .collect()
    }

    fn outputs(&self) -> Vec<MidirOutputPort> {
        let midi_out = self.output_client.lock();
        midi_out
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| MidirOutputPort {
                id: PortId::new(port.id()),
                name: midi_out
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Output {}", index)),
                config: Arc::clone(&self.config),
                client: Arc::clone(&self.output_client),
                connection: Arc::new(Mutex::new(None)),
            })
            .collect()
    }
}

fn connection_state(present: bool) -> ConnectionState {
    if present {
        ConnectionState::Connected
    } else {
        ConnectionState::Disconnected
    }
}

#[derive(Clone)]
pub struct MidirInputPort {
    id: PortId,
    name: String,
    config: Arc<Config>,
    sysex: bool,
    /// Enumeration client shared with the access handle
    client: Arc<Mutex<MidiInput>>,
    /// Live connection while a handler is installed (shared between clones)
    connection: Arc<Mutex<Option<MidiInputConnection<()>>>>,
}

impl InputPort for MidirInputPort {
    fn id(&self) -> PortId {
        self.id.clone()
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn state(&self) -> ConnectionState {
        connection_state(self.client.lock().ports().iter().any(|p| p.id() == self.id.0))
    }

    fn set_message_handler(&mut self, handler: Option<RawMessageHandler>) -> Result<()> {
        let mut slot = self.connection.lock();

        // Dropping the connection closes the port
        if let Some(previous) = slot.take() {
            log::debug!("Detaching from MIDI input: {}", self.name);
            drop(previous);
        }

        let Some(mut handler) = handler else {
            return Ok(());
        };

        let mut midi_in = MidiInput::new(&self.config.client_name)
            .map_err(|e| MidiError::Init(e.to_string()))?;
        midi_in.ignore(if self.sysex {
            Ignore::None
        } else {
            Ignore::Sysex
        });

        let port = midi_in
            .ports()
            .into_iter()
            .find(|p| p.id() == self.id.0)
            .ok_or_else(|| MidiError::PortNotFound(self.name.clone()))?;

        let connection = midi_in
            .connect(
                &port,
                &self.config.input_connection_name,
                move |_timestamp, message, _| handler(message),
                (),
            )
            .map_err(|e| MidiError::Connect(format!("{}: {}", self.name, e)))?;

        log::debug!("Attached to MIDI input: {}", self.name);
        *slot = Some(connection);
        Ok(())
    }
}

#[derive(Clone)]
pub struct MidirOutputPort {
    id: PortId,
    name: String,
    config: Arc<Config>,
    /// Enumeration client shared with the access handle
    client: Arc<Mutex<MidiOutput>>,
    /// Opened on first send, dropped on close (shared between clones)
    connection: Arc<Mutex<Option<MidiOutputConnection>>>,
}

impl MidirOutputPort {
    fn connect(&self) -> Result<MidiOutputConnection> {
        let midi_out = MidiOutput::new(&self.config.client_name)
            .map_err(|e| MidiError::Init(e.to_string()))?;

        let port = midi_out
            .ports()
            .into_iter()
            .find(|p| p.id() == self.id.0)
            .ok_or_else(|| MidiError::PortNotFound(self.name.clone()))?;

        midi_out
            .connect(&port, &self.config.output_connection_name)
            .map_err(|e| MidiError::Connect(format!("{}: {}", self.name, e)))
    }
}

impl OutputPort for MidirOutputPort {
    fn id(&self) -> PortId {
        self.id.clone()
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn state(&self) -> ConnectionState {
        connection_state(self.client.lock().ports().iter().any(|p| p.id() == self.id.0))
    }

    fn send(&mut self, message: &[u8]) -> Result<()> {
        let mut slot = self.connection.lock();
        if slot.is_none() {
            log::debug!("Connecting to MIDI output: {}", self.name);
            *slot = Some(self.connect()?);
        }

        match slot.as_mut() {
            Some(conn) => conn
                .send(message)
                .map_err(|e| MidiError::Send(e.to_string())),
            None => Err(MidiError::Send(format!("{} is not connected", self.name))),
        }
    }

    fn close(&mut self) {
        if self.connection.lock().take().is_some() {
            log::debug!("Disconnected from MIDI output: {}", self.name);
        }
    }
}
