//! In-memory host for unit tests

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::host::{
    AccessOptions, ConnectionState, InputPort, MidiAccess, MidiHost, OutputPort, PortId,
    RawMessageHandler,
};
use crate::error::{MidiError, Result};

#[derive(Clone)]
struct FakePort {
    id: PortId,
    name: String,
    connected: bool,
}

#[derive(Default)]
struct FakeState {
    deny: Option<String>,
    requests: Vec<AccessOptions>,
    inputs: Vec<FakePort>,
    outputs: Vec<FakePort>,
    handlers: HashMap<PortId, RawMessageHandler>,
    attach_failures: Vec<PortId>,
    sent: Vec<(PortId, Vec<u8>)>,
    closed_outputs: Vec<PortId>,
}

#[derive(Clone, Default)]
pub struct FakeHost {
    state: Arc<Mutex<FakeState>>,
}

fn fake_ports(prefix: &str, names: &[&str]) -> Vec<FakePort> {
    names
        .iter()
        .map(|name| FakePort {
            id: PortId::new(format!("{}:{}", prefix, name)),
            name: name.to_string(),
            connected: true,
        })
        .collect()
}

impl FakeHost {
    pub fn new(inputs: &[&str], outputs: &[&str]) -> Self {
        let host = Self::default();
        host.set_ports(inputs, outputs);
        host
    }

    /// Replace the device collections; ids derive from names
    pub fn set_ports(&self, inputs: &[&str], outputs: &[&str]) {
        let mut state = self.state.lock();
        state.inputs = fake_ports("in", inputs);
        state.outputs = fake_ports("out", outputs);
    }

    pub fn deny(&self, reason: &str) {
        self.state.lock().deny = Some(reason.to_string());
    }

    pub fn set_input_connected(&self, name: &str, connected: bool) {
        let mut state = self.state.lock();
        for port in state.inputs.iter_mut().filter(|p| p.name == name) {
            port.connected = connected;
        }
    }

    pub fn set_output_connected(&self, name: &str, connected: bool) {
        let mut state = self.state.lock();
        for port in state.outputs.iter_mut().filter(|p| p.name == name) {
            port.connected = connected;
        }
    }

    pub fn fail_attach(&self, name: &str) {
        self.state.lock().attach_failures.push(input_id(name));
    }

    pub fn requests(&self) -> Vec<AccessOptions> {
        self.state.lock().requests.clone()
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.state.lock().handlers.contains_key(&input_id(name))
    }

    pub fn handler_count(&self) -> usize {
        self.state.lock().handlers.len()
    }

    /// Deliver `bytes` as if they arrived on input `name`. Returns whether a
    /// handler was attached.
    pub fn deliver(&self, name: &str, bytes: &[u8]) -> bool {
        let mut state = self.state.lock();
        match state.handlers.get_mut(&input_id(name)) {
            Some(handler) => {
                handler(bytes);
                true
            }
            None => false,
        }
    }

    /// Take the handler attached to input `name` out of the host, as a
    /// message already in flight would hold it.
    pub fn steal_handler(&self, name: &str) -> Option<RawMessageHandler> {
        self.state.lock().handlers.remove(&input_id(name))
    }

    pub fn sent(&self) -> Vec<(PortId, Vec<u8>)> {
        self.state.lock().sent.clone()
    }

    pub fn closed_outputs(&self) -> Vec<PortId> {
        self.state.lock().closed_outputs.clone()
    }
}

pub fn input_id(name: &str) -> PortId {
    PortId::new(format!("in:{}", name))
}

pub fn output_id(name: &str) -> PortId {
    PortId::new(format!("out:{}", name))
}

impl MidiHost for FakeHost {
    type Access = FakeAccess;

    async fn request_access(&self, options: AccessOptions) -> Result<FakeAccess> {
        let mut state = self.state.lock();
        state.requests.push(options);
        if let Some(reason) = state.deny.clone() {
            return Err(MidiError::AccessDenied(reason));
        }
        Ok(FakeAccess {
            state: Arc::clone(&self.state),
        })
    }
}

pub struct FakeAccess {
    state: Arc<Mutex<FakeState>>,
}

impl MidiAccess for FakeAccess {
    type Input = FakeInput;
    type Output = FakeOutput;

    fn inputs(&self) -> Vec<FakeInput> {
        self.state
            .lock()
            .inputs
            .iter()
            .map(|port| FakeInput {
                port: port.clone(),
                state: Arc::clone(&self.state),
            })
            .collect()
    }

    fn outputs(&self) -> Vec<FakeOutput> {
        self.state
            .lock()
            .outputs
            .iter()
            .map(|port| FakeOutput {
                port: port.clone(),
                state: Arc::clone(&self.state),
            })
            .collect()
    }
}

fn live_state(ports: &[FakePort], id: &PortId) -> ConnectionState {
    match ports.iter().find(|p| &p.id == id) {
        Some(port) if port.connected => ConnectionState::Connected,
        _ => ConnectionState::Disconnected,
    }
}

#[derive(Clone)]
pub struct FakeInput {
    port: FakePort,
    state: Arc<Mutex<FakeState>>,
}

impl InputPort for FakeInput {
    fn id(&self) -> PortId {
        self.port.id.clone()
    }

    fn name(&self) -> String {
        self.port.name.clone()
    }

    fn state(&self) -> ConnectionState {
        live_state(&self.state.lock().inputs, &self.port.id)
    }

    fn set_message_handler(&mut self, handler: Option<RawMessageHandler>) -> Result<()> {
        let mut state = self.state.lock();
        match handler {
            Some(handler) => {
                if state.attach_failures.contains(&self.port.id) {
                    return Err(MidiError::Connect(self.port.name.clone()));
                }
                state.handlers.insert(self.port.id.clone(), handler);
            }
            None => {
                state.handlers.remove(&self.port.id);
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct FakeOutput {
    port: FakePort,
    state: Arc<Mutex<FakeState>>,
}

impl OutputPort for FakeOutput {
    fn id(&self) -> PortId {
        self.port.id.clone()
    }

    fn name(&self) -> String {
        self.port.name.clone()
    }

    fn state(&self) -> ConnectionState {
        live_state(&self.state.lock().outputs, &self.port.id)
    }

    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.state
            .lock()
            .sent
            .push((self.port.id.clone(), message.to_vec()));
        Ok(())
    }

    fn close(&mut self) {
        self.state.lock().closed_outputs.push(self.port.id.clone());
    }
}
