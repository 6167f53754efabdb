//! Host MIDI provider interface
//!
//! The port manager talks to the platform through these traits. A host grants
//! access, the access handle enumerates port descriptors, and descriptors carry
//! the per-port operations (attach a message handler, send bytes).

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Host-assigned identifier of a port, stable across re-enumeration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(pub String);

impl PortId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

/// Read-only snapshot of one port descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    pub id: PortId,
    pub name: String,
    pub state: ConnectionState,
    pub direction: PortDirection,
}

/// Options passed with an access request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessOptions {
    /// Request permission for system-exclusive messages
    pub sysex: bool,
}

/// Called by the host with the raw bytes of each message arriving on an input
pub type RawMessageHandler = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Entry point to the platform's MIDI subsystem
pub trait MidiHost {
    type Access: MidiAccess;

    /// Ask the host for MIDI access. Resolves to the access handle, or to
    /// `MidiError::AccessDenied` when the host or user refuses.
    fn request_access(&self, options: AccessOptions)
        -> impl Future<Output = Result<Self::Access>>;
}

/// Capability granted by [`MidiHost::request_access`]
pub trait MidiAccess {
    type Input: InputPort;
    type Output: OutputPort;

    /// Current input descriptors, in host order
    fn inputs(&self) -> Vec<Self::Input>;

    /// Current output descriptors, in host order
    fn outputs(&self) -> Vec<Self::Output>;
}

/// An input descriptor. Clones refer to the same host port and share its
/// handler slot.
pub trait InputPort: Clone + Send {
    fn id(&self) -> PortId;
    fn name(&self) -> String;

    /// Current host-level state. Asks the host each call, so it may
    /// enumerate ports.
    fn state(&self) -> ConnectionState;

    /// Install (`Some`) or remove (`None`) the port's message handler.
    /// Installing replaces any previous handler.
    fn set_message_handler(&mut self, handler: Option<RawMessageHandler>) -> Result<()>;

    fn info(&self) -> PortInfo {
        PortInfo {
            id: self.id(),
            name: self.name(),
            state: self.state(),
            direction: PortDirection::Input,
        }
    }
}

/// An output descriptor. Clones refer to the same host port.
pub trait OutputPort: Clone + Send {
    fn id(&self) -> PortId;
    fn name(&self) -> String;

    /// Current host-level state, asked of the host each call
    fn state(&self) -> ConnectionState;

    /// Transmit `message` as-is
    fn send(&mut self, message: &[u8]) -> Result<()>;

    /// Release any host resources held for sending. Sending again reopens.
    fn close(&mut self) {}

    fn info(&self) -> PortInfo {
        PortInfo {
            id: self.id(),
            name: self.name(),
            state: self.state(),
            direction: PortDirection::Output,
        }
    }
}
