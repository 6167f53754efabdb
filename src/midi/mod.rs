//! MIDI port management
pub mod host;
mod manager;
mod message;
pub mod midir_host;
#[cfg(test)]
mod testing;

pub use host::{ConnectionState, MidiHost, PortDirection, PortId, PortInfo};
pub use manager::PortManager;
pub use message::{InboundMessage, MessageHandler};
pub use midir_host::MidirHost;
