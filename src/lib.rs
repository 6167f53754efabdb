//! midiport - MIDI port management library
//!
//! This library provides a small, owned façade over the host's MIDI system:
//! - Port enumeration with positional indices and stable ids
//! - A single bound input whose messages go to one registered handler
//! - A single bound output that receives raw byte messages
//! - A midir backend, plus traits for plugging in other hosts
//!
//! Message bytes are never interpreted.

pub mod config;
pub mod error;
pub mod midi;

// Re-export commonly used types
pub use config::Config;
pub use error::MidiError;
pub use midi::{InboundMessage, MidirHost, PortId, PortInfo, PortManager};
