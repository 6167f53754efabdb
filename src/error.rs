/// Errors reported by the MIDI layer
///
/// Only `initialize` hands these to callers. Everything else in the port
/// manager degrades to an empty/zero/false result and logs the error instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MidiError {
    #[error("MIDI access denied: {0}")]
    AccessDenied(String),
    #[error("failed to create MIDI client: {0}")]
    Init(String),
    #[error("MIDI port not found: {0}")]
    PortNotFound(String),
    #[error("failed to connect to MIDI port: {0}")]
    Connect(String),
    #[error("failed to send MIDI message: {0}")]
    Send(String),
    #[error("failed to serialize: {0}")]
    Serialize(String),
}

impl From<serde_json::Error> for MidiError {
    fn from(e: serde_json::Error) -> Self {
        MidiError::Serialize(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MidiError>;
