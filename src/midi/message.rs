//! Inbound message events handed to the application

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One message received on the bound input port. `data` is passed through
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Index of the input port at the time it was opened
    pub index: usize,
    pub data: Vec<u8>,
}

impl InboundMessage {
    pub fn new(index: usize, data: &[u8]) -> Self {
        Self {
            index,
            data: data.to_vec(),
        }
    }

    /// Serialized form, e.g. `{"index":1,"data":[144,60,127]}`
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// The application's message callback. Runs on the host's delivery thread
/// and must not block.
pub type MessageHandler = Box<dyn FnMut(InboundMessage) + Send + 'static>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let message = InboundMessage::new(1, &[144, 60, 127]);
        assert_eq!(
            message.to_json().unwrap(),
            r#"{"index":1,"data":[144,60,127]}"#
        );
    }

    #[test]
    fn test_sysex_payload_is_untouched() {
        let payload = [0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7];
        let message = InboundMessage::new(0, &payload);
        assert_eq!(message.data, payload);
    }
}
