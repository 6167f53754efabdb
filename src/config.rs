//! Runtime configuration for the MIDI port manager

use serde::{Deserialize, Serialize};

pub const CLIENT_NAME_VAR: &str = "MIDIPORT_CLIENT_NAME";
pub const SYSEX_VAR: &str = "MIDIPORT_SYSEX";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name the host shows for our MIDI client
    pub client_name: String,
    /// Ask the host for system-exclusive access when initializing
    pub sysex: bool,
    /// Connection name used when attaching to an input port
    pub input_connection_name: String,
    /// Connection name used when attaching to an output port
    pub output_connection_name: String,
}

impl Config {
    pub fn new() -> Self {
        Self {
            client_name: "midiport".to_string(),
            sysex: true,
            input_connection_name: "midiport-in".to_string(),
            output_connection_name: "midiport-out".to_string(),
        }
    }

    /// Defaults, overridden by `MIDIPORT_CLIENT_NAME` and `MIDIPORT_SYSEX`
    pub fn from_env() -> Self {
        Self::new().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(name) = lookup(CLIENT_NAME_VAR) {
            let name = name.trim();
            if !name.is_empty() {
                self.client_name = name.to_string();
            }
        }
        if let Some(value) = lookup(SYSEX_VAR) {
            match parse_flag(&value) {
                Some(flag) => self.sysex = flag,
                None => log::warn!("Ignoring {}={:?}: expected a boolean", SYSEX_VAR, value),
            }
        }
        self
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn with_sysex(mut self, sysex: bool) -> Self {
        self.sysex = sysex;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::new().with_overrides(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.client_name, "midiport");
        assert!(config.sysex);
    }

    #[test]
    fn test_env_overrides() {
        let config = overrides(&[(CLIENT_NAME_VAR, "Piano Roll"), (SYSEX_VAR, "off")]);
        assert_eq!(config.client_name, "Piano Roll");
        assert!(!config.sysex);
    }

    #[test]
    fn test_bad_values_are_ignored() {
        let config = overrides(&[(CLIENT_NAME_VAR, "   "), (SYSEX_VAR, "maybe")]);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: Config = serde_json::from_str(r#"{"sysex": false}"#).unwrap();
        assert!(!config.sysex);
        assert_eq!(config.client_name, "midiport");
    }
}
