//! Port manager
//!
//! [`PortManager`] owns the host access handle and the cached port lists, and
//! keeps at most one bound input and one bound output. Indices handed out by
//! the query methods are positions in the cached lists and stay valid only
//! until the next [`PortManager::refresh_devices`] or
//! [`PortManager::initialize`]; use the [`PortId`] accessors to track a port
//! across refreshes.
//!
//! Misuse never panics or errors: out-of-range indices and calls made before
//! initialization give empty/zero/false results and log a diagnostic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::host::{
    AccessOptions, ConnectionState, InputPort, MidiAccess, MidiHost, OutputPort, PortId, PortInfo,
    RawMessageHandler,
};
use super::message::{InboundMessage, MessageHandler};
use super::midir_host::MidirHost;
use crate::config::Config;
use crate::error::Result;

type InputOf<H> = <<H as MidiHost>::Access as MidiAccess>::Input;
type OutputOf<H> = <<H as MidiHost>::Access as MidiAccess>::Output;

struct InputBinding<I> {
    port: I,
    /// Cleared on close so in-flight deliveries are dropped
    live: Arc<AtomicBool>,
}

pub struct PortManager<H: MidiHost> {
    host: H,
    config: Config,
    access: Option<H::Access>,
    inputs: Vec<InputOf<H>>,
    outputs: Vec<OutputOf<H>>,
    input_binding: Option<InputBinding<InputOf<H>>>,
    output_binding: Option<OutputOf<H>>,
    /// Shared with the host delivery path
    handler: Arc<Mutex<Option<MessageHandler>>>,
}

impl PortManager<MidirHost> {
    /// Manager over the platform's MIDI system via midir
    pub fn midir(config: Config) -> Self {
        Self::new(MidirHost::new(config.clone()), config)
    }
}

impl<H: MidiHost> PortManager<H> {
    pub fn new(host: H, config: Config) -> Self {
        Self {
            host,
            config,
            access: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            input_binding: None,
            output_binding: None,
            handler: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.access.is_some()
    }

    /// Request MIDI access from the host and snapshot its ports.
    ///
    /// On denial the manager is left exactly as it was. Re-initializing an
    /// initialized manager closes the current bindings once the new access
    /// has been granted.
    pub async fn initialize(&mut self) -> Result<()> {
        let options = AccessOptions {
            sysex: self.config.sysex,
        };

        let access = match self.host.request_access(options).await {
            Ok(access) => access,
            Err(e) => {
                log::warn!("MIDI access request failed: {}", e);
                return Err(e);
            }
        };

        if self.is_initialized() {
            log::info!("Re-initializing MIDI access");
            self.deinitialize();
        }

        self.access = Some(access);
        self.snapshot();
        log::info!(
            "MIDI access granted (sysex: {}): {} inputs, {} outputs",
            options.sysex,
            self.inputs.len(),
            self.outputs.len()
        );
        Ok(())
    }

    /// Close both bindings and drop the access handle and port lists
    pub fn deinitialize(&mut self) {
        self.close_input_port();
        self.close_output_port();
        self.inputs.clear();
        self.outputs.clear();
        if self.access.take().is_some() {
            log::info!("MIDI access released");
        }
    }

    /// Re-read the host's port lists. Previously returned indices become
    /// invalid; bindings are left alone.
    pub fn refresh_devices(&mut self) {
        if self.access.is_none() {
            log::warn!("Cannot refresh MIDI devices: not initialized");
            return;
        }
        self.snapshot();
        log::debug!(
            "MIDI devices refreshed: {} inputs, {} outputs",
            self.inputs.len(),
            self.outputs.len()
        );
    }

    fn snapshot(&mut self) {
        if let Some(access) = self.access.as_ref() {
            self.inputs = access.inputs();
            self.outputs = access.outputs();
        }
    }

    /// Register the callback that receives messages from the bound input.
    /// Replaces any previous one.
    pub fn set_message_handler<F>(&mut self, handler: F)
    where
        F: FnMut(InboundMessage) + Send + 'static,
    {
        *self.handler.lock() = Some(Box::new(handler));
    }

    pub fn clear_message_handler(&mut self) {
        *self.handler.lock() = None;
    }

    // Inputs

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn input_name(&self, index: usize) -> String {
        self.inputs.get(index).map(|p| p.name()).unwrap_or_default()
    }

    pub fn input_name_list(&self) -> Vec<String> {
        self.inputs.iter().map(|p| p.name()).collect()
    }

    /// Input names as a JSON array
    pub fn input_names(&self) -> String {
        names_json(&self.input_name_list())
    }

    pub fn input_id(&self, index: usize) -> Option<PortId> {
        self.inputs.get(index).map(|p| p.id())
    }

    /// Current index of the input with this id
    pub fn find_input(&self, id: &PortId) -> Option<usize> {
        self.inputs.iter().position(|p| &p.id() == id)
    }

    pub fn inputs(&self) -> Vec<PortInfo> {
        self.inputs.iter().map(|p| p.info()).collect()
    }

    /// Whether the host reports the input at `index` as connected. This says
    /// nothing about whether it is bound; see [`Self::is_input_bound`].
    pub fn is_input_port_open(&self, index: usize) -> bool {
        self.inputs
            .get(index)
            .is_some_and(|p| p.state() == ConnectionState::Connected)
    }

    /// Whether the input at `index` is the one currently bound
    pub fn is_input_bound(&self, index: usize) -> bool {
        match (self.input_binding.as_ref(), self.inputs.get(index)) {
            (Some(binding), Some(port)) => binding.port.id() == port.id(),
            _ => false,
        }
    }

    pub fn bound_input(&self) -> Option<PortInfo> {
        self.input_binding.as_ref().map(|b| b.port.info())
    }

    /// Bind the input at `index` and start forwarding its messages to the
    /// registered handler. Any previous binding is closed first. An
    /// out-of-range index leaves the input unbound.
    pub fn open_input_port(&mut self, index: usize) {
        self.close_input_port();

        let Some(port) = self.inputs.get(index) else {
            log::warn!(
                "MIDI input index {} out of range ({} inputs)",
                index,
                self.inputs.len()
            );
            return;
        };

        let mut port = port.clone();
        let live = Arc::new(AtomicBool::new(true));
        let forward = self.forwarder(index, Arc::clone(&live));

        match port.set_message_handler(Some(forward)) {
            Ok(()) => {
                log::info!("Opened MIDI input {}: {}", index, port.name());
                self.input_binding = Some(InputBinding { port, live });
            }
            Err(e) => log::error!("Failed to open MIDI input {}: {}", index, e),
        }
    }

    fn forwarder(&self, index: usize, live: Arc<AtomicBool>) -> RawMessageHandler {
        let slot = Arc::clone(&self.handler);
        Box::new(move |bytes: &[u8]| {
            let mut slot = slot.lock();
            if !live.load(Ordering::Acquire) {
                log::trace!("Dropping message for closed MIDI input {}", index);
                return;
            }
            match slot.as_mut() {
                Some(handler) => {
                    log::trace!("MIDI in {}: {:02X?}", index, bytes);
                    handler(InboundMessage::new(index, bytes));
                }
                None => log::debug!(
                    "No MIDI message handler registered, dropping {} bytes",
                    bytes.len()
                ),
            }
        })
    }

    /// Detach from the bound input, if any
    pub fn close_input_port(&mut self) {
        let Some(mut binding) = self.input_binding.take() else {
            return;
        };

        {
            // Wait out a delivery in progress, then stop further ones
            let _delivery = self.handler.lock();
            binding.live.store(false, Ordering::Release);
        }

        if let Err(e) = binding.port.set_message_handler(None) {
            log::error!("Failed to detach from MIDI input {}: {}", binding.port.name(), e);
        }
        log::info!("Closed MIDI input: {}", binding.port.name());
    }

    // Outputs

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn output_name(&self, index: usize) -> String {
        self.outputs.get(index).map(|p| p.name()).unwrap_or_default()
    }

    pub fn output_name_list(&self) -> Vec<String> {
        self.outputs.iter().map(|p| p.name()).collect()
    }

    /// Output names as a JSON array
    pub fn output_names(&self) -> String {
        names_json(&self.output_name_list())
    }

    pub fn output_id(&self, index: usize) -> Option<PortId> {
        self.outputs.get(index).map(|p| p.id())
    }

    /// Current index of the output with this id
    pub fn find_output(&self, id: &PortId) -> Option<usize> {
        self.outputs.iter().position(|p| &p.id() == id)
    }

    pub fn outputs(&self) -> Vec<PortInfo> {
        self.outputs.iter().map(|p| p.info()).collect()
    }

    /// Whether the host reports the output at `index` as connected
    pub fn is_output_port_open(&self, index: usize) -> bool {
        self.outputs
            .get(index)
            .is_some_and(|p| p.state() == ConnectionState::Connected)
    }

    pub fn is_output_bound(&self, index: usize) -> bool {
        match (self.output_binding.as_ref(), self.outputs.get(index)) {
            (Some(bound), Some(port)) => bound.id() == port.id(),
            _ => false,
        }
    }

    pub fn bound_output(&self) -> Option<PortInfo> {
        self.output_binding.as_ref().map(|p| p.info())
    }

    /// Make the output at `index` the target of [`Self::send_message`]. An
    /// out-of-range index leaves the output unbound.
    pub fn open_output_port(&mut self, index: usize) {
        self.close_output_port();

        match self.outputs.get(index) {
            Some(port) => {
                log::info!("Opened MIDI output {}: {}", index, port.name());
                self.output_binding = Some(port.clone());
            }
            None => log::warn!(
                "MIDI output index {} out of range ({} outputs)",
                index,
                self.outputs.len()
            ),
        }
    }

    pub fn close_output_port(&mut self) {
        if let Some(mut port) = self.output_binding.take() {
            port.close();
            log::info!("Closed MIDI output: {}", port.name());
        }
    }

    /// Send `message` unchanged to the bound output. Without a bound output
    /// nothing is sent.
    pub fn send_message(&mut self, message: &[u8]) {
        match self.output_binding.as_mut() {
            Some(port) => match port.send(message) {
                Ok(()) => log::trace!("MIDI out {}: {:02X?}", port.name(), message),
                Err(e) => log::error!("MIDI send to {} failed: {}", port.name(), e),
            },
            None => log::warn!(
                "No MIDI output open, dropping {} byte message",
                message.len()
            ),
        }
    }
}

impl<H: MidiHost> Drop for PortManager<H> {
    fn drop(&mut self) {
        self.deinitialize();
    }
}

fn names_json(names: &[String]) -> String {
    serde_json::to_string(names).unwrap_or_else(|e| {
        log::error!("Failed to serialize port names: {}", e);
        "[]".to_string()
    })
}
