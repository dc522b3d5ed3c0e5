//! Relay assembly: opens the gateway ports and wires the injector into
//! the input stream.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::injector::NoteOffInjector;
use crate::io::{self, MidiInputDevice, MidiInputManager, MidiOutputDevice, MidiOutputManager};

/// Name of the virtual output port when the caller doesn't pick one.
pub const DEFAULT_VIRTUAL_PORT_NAME: &str = "Virtual MIDI output device - Auto NOTE OFF";

/// Where relayed events go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// An existing output port, matched by case-insensitive substring.
    Device(String),
    /// A virtual port created by the relay (unix only).
    Virtual(String),
}

impl Default for OutputTarget {
    fn default() -> Self {
        OutputTarget::Virtual(DEFAULT_VIRTUAL_PORT_NAME.to_string())
    }
}

/// Configures and opens a [`Relay`].
///
/// # Example
///
/// ```ignore
/// let relay = Relay::builder()
///     .input("TDX-15")
///     .build()?;
/// println!("relaying into '{}'", relay.output_name());
/// ```
#[derive(Debug, Default)]
pub struct RelayBuilder {
    input_port: Option<String>,
    output: OutputTarget,
}

impl RelayBuilder {
    /// Input port to listen on, matched by case-insensitive substring.
    pub fn input(mut self, name: impl Into<String>) -> Self {
        self.input_port = Some(name.into());
        self
    }

    pub fn output(mut self, target: OutputTarget) -> Self {
        self.output = target;
        self
    }

    pub fn output_device(mut self, name: impl Into<String>) -> Self {
        self.output = OutputTarget::Device(name.into());
        self
    }

    pub fn virtual_output(mut self, name: impl Into<String>) -> Self {
        self.output = OutputTarget::Virtual(name.into());
        self
    }

    /// Open the output sink, then the input stream, and start relaying.
    pub fn build(self) -> Result<Relay> {
        let input_port = self
            .input_port
            .ok_or_else(|| Error::InvalidConfig("an input port is required".to_string()))?;

        let output = MidiOutputManager::new();
        let output_name = match &self.output {
            OutputTarget::Device(name) => output.connect_by_name(name)?,
            OutputTarget::Virtual(name) => output.connect_virtual(name.clone())?,
        };

        let injector = NoteOffInjector;
        let mut sink = output.handle();

        let input = MidiInputManager::new();
        let input_name = input.connect_by_name(&input_port, move |event| {
            debug!("received {:?} on channel {}", event.msg, event.channel_num());
            if let Err(e) = injector.process(&event, &mut sink) {
                warn!("dropping event after send failure: {}", e);
            }
        })?;

        Ok(Relay {
            input,
            output,
            input_name,
            output_name,
        })
    }
}

/// A running relay.
///
/// Holds both gateway connections; dropping it stops relaying. The input
/// side is declared first so it disconnects before the output sink goes
/// away.
pub struct Relay {
    input: MidiInputManager,
    output: MidiOutputManager,
    input_name: String,
    output_name: String,
}

impl Relay {
    pub fn builder() -> RelayBuilder {
        RelayBuilder::default()
    }

    /// Name of the connected input port.
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Name of the output port relayed events are written to.
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn is_running(&self) -> bool {
        self.input.is_connected() && self.output.is_connected()
    }

    pub fn list_input_devices() -> Vec<MidiInputDevice> {
        MidiInputManager::list_devices()
    }

    pub fn list_output_devices() -> Vec<MidiOutputDevice> {
        MidiOutputManager::list_devices()
    }

    /// Whether this platform can create virtual output ports.
    pub const fn virtual_output_supported() -> bool {
        io::virtual_ports_supported()
    }
}
