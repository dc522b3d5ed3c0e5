//! MIDI output gateway.
//!
//! Enumerates output ports and opens one, real or virtual, behind a
//! dedicated sender thread. Events are enqueued as commands and written to
//! the wire in arrival order, so two events enqueued back-to-back from the
//! same thread are never reordered.

use crate::error::{Error, Result};
use crate::event::MidiEvent;
use crate::injector::EventSink;
use arc_swap::ArcSwap;
use crossbeam_channel::{bounded, Receiver, Sender};
use midir::{MidiOutput, MidiOutputConnection};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

const CLIENT_NAME: &str = "midi-autorelease";

/// An available MIDI output port.
#[derive(Debug, Clone)]
pub struct MidiOutputDevice {
    pub index: usize,
    pub name: String,
}

enum OutputCommand {
    Connect {
        device_index: usize,
        reply: Sender<Result<String>>,
    },
    ConnectVirtual {
        name: String,
        reply: Sender<Result<String>>,
    },
    Disconnect,
    Send(MidiEvent),
    Shutdown,
}

/// Whether this platform can create virtual MIDI output ports.
///
/// midir exposes virtual ports on ALSA and CoreMIDI only; on other
/// backends an existing output port must be used.
pub const fn virtual_ports_supported() -> bool {
    cfg!(unix)
}

/// Owns the output side of the gateway.
pub struct MidiOutputManager {
    command_sender: Sender<OutputCommand>,
    connected_device: Arc<ArcSwap<Option<String>>>,
    is_connected: Arc<AtomicBool>,
}

impl MidiOutputManager {
    pub fn new() -> Self {
        let (command_sender, command_receiver) = bounded(1024);
        let connected_device = Arc::new(ArcSwap::new(Arc::new(None)));
        let is_connected = Arc::new(AtomicBool::new(false));

        let connected_device_clone = Arc::clone(&connected_device);
        let is_connected_clone = Arc::clone(&is_connected);

        thread::Builder::new()
            .name("midi-output-thread".to_string())
            .spawn(move || {
                Self::output_thread(command_receiver, connected_device_clone, is_connected_clone);
            })
            .expect("Failed to spawn MIDI output thread");

        Self {
            command_sender,
            connected_device,
            is_connected,
        }
    }

    fn output_thread(
        command_receiver: Receiver<OutputCommand>,
        connected_device: Arc<ArcSwap<Option<String>>>,
        is_connected: Arc<AtomicBool>,
    ) {
        let mut connection: Option<MidiOutputConnection> = None;

        while let Ok(command) = command_receiver.recv() {
            match command {
                OutputCommand::Connect {
                    device_index,
                    reply,
                } => {
                    if let Some(conn) = connection.take() {
                        drop(conn);
                        is_connected.store(false, Ordering::SeqCst);
                        connected_device.store(Arc::new(None));
                    }

                    let _ = reply.send(match Self::connect_to_device(device_index) {
                        Ok((conn, name)) => {
                            connection = Some(conn);
                            is_connected.store(true, Ordering::SeqCst);
                            connected_device.store(Arc::new(Some(name.clone())));
                            debug!("sending to MIDI output '{}'", name);
                            Ok(name)
                        }
                        Err(e) => Err(e),
                    });
                }
                OutputCommand::ConnectVirtual { name, reply } => {
                    if let Some(conn) = connection.take() {
                        drop(conn);
                        is_connected.store(false, Ordering::SeqCst);
                        connected_device.store(Arc::new(None));
                    }

                    let _ = reply.send(match Self::open_virtual(&name) {
                        Ok(conn) => {
                            connection = Some(conn);
                            is_connected.store(true, Ordering::SeqCst);
                            connected_device.store(Arc::new(Some(name.clone())));
                            debug!("created virtual MIDI output '{}'", name);
                            Ok(name)
                        }
                        Err(e) => Err(e),
                    });
                }
                OutputCommand::Disconnect => {
                    if let Some(conn) = connection.take() {
                        drop(conn);
                        is_connected.store(false, Ordering::SeqCst);
                        connected_device.store(Arc::new(None));
                    }
                }
                OutputCommand::Send(event) => {
                    if let Some(ref mut conn) = connection {
                        if let Err(e) = conn.send(&event.to_bytes()) {
                            warn!("MIDI send failed: {}", e);
                        } else {
                            debug!("sent {:?} on channel {}", event.msg, event.channel_num());
                        }
                    } else {
                        debug!("no output connected, dropping event");
                    }
                }
                OutputCommand::Shutdown => break,
            }
        }

        if let Some(conn) = connection.take() {
            drop(conn);
        }
    }

    fn connect_to_device(device_index: usize) -> Result<(MidiOutputConnection, String)> {
        let midi_output = MidiOutput::new(CLIENT_NAME)?;

        let ports = midi_output.ports();
        let port = ports.get(device_index).ok_or_else(|| {
            Error::Device(format!("MIDI output device {} not found", device_index))
        })?;

        let port_name = midi_output
            .port_name(port)
            .unwrap_or_else(|_| format!("Device {}", device_index));

        let connection = midi_output.connect(port, "autorelease-out")?;

        Ok((connection, port_name))
    }

    #[cfg(unix)]
    fn open_virtual(name: &str) -> Result<MidiOutputConnection> {
        use midir::os::unix::VirtualOutput;

        let midi_output = MidiOutput::new(CLIENT_NAME)?;
        Ok(midi_output.create_virtual(name)?)
    }

    #[cfg(not(unix))]
    fn open_virtual(_name: &str) -> Result<MidiOutputConnection> {
        Err(Error::Device(
            "this platform cannot create virtual MIDI ports".to_string(),
        ))
    }

    pub fn list_devices() -> Vec<MidiOutputDevice> {
        let mut devices = Vec::new();
        if let Ok(midi_output) = MidiOutput::new(CLIENT_NAME) {
            let ports = midi_output.ports();
            for (index, port) in ports.iter().enumerate() {
                let name = midi_output
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {}", index));
                devices.push(MidiOutputDevice { index, name });
            }
        }
        devices
    }

    /// Connect to an output device by index.
    ///
    /// Blocks until the I/O thread has opened the port; returns the port
    /// name on success.
    pub fn connect(&self, device_index: usize) -> Result<String> {
        let (reply, response) = bounded(1);
        self.command_sender
            .send(OutputCommand::Connect {
                device_index,
                reply,
            })
            .map_err(|_| Error::Device("MIDI output thread not running".to_string()))?;
        response
            .recv()
            .map_err(|_| Error::Device("MIDI output thread not running".to_string()))?
    }

    /// Connect to the first output port whose name contains `name`
    /// (case-insensitive).
    pub fn connect_by_name(&self, name: &str) -> Result<String> {
        let devices = Self::list_devices();
        let device = devices
            .iter()
            .find(|d| d.name.to_lowercase().contains(&name.to_lowercase()))
            .ok_or_else(|| Error::Device(format!("No MIDI output port matching '{}'", name)))?;
        self.connect(device.index)
    }

    /// Create a virtual output port that other applications can read from.
    pub fn connect_virtual(&self, name: impl Into<String>) -> Result<String> {
        let (reply, response) = bounded(1);
        self.command_sender
            .send(OutputCommand::ConnectVirtual {
                name: name.into(),
                reply,
            })
            .map_err(|_| Error::Device("MIDI output thread not running".to_string()))?;
        response
            .recv()
            .map_err(|_| Error::Device("MIDI output thread not running".to_string()))?
    }

    pub fn disconnect(&self) {
        let _ = self.command_sender.send(OutputCommand::Disconnect);
    }

    /// Enqueue an event for the wire. Fire-and-forget: delivery order is
    /// the enqueue order, and a full or closed queue is reported without
    /// retry.
    pub fn send(&self, event: &MidiEvent) -> Result<()> {
        self.command_sender
            .try_send(OutputCommand::Send(*event))
            .map_err(|_| Error::Device("MIDI output queue unavailable".to_string()))
    }

    /// A cheap cloneable sending handle for use from input callbacks.
    pub fn handle(&self) -> OutputHandle {
        OutputHandle {
            command_sender: self.command_sender.clone(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::SeqCst)
    }

    pub fn connected_device_name(&self) -> Option<String> {
        self.connected_device.load().as_ref().clone()
    }
}

impl Default for MidiOutputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MidiOutputManager {
    fn drop(&mut self) {
        let _ = self.command_sender.send(OutputCommand::Shutdown);
    }
}

/// Sending half of the output gateway.
///
/// Clones share the manager's command queue; dropping a handle does not
/// shut the output thread down.
#[derive(Clone)]
pub struct OutputHandle {
    command_sender: Sender<OutputCommand>,
}

impl OutputHandle {
    pub fn send(&self, event: &MidiEvent) -> Result<()> {
        self.command_sender
            .try_send(OutputCommand::Send(*event))
            .map_err(|_| Error::Device("MIDI output queue unavailable".to_string()))
    }
}

impl EventSink for OutputHandle {
    fn send_event(&mut self, event: &MidiEvent) -> Result<()> {
        OutputHandle::send(self, event)
    }
}
