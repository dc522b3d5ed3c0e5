//! MIDI input gateway.
//!
//! Enumerates input ports and opens one with a per-event handler. The
//! midir connection lives on a dedicated thread because platform MIDI
//! handles are not freely movable between threads; the thread is driven
//! through a command channel and connection state is published via
//! arc-swap and an atomic flag.

use crate::error::{Error, Result};
use crate::event::MidiEvent;
use arc_swap::ArcSwap;
use crossbeam_channel::{bounded, Receiver, Sender};
use midir::{Ignore, MidiInput, MidiInputConnection};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::debug;

const CLIENT_NAME: &str = "midi-autorelease";

/// An available MIDI input port.
#[derive(Debug, Clone)]
pub struct MidiInputDevice {
    pub index: usize,
    pub name: String,
}

type EventHandler = Box<dyn FnMut(MidiEvent) + Send + 'static>;

enum InputCommand {
    Connect {
        device_index: usize,
        handler: EventHandler,
        reply: Sender<Result<String>>,
    },
    Disconnect,
    Shutdown,
}

/// Owns the input side of the gateway.
///
/// The registered handler runs on midir's callback thread, one event at a
/// time, each invocation running to completion before the next is
/// dispatched.
pub struct MidiInputManager {
    command_sender: Sender<InputCommand>,
    connected_device: Arc<ArcSwap<Option<String>>>,
    is_connected: Arc<AtomicBool>,
}

impl MidiInputManager {
    pub fn new() -> Self {
        let (command_sender, command_receiver) = bounded(16);
        let connected_device = Arc::new(ArcSwap::new(Arc::new(None)));
        let is_connected = Arc::new(AtomicBool::new(false));

        let connected_device_clone = Arc::clone(&connected_device);
        let is_connected_clone = Arc::clone(&is_connected);

        thread::Builder::new()
            .name("midi-input-thread".to_string())
            .spawn(move || {
                Self::input_thread(command_receiver, connected_device_clone, is_connected_clone);
            })
            .expect("Failed to spawn MIDI input thread");

        Self {
            command_sender,
            connected_device,
            is_connected,
        }
    }

    fn input_thread(
        command_receiver: Receiver<InputCommand>,
        connected_device: Arc<ArcSwap<Option<String>>>,
        is_connected: Arc<AtomicBool>,
    ) {
        let mut connection: Option<MidiInputConnection<()>> = None;

        while let Ok(command) = command_receiver.recv() {
            match command {
                InputCommand::Connect {
                    device_index,
                    handler,
                    reply,
                } => {
                    if let Some(conn) = connection.take() {
                        drop(conn);
                        is_connected.store(false, Ordering::SeqCst);
                        connected_device.store(Arc::new(None));
                    }

                    let result = Self::connect_to_device(device_index, handler);
                    let _ = reply.send(match result {
                        Ok((conn, name)) => {
                            connection = Some(conn);
                            is_connected.store(true, Ordering::SeqCst);
                            connected_device.store(Arc::new(Some(name.clone())));
                            debug!("listening on MIDI input '{}'", name);
                            Ok(name)
                        }
                        Err(e) => Err(e),
                    });
                }
                InputCommand::Disconnect => {
                    if let Some(conn) = connection.take() {
                        drop(conn);
                        is_connected.store(false, Ordering::SeqCst);
                        connected_device.store(Arc::new(None));
                    }
                }
                InputCommand::Shutdown => break,
            }
        }

        if let Some(conn) = connection.take() {
            drop(conn);
        }
    }

    fn connect_to_device(
        device_index: usize,
        handler: EventHandler,
    ) -> Result<(MidiInputConnection<()>, String)> {
        let mut midi_input = MidiInput::new(CLIENT_NAME)?;
        // The relay only cares about channel-voice traffic.
        midi_input.ignore(Ignore::All);

        let ports = midi_input.ports();
        let port = ports.get(device_index).ok_or_else(|| {
            Error::Device(format!("MIDI input device {} not found", device_index))
        })?;

        let port_name = midi_input
            .port_name(port)
            .unwrap_or_else(|_| format!("Device {}", device_index));

        let mut handler = handler;
        let connection = midi_input.connect(
            port,
            "autorelease-in",
            move |_timestamp, bytes, _| match MidiEvent::from_bytes(bytes) {
                Ok(event) => handler(event),
                Err(e) => debug!("dropping unparseable MIDI input: {}", e),
            },
            (),
        )?;

        Ok((connection, port_name))
    }

    pub fn list_devices() -> Vec<MidiInputDevice> {
        let mut devices = Vec::new();
        if let Ok(midi_input) = MidiInput::new(CLIENT_NAME) {
            let ports = midi_input.ports();
            for (index, port) in ports.iter().enumerate() {
                let name = midi_input
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {}", index));
                devices.push(MidiInputDevice { index, name });
            }
        }
        devices
    }

    /// Connect to a device by index and register the event handler.
    ///
    /// Blocks until the I/O thread has opened the port; returns the port
    /// name on success.
    pub fn connect(
        &self,
        device_index: usize,
        handler: impl FnMut(MidiEvent) + Send + 'static,
    ) -> Result<String> {
        let (reply, response) = bounded(1);
        self.command_sender
            .send(InputCommand::Connect {
                device_index,
                handler: Box::new(handler),
                reply,
            })
            .map_err(|_| Error::Device("MIDI input thread not running".to_string()))?;
        response
            .recv()
            .map_err(|_| Error::Device("MIDI input thread not running".to_string()))?
    }

    /// Connect to the first device whose name contains `name`
    /// (case-insensitive).
    pub fn connect_by_name(
        &self,
        name: &str,
        handler: impl FnMut(MidiEvent) + Send + 'static,
    ) -> Result<String> {
        let devices = Self::list_devices();
        let device = devices
            .iter()
            .find(|d| d.name.to_lowercase().contains(&name.to_lowercase()))
            .ok_or_else(|| Error::Device(format!("No MIDI input port matching '{}'", name)))?;
        self.connect(device.index, handler)
    }

    pub fn disconnect(&self) {
        let _ = self.command_sender.send(InputCommand::Disconnect);
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::SeqCst)
    }

    pub fn connected_device_name(&self) -> Option<String> {
        self.connected_device.load().as_ref().clone()
    }
}

impl Default for MidiInputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MidiInputManager {
    fn drop(&mut self) {
        let _ = self.command_sender.send(InputCommand::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_devices() {
        // Device availability depends on the host; just verify the call
        // doesn't crash.
        let devices = MidiInputManager::list_devices();
        println!("Found {} MIDI input ports", devices.len());
    }

    #[test]
    fn test_manager_starts_disconnected() {
        let manager = MidiInputManager::new();
        assert!(!manager.is_connected());
        assert!(manager.connected_device_name().is_none());
    }

    #[test]
    fn test_connect_by_name_unknown_port() {
        let manager = MidiInputManager::new();
        let result = manager.connect_by_name("no such port exists", |_event| {});
        assert!(matches!(result, Err(Error::Device(_))));
    }

    #[test]
    fn test_connect_invalid_index() {
        let manager = MidiInputManager::new();
        let result = manager.connect(usize::MAX, |_event| {});
        assert!(result.is_err());
    }
}
