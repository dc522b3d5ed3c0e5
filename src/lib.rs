//! Relay that pairs every incoming MIDI note-on with an immediate
//! synthesized note-off.
//!
//! Some hardware (certain e-drum kits in particular) sends note-on but
//! never a matching note-off, so each hit holds a voice forever and
//! eventually exhausts the downstream synth's polyphony. This crate
//! forwards every note-on from an input port verbatim, immediately
//! followed by a note-off for the same channel and note at velocity 0.
//! The back-to-back pair keeps the emulated duration minimal; off-velocity
//! is irrelevant to release behavior on the receivers that matter.
//!
//! The forwarding core is [`NoteOffInjector`]; [`Relay`] wires it between
//! a hardware input and an output port (an existing device, or a virtual
//! port on platforms that support one).

pub mod error;
pub use error::{Error, Result};

mod event;
pub use event::MidiEvent;

mod injector;
pub use injector::{EventSink, NoteOffInjector};

pub(crate) mod io;
pub use io::{MidiInputDevice, MidiInputManager, MidiOutputDevice, MidiOutputManager, OutputHandle};

mod relay;
pub use relay::{OutputTarget, Relay, RelayBuilder, DEFAULT_VIRTUAL_PORT_NAME};

pub use midi_msg::{Channel, ChannelVoiceMsg, MidiMsg};
