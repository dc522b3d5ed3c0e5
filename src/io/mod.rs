//! Hardware MIDI gateway.
//!
//! Device enumeration, connection, and real-time I/O via midir. Each
//! direction owns its midir handle on a dedicated thread driven by a
//! command channel.

mod input;
mod output;

pub use input::{MidiInputDevice, MidiInputManager};
pub use output::{virtual_ports_supported, MidiOutputDevice, MidiOutputManager, OutputHandle};
