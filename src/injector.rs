//! The forwarding core: pairs every note-on with a synthesized release.

use midi_msg::ChannelVoiceMsg;

use crate::error::Result;
use crate::event::MidiEvent;

/// Destination for relayed events.
///
/// The hardware output implements this by enqueueing to its I/O thread;
/// tests implement it with a recording buffer.
pub trait EventSink {
    fn send_event(&mut self, event: &MidiEvent) -> Result<()>;
}

/// Forwards each note-on verbatim, immediately followed by a note-off for
/// the same channel and note with velocity 0.
///
/// Stateless: each invocation is independent and nothing is deduplicated.
/// A repeated note-on simply produces another on/off pair; the prior
/// synthesized release already bounded the note, so duplicates cannot
/// leave anything held.
///
/// Events that are not note-ons are ignored entirely.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoteOffInjector;

impl NoteOffInjector {
    /// Handle one incoming event.
    ///
    /// Both sends are attempted even when the first fails; the first error
    /// in send order is returned. There is no retry and no rollback; a
    /// failed send is the supervisor's problem, not this component's.
    pub fn process<S: EventSink>(&self, event: &MidiEvent, sink: &mut S) -> Result<()> {
        match event.msg {
            ChannelVoiceMsg::NoteOn { note, .. } => {
                let forwarded = sink.send_event(event);
                let release = MidiEvent::note_off(event.channel_num(), note, 0);
                let released = sink.send_event(&release);
                forwarded.and(released)
            }
            _ => Ok(()),
        }
    }
}
