//! MIDI event type carried through the relay path.

use midi_msg::{Channel, ChannelVoiceMsg, MidiMsg};

use crate::error::{Error, Result};

/// A parsed channel-voice message with its channel.
///
/// Events are plain `Copy` values. The relay never mutates an event it
/// received; derived messages (the synthesized release) are constructed
/// fresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiEvent {
    pub channel: Channel,
    pub msg: ChannelVoiceMsg,
}

impl MidiEvent {
    #[inline]
    pub fn new(channel: Channel, msg: ChannelVoiceMsg) -> Self {
        Self { channel, msg }
    }

    #[inline]
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::NoteOn { note, velocity },
        }
    }

    #[inline]
    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::NoteOff { note, velocity },
        }
    }

    #[inline]
    pub fn control_change(channel: u8, cc: u8, value: u8) -> Self {
        Self {
            channel: Channel::from_u8(channel),
            msg: ChannelVoiceMsg::ControlChange {
                control: midi_msg::ControlChange::CC { control: cc, value },
            },
        }
    }

    #[inline]
    pub fn channel_num(&self) -> u8 {
        self.channel as u8
    }

    /// Kind follows the status byte: a velocity-0 note-on is still a
    /// note-on here, so it gets forwarded verbatim and paired like any
    /// other press.
    #[inline]
    pub fn is_note_on(&self) -> bool {
        matches!(self.msg, ChannelVoiceMsg::NoteOn { .. })
    }

    #[inline]
    pub fn is_note_off(&self) -> bool {
        matches!(self.msg, ChannelVoiceMsg::NoteOff { .. })
    }

    #[inline]
    pub fn note(&self) -> Option<u8> {
        match self.msg {
            ChannelVoiceMsg::NoteOn { note, .. }
            | ChannelVoiceMsg::NoteOff { note, .. }
            | ChannelVoiceMsg::PolyPressure { note, .. } => Some(note),
            _ => None,
        }
    }

    #[inline]
    pub fn velocity(&self) -> Option<u8> {
        match self.msg {
            ChannelVoiceMsg::NoteOn { velocity, .. }
            | ChannelVoiceMsg::NoteOff { velocity, .. } => Some(velocity),
            _ => None,
        }
    }

    #[inline]
    pub fn to_midi_msg(&self) -> MidiMsg {
        MidiMsg::ChannelVoice {
            channel: self.channel,
            msg: self.msg,
        }
    }

    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_midi_msg().to_midi()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (msg, _len) = MidiMsg::from_midi(bytes)?;
        match msg {
            MidiMsg::ChannelVoice { channel, msg } => Ok(Self { channel, msg }),
            _ => Err(Error::EventParse(
                "expected a channel-voice message".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on() {
        let event = MidiEvent::note_on(9, 38, 100);
        assert!(event.is_note_on());
        assert!(!event.is_note_off());
        assert_eq!(event.channel_num(), 9);
        assert_eq!(event.note(), Some(38));
        assert_eq!(event.velocity(), Some(100));
    }

    #[test]
    fn test_note_off() {
        let event = MidiEvent::note_off(3, 64, 0);
        assert!(event.is_note_off());
        assert!(!event.is_note_on());
        assert_eq!(event.note(), Some(64));
        assert_eq!(event.velocity(), Some(0));
    }

    #[test]
    fn test_zero_velocity_note_on_keeps_its_kind() {
        // The wire status byte decides the kind. A velocity-0 note-on must
        // still count as a note-on so the relay forwards it unchanged.
        let event = MidiEvent::note_on(0, 60, 0);
        assert!(event.is_note_on());
        assert!(!event.is_note_off());
    }

    #[test]
    fn test_parse_note_on_bytes() {
        let event = MidiEvent::from_bytes(&[0x99, 38, 100]).unwrap();
        assert_eq!(event.channel, Channel::Ch10);
        match event.msg {
            ChannelVoiceMsg::NoteOn { note, velocity } => {
                assert_eq!(note, 38);
                assert_eq!(velocity, 100);
            }
            _ => panic!("Expected NoteOn"),
        }
    }

    #[test]
    fn test_parse_note_off_bytes() {
        let event = MidiEvent::from_bytes(&[0x80, 60, 64]).unwrap();
        assert_eq!(event.channel, Channel::Ch1);
        assert!(event.is_note_off());
        assert_eq!(event.note(), Some(60));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let event = MidiEvent::note_on(5, 60, 100);
        let bytes = event.to_bytes();
        let parsed = MidiEvent::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_note_off_bytes() {
        let event = MidiEvent::note_off(9, 38, 0);
        assert_eq!(event.to_bytes(), vec![0x89, 38, 0]);
    }

    #[test]
    fn test_boundary_notes_roundtrip() {
        for note in [0u8, 127] {
            for velocity in [0u8, 127] {
                let event = MidiEvent::note_on(0, note, velocity);
                let parsed = MidiEvent::from_bytes(&event.to_bytes()).unwrap();
                assert_eq!(parsed.note(), Some(note));
                assert_eq!(parsed.velocity(), Some(velocity));
            }
        }
    }

    #[test]
    fn test_non_channel_voice_rejected() {
        // MIDI clock (0xF8) is system real-time, not channel voice.
        assert!(MidiEvent::from_bytes(&[0xF8]).is_err());
    }
}
