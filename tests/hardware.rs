//! Loopback tests against real virtual MIDI ports.
//!
//! These need a live sequencer backend (ALSA snd-seq or CoreMIDI), so
//! every test is `#[ignore]`. Run with:
//!
//!   cargo test --test hardware -- --ignored --test-threads=1

#![cfg(unix)]

use midi_autorelease::{OutputTarget, Relay};
use midir::os::unix::VirtualOutput;
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const PORT_SETTLE: Duration = Duration::from_millis(200);
const DELIVERY_WAIT: Duration = Duration::from_millis(300);

type Captured = Arc<Mutex<Vec<Vec<u8>>>>;

/// A virtual source port the relay can listen on.
fn open_feeder(port: &str) -> MidiOutputConnection {
    let midi_out = MidiOutput::new("autorelease-test-feeder").unwrap();
    midi_out.create_virtual(port).unwrap()
}

/// Capture everything the relay writes to its output port.
fn open_capture(port_needle: &str) -> (MidiInputConnection<()>, Captured) {
    let mut midi_in = MidiInput::new("autorelease-test-capture").unwrap();
    midi_in.ignore(Ignore::All);

    let ports = midi_in.ports();
    let port = ports
        .iter()
        .find(|p| {
            midi_in
                .port_name(p)
                .map(|name| name.contains(port_needle))
                .unwrap_or(false)
        })
        .expect("relay output port not found");

    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let captured_clone = Arc::clone(&captured);
    let connection = midi_in
        .connect(
            port,
            "capture",
            move |_timestamp, bytes, _| {
                captured_clone.lock().unwrap().push(bytes.to_vec());
            },
            (),
        )
        .unwrap();

    (connection, captured)
}

#[test]
#[ignore]
fn test_note_on_relayed_with_release() {
    let mut feeder = open_feeder("feeder-src");
    thread::sleep(PORT_SETTLE);

    let relay = Relay::builder()
        .input("feeder-src")
        .output(OutputTarget::Virtual("autorelease-test-out".to_string()))
        .build()
        .unwrap();
    assert!(relay.is_running());

    let (_capture, captured) = open_capture("autorelease-test-out");
    thread::sleep(PORT_SETTLE);

    feeder.send(&[0x99, 38, 100]).unwrap();
    thread::sleep(DELIVERY_WAIT);

    let received = captured.lock().unwrap();
    assert_eq!(*received, vec![vec![0x99, 38, 100], vec![0x89, 38, 0]]);
}

#[test]
#[ignore]
fn test_note_off_and_cc_not_relayed() {
    let mut feeder = open_feeder("feeder-quiet");
    thread::sleep(PORT_SETTLE);

    let relay = Relay::builder()
        .input("feeder-quiet")
        .output(OutputTarget::Virtual("autorelease-test-quiet".to_string()))
        .build()
        .unwrap();
    assert!(relay.is_running());

    let (_capture, captured) = open_capture("autorelease-test-quiet");
    thread::sleep(PORT_SETTLE);

    feeder.send(&[0x89, 38, 64]).unwrap();
    feeder.send(&[0xB0, 7, 100]).unwrap();
    thread::sleep(DELIVERY_WAIT);

    assert!(captured.lock().unwrap().is_empty());
}

#[test]
#[ignore]
fn test_two_hits_keep_adjacent_pairs() {
    let mut feeder = open_feeder("feeder-pair");
    thread::sleep(PORT_SETTLE);

    let relay = Relay::builder()
        .input("feeder-pair")
        .output(OutputTarget::Virtual("autorelease-test-pair".to_string()))
        .build()
        .unwrap();
    assert!(relay.is_running());

    let (_capture, captured) = open_capture("autorelease-test-pair");
    thread::sleep(PORT_SETTLE);

    feeder.send(&[0x99, 36, 80]).unwrap();
    feeder.send(&[0x99, 38, 90]).unwrap();
    thread::sleep(DELIVERY_WAIT);

    let received = captured.lock().unwrap();
    assert_eq!(
        *received,
        vec![
            vec![0x99, 36, 80],
            vec![0x89, 36, 0],
            vec![0x99, 38, 90],
            vec![0x89, 38, 0],
        ]
    );
}
