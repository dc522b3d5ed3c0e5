//! Command-line relay: pick the ports, start the relay, run until Enter.

use clap::Parser;
use midi_autorelease::{OutputTarget, Relay, Result};
use std::io::{stdin, stdout, Write};
use std::process;

#[derive(Parser, Debug)]
#[clap(author, about, long_about = None)]
struct Args {
    /// MIDI input port to listen on (prompts interactively when omitted)
    input: Option<String>,

    /// MIDI output port to relay into (a virtual port is created when omitted)
    output: Option<String>,

    /// List available MIDI ports and exit
    #[clap(short, long, value_parser)]
    list: bool,

    /// Log every received and relayed message
    #[clap(short, long, value_parser)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    if args.list {
        print_ports();
        return Ok(());
    }

    let inputs: Vec<String> = Relay::list_input_devices()
        .into_iter()
        .map(|d| d.name)
        .collect();
    if inputs.is_empty() {
        eprintln!("No MIDI input port found. Connect a device and try again.");
        process::exit(1);
    }

    let input_name = match args.input {
        Some(name) => name,
        None => match prompt_for_port("Select the input MIDI port:", &inputs)? {
            Some(name) => name,
            None => {
                eprintln!("An input MIDI port is required.");
                process::exit(1);
            }
        },
    };

    let output_target = match args.output {
        Some(name) => OutputTarget::Device(name),
        None if Relay::virtual_output_supported() => OutputTarget::default(),
        None => {
            // No virtual ports on this platform; an existing output port
            // has to stand in.
            let outputs: Vec<String> = Relay::list_output_devices()
                .into_iter()
                .map(|d| d.name)
                .collect();
            if outputs.is_empty() {
                eprintln!("This platform cannot create virtual MIDI ports and no output port exists.");
                eprintln!("Create one with a loopback tool such as loopMIDI, then try again.");
                process::exit(1);
            }
            match prompt_for_port("Select the output MIDI port:", &outputs)? {
                Some(name) => OutputTarget::Device(name),
                None => {
                    eprintln!("An output MIDI port is required on this platform.");
                    process::exit(1);
                }
            }
        }
    };

    let relay = match Relay::builder()
        .input(input_name)
        .output(output_target)
        .build()
    {
        Ok(relay) => relay,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Run with --list to see the available ports.");
            process::exit(1);
        }
    };

    println!();
    println!("Auto note-off relay started.");
    println!("  listening on: {}", relay.input_name());
    println!("  relaying to:  {}", relay.output_name());
    println!();
    println!("Set up your DAW to read MIDI from '{}'.", relay.output_name());
    println!("Press Enter to quit.");

    let mut line = String::new();
    stdin().read_line(&mut line)?;

    Ok(())
}

fn print_ports() {
    println!("MIDI input ports:");
    let inputs = Relay::list_input_devices();
    if inputs.is_empty() {
        println!("  (none found)");
    }
    for dev in &inputs {
        println!("  [{}] {}", dev.index, dev.name);
    }

    println!();
    println!("MIDI output ports:");
    let outputs = Relay::list_output_devices();
    if outputs.is_empty() {
        println!("  (none found)");
    }
    for dev in &outputs {
        println!("  [{}] {}", dev.index, dev.name);
    }
}

/// Numbered selection over `names`. Returns `None` when the answer is
/// blank or not a listed number.
fn prompt_for_port(title: &str, names: &[String]) -> Result<Option<String>> {
    println!("{}", title);
    for (i, name) in names.iter().enumerate() {
        println!("  [{}] {}", i + 1, name);
    }
    print!("Port number (blank to quit): ");
    stdout().flush()?;

    let mut line = String::new();
    stdin().read_line(&mut line)?;

    let choice = match line.trim().parse::<usize>() {
        Ok(n) if (1..=names.len()).contains(&n) => Some(names[n - 1].clone()),
        _ => None,
    };
    Ok(choice)
}
