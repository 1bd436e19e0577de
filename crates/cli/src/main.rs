//! repsim CLI — drives the simulator over an instruction stream.
//!
//! Two modes:
//! - **File mode**: `repsim test.txt` — one instruction per line
//! - **Pipe mode**: `cat test.txt | repsim` — same, from stdin
//!
//! Output is human-readable by default; `--json` emits one JSON object
//! per event for machine consumption. Diagnostics go to stderr via
//! `RUST_LOG`.

mod format;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::process;

use clap::{Arg, ArgAction, Command};
use repsim_engine::Simulator;

use format::{format_error, print_events, OutputMode};

fn build_cli() -> Command {
    Command::new("repsim")
        .about("Deterministic simulator of replicated concurrency control")
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .help("Instruction file; reads stdin when omitted"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Emit one JSON object per event"),
        )
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let matches = build_cli().get_matches();
    let mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let reader: Box<dyn BufRead> = match matches.get_one::<String>("input") {
        Some(path) => match File::open(path) {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(e) => {
                eprintln!("failed to open {}: {}", path, e);
                process::exit(1);
            }
        },
        None => Box::new(io::stdin().lock()),
    };

    process::exit(run(reader, mode));
}

fn run(reader: Box<dyn BufRead>, mode: OutputMode) -> i32 {
    let mut sim = Simulator::new();
    let mut status = 0;

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("read error: {}", e);
                return 1;
            }
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        print_events(&sim.tick_boundary(), mode);
        match sim.process_instruction(line) {
            Ok(events) => print_events(&events, mode),
            Err(err) => {
                eprintln!("{}", format_error(&err, mode));
                status = 1;
            }
        }
    }

    // One more boundary so work unblocked by the last instruction runs.
    print_events(&sim.tick_boundary(), mode);
    status
}
