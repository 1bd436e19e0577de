//! Shared helpers for integration tests.

use repsim::prelude::*;

/// Drive a script the way the CLI does: a tick boundary before each
/// instruction and one final boundary after the stream ends. Panics on
/// malformed instructions; scripts in these tests are well-formed.
pub fn run_script(lines: &[&str]) -> (Simulator, Vec<Event>) {
    let mut sim = Simulator::new();
    let mut events = Vec::new();
    for line in lines {
        events.extend(sim.tick_boundary());
        let produced = sim
            .process_instruction(line)
            .unwrap_or_else(|err| panic!("instruction {line:?} failed: {err}"));
        events.extend(produced);
    }
    events.extend(sim.tick_boundary());
    (sim, events)
}

/// The values a script read, in order.
pub fn reads(events: &[Event]) -> Vec<(TransactionId, ItemId, Value)> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::ReadValue { txn, item, value } => Some((*txn, *item, *value)),
            _ => None,
        })
        .collect()
}
