//! Event rendering for the terminal.

use repsim_core::error::Error;
use repsim_engine::Event;
use std::fmt::Write as _;

/// How events are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Terse one-line renderings.
    Human,
    /// One JSON object per event.
    Json,
}

/// Print a batch of events in the chosen mode.
pub fn print_events(events: &[Event], mode: OutputMode) {
    for event in events {
        match mode {
            OutputMode::Json => match serde_json::to_string(event) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("serialization error: {}", e),
            },
            OutputMode::Human => println!("{}", human(event)),
        }
    }
}

/// Render an error for stderr.
pub fn format_error(err: &Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => format!("{{\"error\":\"{}\"}}", err),
        OutputMode::Human => format!("error: {}", err),
    }
}

fn human(event: &Event) -> String {
    match event {
        Event::ReadValue { item, value, .. } => format!("{}: {}", item, value),
        Event::SnapshotTaken { txn } => format!("{} takes its snapshot", txn),
        Event::SnapshotUnavailable { txn } => {
            format!("{} waits: some item has no readable copy", txn)
        }
        Event::Blocked { txn, waiting_for, .. } => {
            let mut line = format!("{} waits for", txn);
            for (i, blocker) in waiting_for.iter().enumerate() {
                let sep = if i == 0 { ' ' } else { ',' };
                let _ = write!(line, "{}{}", sep, blocker);
            }
            line
        }
        Event::NoAvailableSite { txn, item } => {
            format!("{} waits: no available site for {}", txn, item)
        }
        Event::SiteFailed { site } => format!("{} fails", site),
        Event::SiteRecovered { site } => format!("{} recovers", site),
        Event::Committed { txn } => format!("{} commits", txn),
        Event::Aborted { txn, stale_site } => {
            format!("{} aborts: {} failed after access", txn, stale_site)
        }
        Event::CycleDetected { cycle } => {
            let members: Vec<String> = cycle.iter().map(|t| t.to_string()).collect();
            format!("deadlock detected among {}", members.join(", "))
        }
        Event::Killed { txn } => format!("{} is killed", txn),
        Event::Resumed { txn } => format!("{} resumes", txn),
        Event::AlreadyEnded { txn, outcome } => format!("{} already {}", txn, outcome),
        Event::EndWhileBlocked { txn } => format!("{} is still blocked", txn),
        Event::Dump { sites } => {
            let mut out = String::new();
            for (i, row) in sites.iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                let items: Vec<String> = row
                    .items
                    .iter()
                    .map(|(item, value)| format!("{}: {}", item, value))
                    .collect();
                let _ = write!(out, "{} - {}", row.site, items.join(", "));
            }
            out
        }
    }
}
