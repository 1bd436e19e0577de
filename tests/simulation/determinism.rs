//! Replaying a script must always produce the same run.

use proptest::prelude::*;
use repsim::prelude::*;

fn arb_instruction() -> impl Strategy<Value = String> {
    prop_oneof![
        (1..5u32).prop_map(|t| format!("begin(T{t})")),
        (1..5u32).prop_map(|t| format!("beginRO(T{t})")),
        (1..5u32, 1..=20u32).prop_map(|(t, x)| format!("R(T{t},x{x})")),
        (1..5u32, 1..=20u32, 0..100i64).prop_map(|(t, x, v)| format!("W(T{t},x{x},{v})")),
        (1..=10u32).prop_map(|s| format!("fail({s})")),
        (1..=10u32).prop_map(|s| format!("recover({s})")),
        (1..5u32).prop_map(|t| format!("end(T{t})")),
        Just("dump()".to_string()),
    ]
}

fn replay(script: &[String]) -> (Vec<Event>, Vec<(TransactionId, Outcome)>) {
    let mut sim = Simulator::new();
    let mut events = Vec::new();
    for line in script {
        events.extend(sim.tick_boundary());
        // Scripts may reference transactions that never began; those
        // lines still consume a tick and change nothing else.
        if let Ok(produced) = sim.process_instruction(line) {
            events.extend(produced);
        }
    }
    events.extend(sim.tick_boundary());
    (events, sim.outcomes().to_vec())
}

proptest! {
    #[test]
    fn identical_scripts_produce_identical_runs(
        script in prop::collection::vec(arb_instruction(), 0..40)
    ) {
        prop_assert_eq!(replay(&script), replay(&script));
    }

    #[test]
    fn clock_advances_once_per_dispatch(
        script in prop::collection::vec(arb_instruction(), 0..40)
    ) {
        let mut sim = Simulator::new();
        let mut resumes = 0;
        for line in &script {
            resumes += sim
                .tick_boundary()
                .iter()
                .filter(|e| matches!(e, Event::Resumed { .. }))
                .count() as u64;
            let _ = sim.process_instruction(line);
        }
        resumes += sim
            .tick_boundary()
            .iter()
            .filter(|e| matches!(e, Event::Resumed { .. }))
            .count() as u64;
        // Every script line and every re-dispatch consumes one tick.
        prop_assert_eq!(sim.tick(), script.len() as u64 + resumes);
    }
}
