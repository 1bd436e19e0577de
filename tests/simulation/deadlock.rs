//! Deadlock detection and victim selection over full scripts.

use crate::common::run_script;
use repsim::prelude::*;

#[test]
fn youngest_member_of_a_write_cycle_is_killed() {
    let (sim, events) = run_script(&[
        "begin(T1)",
        "begin(T2)",
        "W(T1,x2,10)",
        "W(T2,x4,20)",
        "W(T1,x4,11)",
        "W(T2,x2,21)",
        "end(T1)",
    ]);

    assert!(events.contains(&Event::CycleDetected {
        cycle: vec![TransactionId(1), TransactionId(2)],
    }));
    assert!(events.contains(&Event::Killed {
        txn: TransactionId(2),
    }));
    assert_eq!(sim.outcome(TransactionId(2)), Some(Outcome::Killed));

    // T1 resumes its blocked write and commits both items.
    assert!(events.contains(&Event::Resumed {
        txn: TransactionId(1),
    }));
    assert_eq!(sim.outcome(TransactionId(1)), Some(Outcome::Committed));
    assert_eq!(sim.store().site(SiteId(1)).value(ItemId(2)), Some(10));
    assert_eq!(sim.store().site(SiteId(1)).value(ItemId(4)), Some(11));
}

#[test]
fn older_transaction_survives_regardless_of_cycle_direction() {
    // Same shape but T2 begins first, so T1 is the victim.
    let (sim, events) = run_script(&[
        "begin(T2)",
        "begin(T1)",
        "W(T2,x4,20)",
        "W(T1,x2,10)",
        "W(T2,x2,21)",
        "W(T1,x4,11)",
        "end(T2)",
    ]);

    assert!(events.contains(&Event::Killed {
        txn: TransactionId(1),
    }));
    assert_eq!(sim.outcome(TransactionId(1)), Some(Outcome::Killed));
    assert_eq!(sim.outcome(TransactionId(2)), Some(Outcome::Committed));
}

#[test]
fn read_write_conflicts_form_cycles_too() {
    let (sim, events) = run_script(&[
        "begin(T1)",
        "begin(T2)",
        "R(T1,x2)",
        "R(T2,x4)",
        "W(T1,x4,11)",
        "W(T2,x2,21)",
        "end(T1)",
    ]);

    assert!(events.contains(&Event::CycleDetected {
        cycle: vec![TransactionId(1), TransactionId(2)],
    }));
    assert_eq!(sim.outcome(TransactionId(2)), Some(Outcome::Killed));
    assert_eq!(sim.outcome(TransactionId(1)), Some(Outcome::Committed));
}

#[test]
fn kill_releases_the_victims_locks_for_waiters() {
    let (sim, events) = run_script(&[
        "begin(T1)",
        "begin(T2)",
        "begin(T3)",
        "W(T1,x2,10)",
        "W(T2,x4,20)",
        "W(T1,x4,11)",
        "W(T2,x2,21)",
        "W(T3,x4,30)",
        "end(T1)",
        "end(T3)",
    ]);

    // T2 dies; both T1 and T3 eventually get x4.
    assert_eq!(sim.outcome(TransactionId(2)), Some(Outcome::Killed));
    assert_eq!(sim.outcome(TransactionId(1)), Some(Outcome::Committed));
    assert_eq!(sim.outcome(TransactionId(3)), Some(Outcome::Committed));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Resumed {
            txn: TransactionId(3)
        }
    )));
    // T3's write lands after T1's.
    assert_eq!(sim.store().site(SiteId(1)).value(ItemId(4)), Some(30));
}

#[test]
fn no_cycle_means_no_kill() {
    let (sim, events) = run_script(&[
        "begin(T1)",
        "begin(T2)",
        "W(T1,x2,10)",
        "W(T2,x2,20)",
        "end(T1)",
        "end(T2)",
    ]);

    assert!(!events.iter().any(|e| matches!(e, Event::CycleDetected { .. })));
    assert_eq!(sim.outcome(TransactionId(1)), Some(Outcome::Committed));
    assert_eq!(sim.outcome(TransactionId(2)), Some(Outcome::Committed));
    assert_eq!(sim.store().site(SiteId(3)).value(ItemId(2)), Some(20));
}
