//! Read-only transactions: snapshots, blocking, and retries.

use crate::common::{reads, run_script};
use repsim::prelude::*;

#[test]
fn snapshot_reads_ignore_later_commits() {
    let (sim, events) = run_script(&[
        "beginRO(T1)",
        "begin(T2)",
        "W(T2,x2,99)",
        "end(T2)",
        "R(T1,x2)",
        "begin(T3)",
        "R(T3,x2)",
        "end(T1)",
        "end(T3)",
    ]);

    assert!(events.contains(&Event::SnapshotTaken {
        txn: TransactionId(1),
    }));
    // T1 reads its begin-time value; the fresh reader sees T2's commit.
    assert_eq!(
        reads(&events),
        vec![
            (TransactionId(1), ItemId(2), 20),
            (TransactionId(3), ItemId(2), 99),
        ]
    );
    assert_eq!(sim.outcome(TransactionId(1)), Some(Outcome::Committed));
}

#[test]
fn read_only_transactions_never_block_writers() {
    let (sim, events) = run_script(&[
        "beginRO(T1)",
        "begin(T2)",
        "W(T2,x6,61)",
        "R(T1,x6)",
        "end(T2)",
        "end(T1)",
    ]);

    assert!(!events.iter().any(|e| matches!(e, Event::Blocked { .. })));
    assert_eq!(reads(&events), vec![(TransactionId(1), ItemId(6), 60)]);
    assert_eq!(sim.outcome(TransactionId(2)), Some(Outcome::Committed));
}

#[test]
fn blocked_snapshot_retries_after_recovery() {
    let (sim, events) = run_script(&[
        "fail(8)",
        "beginRO(T1)",
        "R(T1,x7)",
        "recover(8)",
        "begin(T2)",
        "W(T2,x2,99)",
        "end(T2)",
        "R(T1,x2)",
        "R(T1,x7)",
        "end(T1)",
    ]);

    // x7 lives only at failed site 8, so the snapshot waits; the read
    // before recovery reports the wait instead of a value.
    let unavailable = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                Event::SnapshotUnavailable {
                    txn: TransactionId(1)
                }
            )
        })
        .count();
    assert_eq!(unavailable, 2);

    // The retried begin captures its snapshot before T2 commits.
    assert!(events.contains(&Event::SnapshotTaken {
        txn: TransactionId(1),
    }));
    assert_eq!(
        reads(&events),
        vec![
            (TransactionId(1), ItemId(2), 20),
            (TransactionId(1), ItemId(7), 70),
        ]
    );
    assert_eq!(sim.outcome(TransactionId(1)), Some(Outcome::Committed));
}

#[test]
fn read_only_commit_survives_unrelated_failures() {
    let (sim, _) = run_script(&[
        "beginRO(T1)",
        "fail(1)",
        "fail(2)",
        "R(T1,x2)",
        "end(T1)",
    ]);

    // No locks, no touched sites, nothing to validate.
    assert_eq!(sim.outcome(TransactionId(1)), Some(Outcome::Committed));
}
