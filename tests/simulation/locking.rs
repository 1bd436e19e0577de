//! Lock acquisition, queuing, and handoff across whole scripts.

use crate::common::{reads, run_script};
use repsim::prelude::*;

#[test]
fn writer_queues_behind_reader_and_reader_queues_behind_both() {
    let (sim, events) = run_script(&[
        "begin(T1)",
        "begin(T2)",
        "begin(T3)",
        "R(T1,x2)",
        "W(T2,x2,50)",
        "R(T3,x2)",
        "end(T1)",
        "end(T2)",
        "end(T3)",
    ]);

    // T2 conflicts with T1's shared lock; T3 waits behind both.
    assert!(events.contains(&Event::Blocked {
        txn: TransactionId(2),
        item: ItemId(2),
        waiting_for: vec![TransactionId(1)],
    }));
    assert!(events.contains(&Event::Blocked {
        txn: TransactionId(3),
        item: ItemId(2),
        waiting_for: vec![TransactionId(1), TransactionId(2)],
    }));

    // Handoff order: T1 reads the initial value, T3 reads T2's commit.
    assert_eq!(
        reads(&events),
        vec![
            (TransactionId(1), ItemId(2), 20),
            (TransactionId(3), ItemId(2), 50),
        ]
    );
    for txn in [1, 2, 3] {
        assert_eq!(sim.outcome(TransactionId(txn)), Some(Outcome::Committed));
    }
    for site in SiteId::all() {
        assert_eq!(sim.store().site(site).value(ItemId(2)), Some(50));
    }
}

#[test]
fn concurrent_readers_share_a_lock() {
    let (sim, events) = run_script(&[
        "begin(T1)",
        "begin(T2)",
        "R(T1,x4)",
        "R(T2,x4)",
        "end(T1)",
        "end(T2)",
    ]);

    assert_eq!(
        reads(&events),
        vec![
            (TransactionId(1), ItemId(4), 40),
            (TransactionId(2), ItemId(4), 40),
        ]
    );
    assert!(!events.iter().any(|e| matches!(e, Event::Blocked { .. })));
    assert_eq!(sim.outcome(TransactionId(1)), Some(Outcome::Committed));
    assert_eq!(sim.outcome(TransactionId(2)), Some(Outcome::Committed));
}

#[test]
fn writes_are_invisible_until_commit() {
    let (_, events) = run_script(&[
        "begin(T1)",
        "begin(T2)",
        "W(T1,x6,66)",
        "R(T1,x6)",
        "end(T1)",
        "R(T2,x6)",
        "end(T2)",
    ]);

    // T1 sees its own buffered write; T2 sees it only after commit.
    assert_eq!(
        reads(&events),
        vec![
            (TransactionId(1), ItemId(6), 66),
            (TransactionId(2), ItemId(6), 66),
        ]
    );
}

#[test]
fn write_to_a_non_replicated_item_touches_only_its_home_site() {
    let (sim, _) = run_script(&["begin(T1)", "W(T1,x3,35)", "end(T1)"]);

    // x3 lives only at site 4.
    assert_eq!(sim.store().site(SiteId(4)).value(ItemId(3)), Some(35));
    assert_eq!(sim.store().site(SiteId(5)).value(ItemId(3)), None);
}

#[test]
fn dump_reflects_committed_state_only() {
    let (sim, events) = run_script(&[
        "begin(T1)",
        "W(T1,x2,99)",
        "dump()",
        "end(T1)",
        "dump()",
    ]);

    let dumps: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::Dump { sites } => Some(sites),
            _ => None,
        })
        .collect();
    assert_eq!(dumps.len(), 2);
    assert!(dumps[0][0].items.contains(&(ItemId(2), 20)));
    assert!(dumps[1][0].items.contains(&(ItemId(2), 99)));
    assert_eq!(sim.outcome(TransactionId(1)), Some(Outcome::Committed));
}
