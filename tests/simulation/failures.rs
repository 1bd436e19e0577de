//! Site failure, recovery, and commit validation across scripts.

use crate::common::{reads, run_script};
use repsim::prelude::*;

#[test]
fn failure_after_access_forces_an_abort() {
    let (sim, events) = run_script(&["begin(T1)", "R(T1,x2)", "fail(1)", "end(T1)"]);

    // The read was served by site 1, which then failed.
    assert_eq!(reads(&events), vec![(TransactionId(1), ItemId(2), 20)]);
    assert!(events.contains(&Event::Aborted {
        txn: TransactionId(1),
        stale_site: SiteId(1),
    }));
    assert_eq!(sim.outcome(TransactionId(1)), Some(Outcome::Aborted));
}

#[test]
fn failure_before_access_is_harmless() {
    let (sim, events) = run_script(&["fail(1)", "begin(T1)", "R(T1,x2)", "end(T1)"]);

    // Site 1 is down, so site 2 serves the read and the commit stands.
    assert_eq!(reads(&events), vec![(TransactionId(1), ItemId(2), 20)]);
    assert_eq!(sim.outcome(TransactionId(1)), Some(Outcome::Committed));
}

#[test]
fn aborted_writer_leaves_no_trace_and_frees_its_locks() {
    let (sim, events) = run_script(&[
        "begin(T1)",
        "W(T1,x8,88)",
        "fail(3)",
        "recover(3)",
        "end(T1)",
        "begin(T2)",
        "W(T2,x8,99)",
        "end(T2)",
    ]);

    // T1 locked x8 at site 3 before the failure, so it aborts even
    // though the site is back up.
    assert!(events.contains(&Event::Aborted {
        txn: TransactionId(1),
        stale_site: SiteId(3),
    }));
    assert_eq!(sim.outcome(TransactionId(2)), Some(Outcome::Committed));
    for site in SiteId::all() {
        assert_eq!(sim.store().site(site).value(ItemId(8)), Some(99));
    }
}

#[test]
fn recovery_restores_only_non_replicated_items() {
    let (sim, events) = run_script(&[
        "fail(2)",
        "recover(2)",
        "begin(T1)",
        "R(T1,x1)",
        "R(T1,x2)",
        "end(T1)",
    ]);

    // x1 lives only at site 2 and is readable right after recovery;
    // x2 is replicated, so site 1 serves it instead.
    assert_eq!(
        reads(&events),
        vec![
            (TransactionId(1), ItemId(1), 10),
            (TransactionId(1), ItemId(2), 20),
        ]
    );
    assert!(sim.store().site(SiteId(2)).is_readable(ItemId(1)));
    assert!(!sim.store().site(SiteId(2)).is_readable(ItemId(2)));
    assert_eq!(sim.outcome(TransactionId(1)), Some(Outcome::Committed));
}

#[test]
fn reader_parks_until_its_home_site_recovers() {
    let (sim, events) = run_script(&["fail(4)", "begin(T1)", "R(T1,x3)", "recover(4)", "end(T1)"]);

    assert!(events.contains(&Event::NoAvailableSite {
        txn: TransactionId(1),
        item: ItemId(3),
    }));
    assert!(events.contains(&Event::Resumed {
        txn: TransactionId(1),
    }));
    assert_eq!(reads(&events), vec![(TransactionId(1), ItemId(3), 30)]);
    assert_eq!(sim.outcome(TransactionId(1)), Some(Outcome::Committed));
}

#[test]
fn committed_write_restores_readability_of_a_replicated_item() {
    let (sim, events) = run_script(&[
        "fail(1)",
        "fail(2)",
        "fail(3)",
        "fail(4)",
        "fail(5)",
        "fail(6)",
        "fail(7)",
        "fail(8)",
        "fail(9)",
        "fail(10)",
        "recover(5)",
        "begin(T1)",
        "R(T1,x2)",
        "begin(T2)",
        "W(T2,x2,22)",
        "end(T2)",
    ]);

    // Site 5's copy of x2 is stale until T2's commit lands there.
    assert!(events.contains(&Event::NoAvailableSite {
        txn: TransactionId(1),
        item: ItemId(2),
    }));
    assert_eq!(sim.outcome(TransactionId(2)), Some(Outcome::Committed));
    assert_eq!(reads(&events), vec![(TransactionId(1), ItemId(2), 22)]);
    assert_eq!(
        sim.transaction_status(TransactionId(1)),
        Some(TransactionStatus::Running)
    );
}
