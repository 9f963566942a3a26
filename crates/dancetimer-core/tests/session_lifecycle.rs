//! Integration tests for a full dance session.
//!
//! These tests drive the timer through the public API the way the CLI does:
//! rules come from the database, the machine runs on a manual clock, and
//! the finished record lands back in the history.

use std::sync::Arc;

use chrono::{Duration, Utc};
use dancetimer_core::billing::format::billing_summary;
use dancetimer_core::{
    BillingPolicy, Database, Event, HistoryStore, ManualClock, PriceTier, PricingRule, RuleStore,
    TimerMachine, TimerSettings, TimerState,
};

fn machine_with_clock() -> (Arc<ManualClock>, TimerMachine) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let machine = TimerMachine::new(clock.clone(), TimerSettings::default());
    (clock, machine)
}

#[test]
fn test_three_minute_song_stopped_at_269_seconds() {
    let db = Database::open_memory().unwrap();
    db.seed_default_rules().unwrap();
    let three_min = db
        .list_rules()
        .unwrap()
        .into_iter()
        .find(|r| r.name == "3 min ¥10")
        .unwrap();
    db.set_as_default(three_min.id).unwrap();

    let (clock, mut machine) = machine_with_clock();
    let rule = db.default_rule().unwrap();
    machine.start(rule, false).unwrap();

    for _ in 0..269 {
        clock.advance_secs(1);
        machine.tick();
    }

    let Some(Event::TimerStopped { record, .. }) = machine.stop() else {
        panic!("stop should produce a record");
    };
    let id = db.insert_record(&record).unwrap();

    let stored = db.record(id).unwrap().unwrap();
    assert_eq!(stored.duration_seconds, 269);
    assert_eq!(stored.cost, 10.0);
    assert_eq!(stored.pricing_rule_name, "3 min ¥10");
    assert_eq!(stored.pricing_rule_id, Some(three_min.id));
    assert_eq!(stored.end_time - stored.start_time, Duration::seconds(269));

    match machine.state() {
        TimerState::Finished(summary) => {
            assert_eq!(summary.song_count, 1);
            assert!(!summary.is_grace_applied);
        }
        other => panic!("expected Finished, got {other:?}"),
    }
}

#[test]
fn test_deleted_rule_does_not_rewrite_history() {
    let db = Database::open_memory().unwrap();
    let id = db
        .insert_rule(&PricingRule::new("tonight", vec![PriceTier::new(4.0, 20.0)]))
        .unwrap();

    let (clock, mut machine) = machine_with_clock();
    machine.start(db.rule(id).unwrap(), false);
    clock.advance_secs(600);
    let Some(Event::TimerStopped { record, .. }) = machine.stop() else {
        panic!("stop should produce a record");
    };
    let record_id = db.insert_record(&record).unwrap();
    db.delete_rule(id).unwrap();

    let stored = db.record(record_id).unwrap().unwrap();
    assert_eq!(stored.pricing_rule_name, "tonight");
    assert_eq!(stored.cost, 60.0);
}

#[test]
fn test_running_snapshot_matches_billing_summary() {
    let tiers = vec![PriceTier::new(4.0, 20.0)];
    let (clock, mut machine) = machine_with_clock();
    machine.start(Some(PricingRule::new("4 min", tiers.clone())), false);
    clock.advance_secs(250);
    machine.tick();

    let TimerState::Running(state) = machine.state() else {
        panic!("expected Running");
    };
    let quote = BillingPolicy::default().quote(state.elapsed_seconds, &state.tiers);
    assert_eq!(quote.cost, state.cost);
    assert_eq!(
        billing_summary(&quote, !state.tiers.is_empty(), "¥"),
        "grace 20s · 1 song charged · ¥20"
    );
}

#[test]
fn test_missing_default_rule_runs_free() {
    let db = Database::open_memory().unwrap();
    let (clock, mut machine) = machine_with_clock();
    machine.start(db.default_rule().unwrap(), false);
    clock.advance_secs(3_600);
    let Some(Event::TimerStopped { record, .. }) = machine.stop() else {
        panic!("stop should produce a record");
    };
    assert_eq!(record.cost, 0.0);
    assert_eq!(record.pricing_rule_id, None);
    assert_eq!(record.pricing_rule_name, dancetimer_core::timer::NO_RULE_NAME);
}
