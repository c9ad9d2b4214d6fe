use desktop_pet::clock::format_timestamp;
use desktop_pet::config::GrowthTuning;
use desktop_pet::growth::{Action, ActionOutcome, GrowthLedger, Stage, StageChange, Warnings};
use pretty_assertions::assert_eq;
use serde_json::json;
use speculoos::prelude::*;
use time::Duration;

mod common;

fn ledger_from(record: serde_json::Value) -> GrowthLedger {
    GrowthLedger::load(Some(&record), common::start_time(), GrowthTuning::default()).0
}

#[test]
fn test_fresh_ledger_is_a_full_egg() {
    let (ledger, summary) = GrowthLedger::load(None, common::start_time(), GrowthTuning::default());

    assert_that(&ledger.stage()).is_equal_to(Stage::Egg);
    assert_that(&ledger.exp()).is_equal_to(0);
    assert_that(&ledger.stats().average()).is_equal_to(100.0);
    assert_that(&summary.offline_minutes).is_equal_to(0);
    assert_eq!(ledger.warnings(), Warnings::empty());
}

#[test]
fn test_offline_decay_is_applied_on_load() {
    let now = common::start_time();
    let last_seen = now - Duration::hours(3);
    let (ledger, summary) = GrowthLedger::load(
        Some(&json!({ "schemaVersion": 2, "exp": 10, "lastSeenTimestamp": format_timestamp(last_seen) })),
        now,
        GrowthTuning::default(),
    );

    assert_that(&summary.offline_minutes).is_equal_to(180);
    let stats = ledger.stats();
    assert_that(&stats.hunger).is_close_to(60.4, 1e-6);
    assert_that(&stats.happiness).is_close_to(67.6, 1e-6);
    assert_that(&stats.cleanliness).is_close_to(64.0, 1e-6);
    assert_that(&stats.health).is_equal_to(100.0);
    assert_that(&ledger.save().last_seen_timestamp).is_equal_to(now);
}

#[test]
fn test_offline_decay_is_capped_and_penalizes_health() {
    let now = common::start_time();
    let (ledger, summary) = GrowthLedger::load(
        Some(&json!({ "lastSeenTimestamp": format_timestamp(now - Duration::days(2)) })),
        now,
        GrowthTuning::default(),
    );

    assert_that(&summary.offline_minutes).is_equal_to(720);
    assert_that(&ledger.stats().hunger).is_equal_to(0.0);
    assert_that(&ledger.stats().cleanliness).is_close_to(0.0, 1e-6);
    // Hunger crosses the danger line on minute 341, leaving 380 penalized minutes.
    assert_that(&ledger.stats().health).is_close_to(39.2, 1e-6);
    assert!(ledger.warnings().contains(Warnings::HUNGRY | Warnings::DIRTY));
}

#[test]
fn test_partial_minutes_are_not_decayed() {
    let now = common::start_time();
    let ledger = ledger_from(json!({ "lastSeenTimestamp": format_timestamp(now - Duration::seconds(119)) }));
    assert_that(&ledger.stats().hunger).is_close_to(99.78, 1e-6);
}

#[test]
fn test_future_timestamp_does_not_decay() {
    let now = common::start_time();
    let ledger = ledger_from(json!({ "lastSeenTimestamp": format_timestamp(now + Duration::hours(5)) }));
    assert_that(&ledger.stats().average()).is_equal_to(100.0);
}

#[test]
fn test_action_on_full_stat_is_ineffective() {
    let mut ledger = ledger_from(json!({}));

    assert_that(&ledger.is_action_effective(Action::Feed)).is_false();
    let outcome = ledger.apply_action(Action::Feed, common::start_time());

    assert_eq!(outcome, ActionOutcome::Ineffective);
    assert_that(&ledger.exp()).is_equal_to(0);
    assert_that(&ledger.save().action_counts.total()).is_equal_to(0);
}

#[test]
fn test_play_grants_exp_and_caps_happiness() {
    let mut ledger = ledger_from(json!({ "stats": { "happiness": 90 } }));

    let outcome = ledger.apply_action(Action::Play, common::start_time());

    assert_eq!(
        outcome,
        ActionOutcome::Applied {
            exp_gained: 4,
            stage_change: None
        }
    );
    assert_that(&ledger.stats().happiness).is_equal_to(100.0);
    assert_that(&ledger.save().action_counts.play).is_equal_to(1);
    assert_that(&ledger.is_action_effective(Action::Play)).is_false();
}

#[test]
fn test_crossing_a_threshold_reports_growth() {
    let mut ledger = ledger_from(json!({ "exp": 28, "stats": { "happiness": 40 } }));

    let outcome = ledger.apply_action(Action::Play, common::start_time());

    let ActionOutcome::Applied { stage_change, .. } = outcome else {
        panic!("play should apply, got {outcome:?}");
    };
    let change = stage_change.expect("28 + 4 EXP crosses into Baby");
    assert_eq!(
        change,
        StageChange {
            from: Stage::Egg,
            to: Stage::Baby
        }
    );
    assert_that(&change.is_growth()).is_true();
    assert_that(&ledger.progress().current).is_equal_to(2);
}

#[test]
fn test_negative_delta_can_regress_and_floors_at_zero() {
    let mut ledger = ledger_from(json!({ "exp": 32 }));
    let now = common::start_time();

    let change = ledger.apply_exp_delta(-10, now).expect("32 - 10 drops back to Egg");
    assert_that(&change.is_growth()).is_false();
    assert_that(&ledger.exp()).is_equal_to(22);

    assert_that(&ledger.apply_exp_delta(-100, now)).is_none();
    assert_that(&ledger.exp()).is_equal_to(0);
}

#[test]
fn test_progress_within_stage() {
    let ledger = ledger_from(json!({ "exp": 60 }));
    let progress = ledger.progress();

    assert_that(&progress.stage).is_equal_to(Stage::Baby);
    assert_that(&progress.current).is_equal_to(30);
    assert_that(&progress.goal).is_equal_to(90);
    assert_that(&progress.ratio).is_close_to(0.5, 1e-9);
}

#[test]
fn test_stored_stage_is_rederived_from_exp() {
    let ledger = ledger_from(json!({ "exp": 200, "stage": "Egg" }));
    assert_that(&ledger.stage()).is_equal_to(Stage::Adult);
}

#[test]
fn test_reset_starts_a_new_egg() {
    let mut ledger = ledger_from(json!({ "exp": 120, "stats": { "hunger": 5 } }));

    let change = ledger.reset(common::start_time());

    assert_eq!(
        change,
        Some(StageChange {
            from: Stage::Teen,
            to: Stage::Egg
        })
    );
    assert_that(&ledger.exp()).is_equal_to(0);
    assert_that(&ledger.stats().hunger).is_equal_to(100.0);
}

#[test]
fn test_tick_decays_one_minute() {
    let mut ledger = ledger_from(json!({}));
    let later = common::start_time() + Duration::minutes(1);

    ledger.tick(later);

    assert_that(&ledger.stats().cleanliness).is_close_to(99.8, 1e-9);
    assert_that(&ledger.save().last_seen_timestamp).is_equal_to(later);
}

#[test]
fn test_ticks_match_offline_catch_up() {
    let now = common::start_time();
    let minutes = 500;
    let away_since = now - Duration::minutes(minutes);

    let (offline, _) = GrowthLedger::load(
        Some(&json!({ "lastSeenTimestamp": format_timestamp(away_since) })),
        now,
        GrowthTuning::default(),
    );
    let (mut ticked, _) = GrowthLedger::load(None, away_since, GrowthTuning::default());
    for minute in 1..=minutes {
        ticked.tick(away_since + Duration::minutes(minute));
    }

    // 500 minutes crosses the danger line, so the health penalty schedule is exercised too.
    assert_that(&(offline.stats().health < 100.0)).is_true();
    assert_eq!(ticked.stats(), offline.stats());
    assert_that(&ticked.save().last_seen_timestamp).is_equal_to(offline.save().last_seen_timestamp);
}

#[test]
fn test_repeated_play_grows_into_baby_then_stops_at_full_happiness() {
    // Eight plays take happiness from empty to exactly full.
    let mut tuning = GrowthTuning::default();
    tuning.play.happiness = 12.5;
    let now = common::start_time();
    let (mut ledger, _) = GrowthLedger::load(Some(&json!({ "stats": { "happiness": 0 } })), now, tuning);

    for _ in 0..8 {
        assert!(matches!(ledger.apply_action(Action::Play, now), ActionOutcome::Applied { exp_gained: 4, .. }));
    }
    assert_that(&ledger.exp()).is_equal_to(32);
    assert_that(&ledger.stage()).is_equal_to(Stage::Baby);
    assert_that(&ledger.stats().happiness).is_equal_to(100.0);

    assert_eq!(ledger.apply_action(Action::Play, now), ActionOutcome::Ineffective);
    assert_that(&ledger.exp()).is_equal_to(32);
    assert_that(&ledger.stage()).is_equal_to(Stage::Baby);
    assert_that(&ledger.save().action_counts.play).is_equal_to(8);
}
