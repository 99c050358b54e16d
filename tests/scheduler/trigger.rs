use std::time::Duration;

use tokio::time::Instant;

use huddle::scheduler::{AnalysisScheduler, HoldReason, TriggerDecision, TriggerPolicy};

use super::default_scheduler;

#[test]
fn given_four_finals_when_evaluated_then_below_minimum_corpus() {
    let mut scheduler = default_scheduler();
    let now = Instant::now();
    for total in 1..=4 {
        assert_eq!(
            scheduler.evaluate(total, now),
            TriggerDecision::Hold(HoldReason::BelowMinimumCorpus {
                total_finals: total,
                required: 5,
            })
        );
    }
    assert!(scheduler.is_idle());
    assert_eq!(scheduler.cycles_started(), 0);
}

#[test]
fn given_fifth_final_when_evaluated_then_first_cycle_fires_on_count_alone() {
    let mut scheduler = default_scheduler();
    assert_eq!(
        scheduler.evaluate(5, Instant::now()),
        TriggerDecision::Fire { cycle_id: 1 }
    );
    assert_eq!(scheduler.cycles_started(), 1);
}

#[test]
fn given_completed_cycle_when_few_new_finals_then_awaits_interval() {
    let mut scheduler = default_scheduler();
    let start = Instant::now();
    scheduler.evaluate(5, start);
    assert!(scheduler.complete_cycle(1));

    assert_eq!(
        scheduler.evaluate(14, start + Duration::from_secs(120)),
        TriggerDecision::Hold(HoldReason::AwaitingNewFinals {
            new_finals: 9,
            required: 10,
        })
    );
    assert_eq!(
        scheduler.evaluate(15, start + Duration::from_secs(120)),
        TriggerDecision::Fire { cycle_id: 2 }
    );
}

#[test]
fn given_enough_finals_when_too_soon_then_cooling_down_until_interval() {
    let mut scheduler = default_scheduler();
    let start = Instant::now();
    scheduler.evaluate(5, start);
    scheduler.complete_cycle(1);

    assert!(matches!(
        scheduler.evaluate(20, start + Duration::from_secs(29)),
        TriggerDecision::Hold(HoldReason::CoolingDown { .. })
    ));
    assert_eq!(
        scheduler.evaluate(20, start + Duration::from_secs(30)),
        TriggerDecision::Fire { cycle_id: 2 }
    );
}

#[test]
fn given_custom_policy_then_thresholds_follow_it() {
    let mut scheduler = AnalysisScheduler::new(TriggerPolicy {
        min_transcript_count: 2,
        analysis_interval: 1,
        min_time_interval_seconds: 0,
    });
    let now = Instant::now();
    assert!(matches!(
        scheduler.evaluate(1, now),
        TriggerDecision::Hold(_)
    ));
    assert_eq!(scheduler.evaluate(2, now), TriggerDecision::Fire { cycle_id: 1 });
    scheduler.complete_cycle(1);
    assert_eq!(scheduler.evaluate(3, now), TriggerDecision::Fire { cycle_id: 2 });
}
