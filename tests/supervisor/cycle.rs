use std::{sync::atomic::Ordering, time::Duration};

use huddle::{
    dispatch::DispatchErrorKind,
    evaluator::{Assessment, Perspective},
    supervisor::{ArbitrationPolicy, CycleDisposition, RejectionReason, arbitrate},
    testing::{RecordingSink, ScriptedEvaluator},
};

use super::{discourse, supervisor_with};

fn legal_speaker() -> ScriptedEvaluator {
    ScriptedEvaluator::speaking(
        Perspective::Legal,
        Assessment::new("Loop in legal before signing.", 0.9, 0.9, 0.9),
    )
}

#[tokio::test(start_paused = true)]
async fn given_single_eligible_proposal_when_cycle_runs_then_it_is_emitted_and_counted() {
    let sink = RecordingSink::new();
    let mut supervisor = supervisor_with(
        vec![
            legal_speaker(),
            ScriptedEvaluator::abstaining(Perspective::Market),
        ],
        ArbitrationPolicy::default(),
        &sink,
    );

    let report = supervisor.run_cycle(1, discourse(5)).await;
    let receipt = report
        .disposition
        .emitted()
        .expect("legal proposal should be emitted")
        .clone();

    assert_eq!(receipt.source, Perspective::Legal);
    assert!(receipt.pinned);
    let counters = supervisor.state().counters(Perspective::Legal);
    assert_eq!(counters.responses_emitted_count, 1);
    assert_eq!(counters.last_emitted_at, Some(receipt.emitted_at));
    assert_eq!(supervisor.state().total_emissions(), 1);

    let posts = sink.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].content, "⚖️ **Legal Agent**\n\nLoop in legal before signing.");
    assert!(posts[0].pin);
}

#[tokio::test(start_paused = true)]
async fn given_global_cooldown_when_cycle_runs_then_evaluators_are_not_invoked() {
    let sink = RecordingSink::new();
    let member = legal_speaker();
    let calls = member.call_counter();
    let mut supervisor = supervisor_with(vec![member], ArbitrationPolicy::default(), &sink);

    supervisor.run_cycle(1, discourse(5)).await;
    let report = supervisor.run_cycle(2, discourse(6)).await;

    assert!(matches!(
        report.disposition,
        CycleDisposition::SkippedGlobalCooldown { .. }
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(sink.posts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn given_recent_emission_then_cooldown_remaining_counts_down_to_reopening() {
    let sink = RecordingSink::new();
    let mut supervisor = supervisor_with(vec![legal_speaker()], ArbitrationPolicy::default(), &sink);
    assert_eq!(supervisor.cooldown_remaining(tokio::time::Instant::now()), None);

    supervisor.run_cycle(1, discourse(5)).await;
    let now = supervisor
        .state()
        .last_emission_at()
        .expect("cycle should have emitted");
    assert_eq!(supervisor.cooldown_remaining(now), Some(Duration::from_secs(5)));
    assert_eq!(
        supervisor.cooldown_remaining(now + Duration::from_secs(2)),
        Some(Duration::from_secs(3))
    );
    assert_eq!(supervisor.cooldown_remaining(now + Duration::from_secs(5)), None);
}

#[tokio::test(start_paused = true)]
async fn given_cooldown_without_skip_then_no_cooldown_is_reported() {
    let sink = RecordingSink::new();
    let policy = ArbitrationPolicy {
        skip_evaluation_during_cooldown: false,
        ..ArbitrationPolicy::default()
    };
    let mut supervisor = supervisor_with(vec![legal_speaker()], policy, &sink);

    supervisor.run_cycle(1, discourse(5)).await;
    assert_eq!(supervisor.cooldown_remaining(tokio::time::Instant::now()), None);
}

#[tokio::test(start_paused = true)]
async fn given_cooldown_without_skip_when_cycle_runs_then_proposals_are_rejected_globally() {
    let sink = RecordingSink::new();
    let policy = ArbitrationPolicy {
        skip_evaluation_during_cooldown: false,
        ..ArbitrationPolicy::default()
    };
    let mut supervisor = supervisor_with(vec![legal_speaker()], policy, &sink);

    supervisor.run_cycle(1, discourse(5)).await;
    let report = supervisor.run_cycle(2, discourse(6)).await;

    assert_eq!(report.disposition, CycleDisposition::NoWinner);
    assert!(matches!(
        report.arbitration.rejection_of(Perspective::Legal),
        Some(RejectionReason::GlobalCooldown { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn given_source_cooldown_when_later_cycle_runs_then_other_source_may_speak() {
    let sink = RecordingSink::new();
    let mut supervisor = supervisor_with(
        vec![
            legal_speaker(),
            ScriptedEvaluator::speaking(
                Perspective::Sales,
                Assessment::new("The renewal quote needs approval.", 0.7, 0.7, 0.7),
            ),
        ],
        ArbitrationPolicy::default(),
        &sink,
    );

    let first = supervisor.run_cycle(1, discourse(5)).await;
    assert_eq!(
        first.disposition.emitted().map(|receipt| receipt.source),
        Some(Perspective::Legal)
    );

    tokio::time::advance(Duration::from_secs(10)).await;
    let second = supervisor.run_cycle(2, discourse(15)).await;
    assert_eq!(
        second.disposition.emitted().map(|receipt| receipt.source),
        Some(Perspective::Sales)
    );
    assert!(matches!(
        second.arbitration.rejection_of(Perspective::Legal),
        Some(RejectionReason::SourceCooldown { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn given_every_member_abstains_then_cycle_reports_no_proposals() {
    let sink = RecordingSink::new();
    let mut supervisor = supervisor_with(
        vec![
            ScriptedEvaluator::abstaining(Perspective::Legal),
            ScriptedEvaluator::failing(Perspective::Sales, "model unavailable"),
        ],
        ArbitrationPolicy::default(),
        &sink,
    );

    let report = supervisor.run_cycle(1, discourse(5)).await;
    assert_eq!(report.disposition, CycleDisposition::NoProposals);
    assert_eq!(report.evaluator_failures(), 1);
    assert_eq!(sink.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn given_sink_failure_then_state_is_untouched_and_retry_sees_same_gates() {
    let sink = RecordingSink::new();
    sink.set_failing(true);
    let mut supervisor = supervisor_with(vec![legal_speaker()], ArbitrationPolicy::default(), &sink);

    let report = supervisor.run_cycle(1, discourse(5)).await;
    match &report.disposition {
        CycleDisposition::DispatchFailed { source, error } => {
            assert_eq!(*source, Perspective::Legal);
            assert_eq!(error.kind, DispatchErrorKind::Unavailable);
        }
        other => panic!("unexpected disposition: {other:?}"),
    }
    assert!(report.dispatch_failed());
    assert_eq!(supervisor.state().total_emissions(), 0);
    assert_eq!(
        supervisor.state().counters(Perspective::Legal).last_emitted_at,
        None
    );

    let replay = arbitrate(
        report.pool.proposals(),
        supervisor.state(),
        supervisor.policy(),
        tokio::time::Instant::now(),
    );
    assert_eq!(replay.winner, report.arbitration.winner);

    sink.set_failing(false);
    let retry = supervisor.run_cycle(2, discourse(15)).await;
    assert!(retry.disposition.emitted().is_some());
    assert_eq!(supervisor.statistics().total_responses, 1);
}

#[tokio::test(start_paused = true)]
async fn given_stalled_sink_then_post_times_out_without_recording() {
    let sink = RecordingSink::new();
    sink.set_delay(Duration::from_secs(60));
    let mut supervisor = supervisor_with(vec![legal_speaker()], ArbitrationPolicy::default(), &sink);

    let report = supervisor.run_cycle(1, discourse(5)).await;
    match &report.disposition {
        CycleDisposition::DispatchFailed { error, .. } => {
            assert_eq!(error.kind, DispatchErrorKind::Timeout)
        }
        other => panic!("unexpected disposition: {other:?}"),
    }
    assert_eq!(supervisor.state().total_emissions(), 0);
    assert!(sink.posts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn given_many_eligible_proposals_then_at_most_one_is_emitted_per_cycle() {
    let sink = RecordingSink::new();
    let members = Perspective::ALL
        .iter()
        .map(|perspective| {
            ScriptedEvaluator::speaking(
                *perspective,
                Assessment::new(format!("{perspective} has a distinct concern"), 0.8, 0.8, 0.8),
            )
        })
        .collect();
    let mut supervisor = supervisor_with(members, ArbitrationPolicy::default(), &sink);

    let report = supervisor.run_cycle(1, discourse(5)).await;
    assert_eq!(sink.posts().len(), 1);
    assert_eq!(report.arbitration.rejected_at("selection").count(), 4);
    assert_eq!(
        report.disposition.emitted().map(|receipt| receipt.source),
        Some(Perspective::Legal)
    );
}

#[tokio::test(start_paused = true)]
async fn given_panicking_sink_then_cycle_reports_dispatch_failure_and_supervisor_survives() {
    let sink = RecordingSink::new();
    sink.set_panicking(true);
    let mut supervisor = supervisor_with(vec![legal_speaker()], ArbitrationPolicy::default(), &sink);

    let report = supervisor.run_cycle(1, discourse(5)).await;
    match &report.disposition {
        CycleDisposition::DispatchFailed { error, .. } => {
            assert_eq!(error.kind, DispatchErrorKind::Internal)
        }
        other => panic!("unexpected disposition: {other:?}"),
    }

    sink.set_panicking(false);
    let retry = supervisor.run_cycle(2, discourse(15)).await;
    assert!(retry.disposition.emitted().is_some());
}
