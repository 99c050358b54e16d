use std::time::Duration;

use tokio::time::Instant;

use huddle::{
    evaluator::Perspective,
    supervisor::{ArbitrationPolicy, EmissionRecord, RejectionReason, SupervisorState, arbitrate},
};

use super::proposal;

fn fresh_state() -> SupervisorState {
    SupervisorState::new(Perspective::ALL)
}

#[test]
fn given_two_eligible_proposals_then_higher_score_wins_and_loser_is_outranked() {
    let now = Instant::now();
    let legal = proposal(Perspective::Legal, "Review the indemnity clause.", 0.9, now);
    let pm = proposal(Perspective::ProjectManagement, "Who owns the rollout?", 0.7, now);

    let arbitration = arbitrate(
        vec![pm, legal.clone()],
        &fresh_state(),
        &ArbitrationPolicy::default(),
        now,
    );

    assert_eq!(arbitration.winner, Some(legal));
    assert_eq!(arbitration.rejections.len(), 1);
    assert_eq!(
        arbitration.rejection_of(Perspective::ProjectManagement),
        Some(&RejectionReason::Outranked {
            winner: Perspective::Legal
        })
    );
}

#[test]
fn given_equal_scores_then_source_rank_breaks_the_tie() {
    let now = Instant::now();
    let proposals = vec![
        proposal(Perspective::Synthesis, "Let us recap the decision.", 0.8, now),
        proposal(Perspective::Sales, "The discount needs sign-off.", 0.8, now),
        proposal(Perspective::ProjectManagement, "The deadline is at risk.", 0.8, now),
        proposal(Perspective::Market, "Competitors launched last week.", 0.8, now),
    ];

    let arbitration = arbitrate(proposals, &fresh_state(), &ArbitrationPolicy::default(), now);
    let winner = arbitration.winner.as_ref().expect("a proposal should win");
    assert_eq!(winner.source, Perspective::ProjectManagement);
    assert_eq!(arbitration.rejected_at("selection").count(), 3);
}

#[test]
fn given_equal_score_and_source_then_earlier_proposal_wins() {
    let now = Instant::now();
    let earlier = proposal(Perspective::Market, "Check the launch window.", 0.8, now);
    let later = proposal(
        Perspective::Market,
        "Brand positioning needs a refresh.",
        0.8,
        now + Duration::from_millis(5),
    );

    let arbitration = arbitrate(
        vec![later, earlier.clone()],
        &fresh_state(),
        &ArbitrationPolicy::default(),
        now,
    );
    assert_eq!(arbitration.winner, Some(earlier));
}

#[test]
fn given_recent_emission_from_same_source_then_rate_gate_rejects() {
    let emitted_at = Instant::now();
    let state = SupervisorState::with_history(
        Perspective::ALL,
        [EmissionRecord::new(
            Perspective::Legal,
            "Loop in legal on the vendor contract.",
            emitted_at,
        )],
    );
    let now = emitted_at + Duration::from_secs(10);
    let candidate = proposal(Perspective::Legal, "GDPR exposure on the export.", 0.95, now);

    let arbitration = arbitrate(vec![candidate], &state, &ArbitrationPolicy::default(), now);

    assert_eq!(arbitration.winner, None);
    assert_eq!(
        arbitration.rejection_of(Perspective::Legal),
        Some(&RejectionReason::SourceCooldown {
            remaining: Duration::from_secs(20)
        })
    );
}

#[test]
fn given_emission_inside_global_interval_then_every_proposal_is_rejected() {
    let emitted_at = Instant::now();
    let state = SupervisorState::with_history(
        Perspective::ALL,
        [EmissionRecord::new(Perspective::Sales, "Pricing needs approval.", emitted_at)],
    );
    let now = emitted_at + Duration::from_secs(2);
    let proposals = vec![
        proposal(Perspective::Legal, "Flag the NDA.", 0.95, now),
        proposal(Perspective::Market, "Launch timing matters.", 0.9, now),
    ];

    let arbitration = arbitrate(proposals, &state, &ArbitrationPolicy::default(), now);
    assert_eq!(arbitration.winner, None);
    assert_eq!(arbitration.rejected_at("global").count(), 2);
    assert!(matches!(
        arbitration.rejection_of(Perspective::Legal),
        Some(RejectionReason::GlobalCooldown { remaining }) if *remaining == Duration::from_secs(3)
    ));
}

#[test]
fn given_source_at_cap_then_cap_is_reported_before_interval() {
    let start = Instant::now();
    let history = (0..5).map(|index| {
        EmissionRecord::new(
            Perspective::Sales,
            &format!("commercial note {index} about seat {index}"),
            start + Duration::from_secs(40 * index),
        )
    });
    let state = SupervisorState::with_history(Perspective::ALL, history);
    let now = start + Duration::from_secs(400);

    let arbitration = arbitrate(
        vec![proposal(Perspective::Sales, "Offer a multi-year renewal.", 0.99, now)],
        &state,
        &ArbitrationPolicy::default(),
        now,
    );
    assert_eq!(
        arbitration.rejection_of(Perspective::Sales),
        Some(&RejectionReason::ResponseCapReached { emitted: 5, cap: 5 })
    );
}

#[test]
fn given_score_at_threshold_then_priority_gate_admits_it() {
    let now = Instant::now();
    let at_threshold = proposal(Perspective::Synthesis, "Summarise the agreed scope.", 0.6, now);
    let below = proposal(Perspective::Market, "A trend worth watching.", 0.59, now);

    let arbitration = arbitrate(
        vec![at_threshold.clone(), below],
        &fresh_state(),
        &ArbitrationPolicy::default(),
        now,
    );
    assert_eq!(arbitration.winner, Some(at_threshold));
    assert!(matches!(
        arbitration.rejection_of(Perspective::Market),
        Some(RejectionReason::BelowPriorityThreshold { .. })
    ));
}

#[test]
fn given_duplicate_of_past_emission_then_it_never_wins() {
    let emitted_at = Instant::now();
    let state = SupervisorState::with_history(
        Perspective::ALL,
        [EmissionRecord::new(
            Perspective::Legal,
            "Please loop in legal review before signing the vendor contract.",
            emitted_at,
        )],
    );
    let now = emitted_at + Duration::from_secs(120);
    let duplicate = proposal(
        Perspective::ProjectManagement,
        "please loop in LEGAL review before signing the vendor contract",
        0.99,
        now,
    );
    let distinct = proposal(Perspective::Market, "Competitor pricing dropped.", 0.65, now);

    let arbitration = arbitrate(
        vec![duplicate, distinct.clone()],
        &state,
        &ArbitrationPolicy::default(),
        now,
    );
    assert_eq!(arbitration.winner, Some(distinct));
    assert!(matches!(
        arbitration.rejection_of(Perspective::ProjectManagement),
        Some(RejectionReason::Duplicate {
            matched_source: Perspective::Legal,
            ..
        })
    ));
}

#[test]
fn given_same_inputs_then_arbitration_is_repeatable() {
    let now = Instant::now();
    let proposals = vec![
        proposal(Perspective::Legal, "Flag the license terms.", 0.8, now),
        proposal(Perspective::Sales, "Quote expires Friday.", 0.8, now),
        proposal(Perspective::Market, "Low-signal remark.", 0.3, now),
    ];
    let state = fresh_state();
    let policy = ArbitrationPolicy::default();

    let first = arbitrate(proposals.clone(), &state, &policy, now);
    let second = arbitrate(proposals, &state, &policy, now);
    assert_eq!(first, second);
}

#[test]
fn given_no_proposals_then_no_winner_and_no_rejections() {
    let arbitration = arbitrate(
        Vec::new(),
        &fresh_state(),
        &ArbitrationPolicy::default(),
        Instant::now(),
    );
    assert_eq!(arbitration.winner, None);
    assert!(arbitration.rejections.is_empty());
}

#[test]
fn given_short_past_emission_when_longer_proposal_shares_its_words_then_it_is_not_a_duplicate() {
    let emitted_at = Instant::now();
    let state = SupervisorState::with_history(
        Perspective::ALL,
        [EmissionRecord::new(Perspective::Sales, "Check the budget", emitted_at)],
    );
    let now = emitted_at + Duration::from_secs(120);
    let longer = proposal(
        Perspective::ProjectManagement,
        "Check the budget allocation for the Q3 campaign, and schedule the legal review of the partner contract before Friday",
        0.8,
        now,
    );

    let arbitration = arbitrate(
        vec![longer.clone()],
        &state,
        &ArbitrationPolicy::default(),
        now,
    );
    assert_eq!(arbitration.winner, Some(longer));
    assert_eq!(arbitration.rejected_at("dedup").count(), 0);
}
