use tokio::time::Instant;

use crate::{
    evaluator::Proposal,
    supervisor::{
        similarity::ContentProfile,
        state::{SourceCounters, SupervisorState},
        types::{ArbitrationPolicy, RejectionReason},
    },
};

/// Absorbs float noise in weighted sums so a score equal to the threshold passes.
const SCORE_TOLERANCE: f64 = 1e-9;

pub fn global_gate(
    state: &SupervisorState,
    policy: &ArbitrationPolicy,
    now: Instant,
) -> Option<RejectionReason> {
    let last = state.last_emission_at()?;
    let elapsed = now.saturating_duration_since(last);
    let interval = policy.global_min_interval();
    (elapsed < interval).then(|| RejectionReason::GlobalCooldown {
        remaining: interval - elapsed,
    })
}

pub fn source_rate_gate(
    counters: SourceCounters,
    policy: &ArbitrationPolicy,
    now: Instant,
) -> Option<RejectionReason> {
    if counters.responses_emitted_count >= policy.max_responses_per_agent {
        return Some(RejectionReason::ResponseCapReached {
            emitted: counters.responses_emitted_count,
            cap: policy.max_responses_per_agent,
        });
    }

    let last = counters.last_emitted_at?;
    let elapsed = now.saturating_duration_since(last);
    let interval = policy.min_interval();
    (elapsed < interval).then(|| RejectionReason::SourceCooldown {
        remaining: interval - elapsed,
    })
}

pub fn priority_gate(proposal: &Proposal, policy: &ArbitrationPolicy) -> Option<RejectionReason> {
    let score = proposal.priority_score();
    (score + SCORE_TOLERANCE < policy.priority_threshold).then_some(
        RejectionReason::BelowPriorityThreshold {
            score,
            threshold: policy.priority_threshold,
        },
    )
}

pub fn dedup_gate(
    profile: &ContentProfile,
    state: &SupervisorState,
    policy: &ArbitrationPolicy,
) -> Option<RejectionReason> {
    state
        .records()
        .iter()
        .map(|record| (record.source, profile.similarity(record.profile())))
        .filter(|(_, similarity)| *similarity >= policy.similarity_threshold)
        .max_by(|lhs, rhs| lhs.1.total_cmp(&rhs.1))
        .map(|(matched_source, similarity)| RejectionReason::Duplicate {
            similarity,
            matched_source,
        })
}
