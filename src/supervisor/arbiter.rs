use std::cmp::Ordering;

use tokio::time::Instant;

use crate::{
    evaluator::Proposal,
    supervisor::{
        gates::{dedup_gate, global_gate, priority_gate, source_rate_gate},
        similarity::ContentProfile,
        state::SupervisorState,
        types::{Arbitration, ArbitrationPolicy, Rejection, RejectionReason},
    },
};

/// Runs the gates in order and selects at most one winner.
///
/// Pure over its inputs: the same proposals, state, policy and instant always produce
/// the same arbitration.
pub fn arbitrate(
    proposals: Vec<Proposal>,
    state: &SupervisorState,
    policy: &ArbitrationPolicy,
    now: Instant,
) -> Arbitration {
    let mut rejections = Vec::with_capacity(proposals.len());

    if let Some(reason) = global_gate(state, policy, now) {
        rejections.extend(proposals.into_iter().map(|proposal| Rejection {
            proposal,
            reason: reason.clone(),
        }));
        return Arbitration {
            winner: None,
            rejections,
        };
    }

    let mut survivors = Vec::with_capacity(proposals.len());
    for proposal in proposals {
        let verdict = source_rate_gate(state.counters(proposal.source), policy, now)
            .or_else(|| priority_gate(&proposal, policy))
            .or_else(|| dedup_gate(&ContentProfile::of(&proposal.content), state, policy));
        match verdict {
            Some(reason) => {
                tracing::debug!(
                    target: "supervisor",
                    source = %proposal.source,
                    gate = reason.gate(),
                    "proposal_rejected"
                );
                rejections.push(Rejection { proposal, reason });
            }
            None => survivors.push(proposal),
        }
    }

    survivors.sort_by(compare_candidates);
    let mut survivors = survivors.into_iter();
    let winner = survivors.next();
    if let Some(winner) = &winner {
        rejections.extend(survivors.map(|proposal| Rejection {
            proposal,
            reason: RejectionReason::Outranked {
                winner: winner.source,
            },
        }));
    }

    Arbitration { winner, rejections }
}

/// Highest score first; ties go to the lower source rank, then to the earlier proposal.
fn compare_candidates(lhs: &Proposal, rhs: &Proposal) -> Ordering {
    rhs.priority_score()
        .total_cmp(&lhs.priority_score())
        .then_with(|| {
            lhs.source
                .tie_break_rank()
                .cmp(&rhs.source.tie_break_rank())
        })
        .then_with(|| lhs.created_at.cmp(&rhs.created_at))
}
