use std::{collections::BTreeMap, sync::Arc, time::Duration};

use futures_util::{StreamExt, stream::FuturesUnordered};
use tokio::{
    task::AbortHandle,
    time::{Instant, timeout, timeout_at},
};

use crate::{
    evaluator::{
        error::{EvaluatorError, internal_error, invalid_assessment},
        ports::Evaluator,
        registry::EvaluatorRegistry,
        types::{EvaluationLimits, Perspective, Proposal},
    },
    transcript::DiscourseSnapshot,
};

#[derive(Debug, Clone, PartialEq)]
pub enum MemberOutcome {
    Proposed(Proposal),
    Abstained,
    Failed(EvaluatorError),
    /// The member overran its own deadline.
    TimedOut,
    /// The batch deadline expired first; the member task was aborted.
    Cancelled,
}

impl MemberOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            MemberOutcome::Proposed(_) => "proposed",
            MemberOutcome::Abstained => "abstained",
            MemberOutcome::Failed(_) => "failed",
            MemberOutcome::TimedOut => "timed_out",
            MemberOutcome::Cancelled => "cancelled",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            MemberOutcome::Failed(_) | MemberOutcome::TimedOut | MemberOutcome::Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberReport {
    pub perspective: Perspective,
    pub outcome: MemberOutcome,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PoolReport {
    pub members: Vec<MemberReport>,
    pub elapsed: Duration,
    pub batch_deadline_hit: bool,
}

impl PoolReport {
    pub fn proposals(&self) -> Vec<Proposal> {
        self.members
            .iter()
            .filter_map(|report| match &report.outcome {
                MemberOutcome::Proposed(proposal) => Some(proposal.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn outcome_of(&self, perspective: Perspective) -> Option<&MemberOutcome> {
        self.members
            .iter()
            .find(|report| report.perspective == perspective)
            .map(|report| &report.outcome)
    }

    pub fn failure_count(&self) -> usize {
        self.members
            .iter()
            .filter(|report| report.outcome.is_failure())
            .count()
    }

    pub fn abstention_count(&self) -> usize {
        self.members
            .iter()
            .filter(|report| matches!(report.outcome, MemberOutcome::Abstained))
            .count()
    }
}

/// Fans one snapshot out to every registered evaluator and joins on all of them.
///
/// Each member runs on its own task under `member_timeout`; the join as a whole is bounded
/// by `cycle_deadline`, after which stragglers are aborted and reported as cancelled.
pub struct EvaluatorPool {
    members: Vec<Arc<dyn Evaluator>>,
    limits: EvaluationLimits,
}

impl EvaluatorPool {
    pub fn new(registry: EvaluatorRegistry, limits: EvaluationLimits) -> Self {
        Self {
            members: registry.into_members(),
            limits,
        }
    }

    pub fn limits(&self) -> EvaluationLimits {
        self.limits
    }

    pub fn perspectives(&self) -> Vec<Perspective> {
        self.members.iter().map(|member| member.perspective()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[tracing::instrument(
        name = "evaluator_pool_fan_out",
        target = "evaluator",
        skip(self, snapshot),
        fields(members = self.members.len(), snapshot_len = snapshot.len())
    )]
    pub async fn evaluate_all(&self, snapshot: Arc<DiscourseSnapshot>) -> PoolReport {
        let started_at = Instant::now();
        let batch_deadline = started_at + self.limits.cycle_deadline;
        let member_timeout = self.limits.member_timeout;

        let mut in_flight = FuturesUnordered::new();
        let mut pending: BTreeMap<Perspective, AbortHandle> = BTreeMap::new();

        for member in &self.members {
            let perspective = member.perspective();
            let member = Arc::clone(member);
            let snapshot = Arc::clone(&snapshot);

            let handle = tokio::spawn(async move {
                let outcome = match timeout(member_timeout, member.evaluate(&snapshot)).await {
                    Ok(Ok(Some(assessment))) if assessment.content.trim().is_empty() => {
                        MemberOutcome::Failed(invalid_assessment(format!(
                            "{perspective} returned an assessment without content"
                        )))
                    }
                    Ok(Ok(Some(assessment))) => MemberOutcome::Proposed(
                        Proposal::from_assessment(perspective, assessment, Instant::now()),
                    ),
                    Ok(Ok(None)) => MemberOutcome::Abstained,
                    Ok(Err(err)) => MemberOutcome::Failed(err),
                    Err(_) => MemberOutcome::TimedOut,
                };
                (outcome, started_at.elapsed())
            });

            pending.insert(perspective, handle.abort_handle());
            in_flight.push(async move { (perspective, handle.await) });
        }

        let mut members = Vec::with_capacity(self.members.len());
        let mut batch_deadline_hit = false;

        loop {
            match timeout_at(batch_deadline, in_flight.next()).await {
                Ok(Some((perspective, joined))) => {
                    pending.remove(&perspective);
                    let (outcome, elapsed) = match joined {
                        Ok(result) => result,
                        Err(err) => (
                            MemberOutcome::Failed(internal_error(format!(
                                "{perspective} evaluator task failed: {err}"
                            ))),
                            started_at.elapsed(),
                        ),
                    };
                    members.push(MemberReport {
                        perspective,
                        outcome,
                        elapsed,
                    });
                }
                Ok(None) => break,
                Err(_) => {
                    batch_deadline_hit = true;
                    let elapsed = started_at.elapsed();
                    for (perspective, abort) in std::mem::take(&mut pending) {
                        abort.abort();
                        members.push(MemberReport {
                            perspective,
                            outcome: MemberOutcome::Cancelled,
                            elapsed,
                        });
                    }
                    break;
                }
            }
        }

        members.sort_by_key(|report| report.perspective);
        for report in &members {
            match &report.outcome {
                MemberOutcome::Failed(err) => tracing::warn!(
                    target: "evaluator",
                    perspective = %report.perspective,
                    error_kind = ?err.kind,
                    error = %err,
                    "evaluator_failed"
                ),
                MemberOutcome::TimedOut | MemberOutcome::Cancelled => tracing::warn!(
                    target: "evaluator",
                    perspective = %report.perspective,
                    outcome = report.outcome.label(),
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "evaluator_overran"
                ),
                _ => {}
            }
        }

        PoolReport {
            members,
            elapsed: started_at.elapsed(),
            batch_deadline_hit,
        }
    }
}
