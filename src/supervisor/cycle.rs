use std::{sync::Arc, time::Duration};

use tokio::time::Instant;

use crate::{
    dispatch::{DispatchError, DispatchReceipt, Dispatcher},
    evaluator::{EvaluatorPool, Perspective, PoolReport},
    scheduler::CycleId,
    supervisor::{
        arbiter::arbitrate,
        gates::global_gate,
        state::{EmissionStatistics, SupervisorState},
        types::{Arbitration, ArbitrationPolicy, RejectionReason},
    },
    transcript::DiscourseSnapshot,
};

#[derive(Debug, Clone, PartialEq)]
pub enum CycleDisposition {
    /// The global gate was already closed; no evaluator was invoked.
    SkippedGlobalCooldown { remaining: Duration },
    NoProposals,
    NoWinner,
    Emitted(DispatchReceipt),
    DispatchFailed {
        source: Perspective,
        error: DispatchError,
    },
}

impl CycleDisposition {
    pub fn label(&self) -> &'static str {
        match self {
            CycleDisposition::SkippedGlobalCooldown { .. } => "skipped_global_cooldown",
            CycleDisposition::NoProposals => "no_proposals",
            CycleDisposition::NoWinner => "no_winner",
            CycleDisposition::Emitted(_) => "emitted",
            CycleDisposition::DispatchFailed { .. } => "dispatch_failed",
        }
    }

    pub fn emitted(&self) -> Option<&DispatchReceipt> {
        match self {
            CycleDisposition::Emitted(receipt) => Some(receipt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle_id: CycleId,
    pub snapshot_len: usize,
    pub pool: PoolReport,
    pub arbitration: Arbitration,
    pub disposition: CycleDisposition,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn evaluator_failures(&self) -> usize {
        self.pool.failure_count()
    }

    pub fn dispatch_failed(&self) -> bool {
        matches!(self.disposition, CycleDisposition::DispatchFailed { .. })
    }
}

/// Owns the pool, the emission state and the dispatcher for a session, and runs one
/// arbitration cycle at a time.
pub struct Supervisor {
    pool: EvaluatorPool,
    state: SupervisorState,
    policy: ArbitrationPolicy,
    dispatcher: Dispatcher,
}

impl Supervisor {
    pub fn new(pool: EvaluatorPool, policy: ArbitrationPolicy, dispatcher: Dispatcher) -> Self {
        let state = SupervisorState::new(pool.perspectives());
        Self::with_state(pool, policy, dispatcher, state)
    }

    pub fn with_state(
        pool: EvaluatorPool,
        policy: ArbitrationPolicy,
        dispatcher: Dispatcher,
        state: SupervisorState,
    ) -> Self {
        Self {
            pool,
            state,
            policy,
            dispatcher,
        }
    }

    pub fn state(&self) -> &SupervisorState {
        &self.state
    }

    pub fn policy(&self) -> &ArbitrationPolicy {
        &self.policy
    }

    pub fn statistics(&self) -> EmissionStatistics {
        self.state.statistics()
    }

    /// Time until the global gate reopens, when a cycle started now would skip evaluation.
    pub fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        if !self.policy.skip_evaluation_during_cooldown {
            return None;
        }
        match global_gate(&self.state, &self.policy, now) {
            Some(RejectionReason::GlobalCooldown { remaining }) => Some(remaining),
            _ => None,
        }
    }

    #[tracing::instrument(
        name = "supervisor_cycle",
        target = "supervisor",
        skip(self, snapshot),
        fields(cycle_id = cycle_id, snapshot_len = snapshot.len())
    )]
    pub async fn run_cycle(&mut self, cycle_id: CycleId, snapshot: DiscourseSnapshot) -> CycleReport {
        let started_at = Instant::now();
        let snapshot_len = snapshot.len();

        if let Some(remaining) = self.cooldown_remaining(started_at) {
            return self.finish(
                cycle_id,
                snapshot_len,
                PoolReport::default(),
                Arbitration::default(),
                CycleDisposition::SkippedGlobalCooldown { remaining },
                started_at,
            );
        }

        let pool = self.pool.evaluate_all(Arc::new(snapshot)).await;
        let proposals = pool.proposals();
        if proposals.is_empty() {
            return self.finish(
                cycle_id,
                snapshot_len,
                pool,
                Arbitration::default(),
                CycleDisposition::NoProposals,
                started_at,
            );
        }

        let arbitration = arbitrate(proposals, &self.state, &self.policy, Instant::now());
        let disposition = match &arbitration.winner {
            None => CycleDisposition::NoWinner,
            Some(winner) => match self.dispatcher.emit(winner, &mut self.state).await {
                Ok(receipt) => CycleDisposition::Emitted(receipt),
                Err(error) => CycleDisposition::DispatchFailed {
                    source: winner.source,
                    error,
                },
            },
        };

        self.finish(
            cycle_id,
            snapshot_len,
            pool,
            arbitration,
            disposition,
            started_at,
        )
    }

    fn finish(
        &self,
        cycle_id: CycleId,
        snapshot_len: usize,
        pool: PoolReport,
        arbitration: Arbitration,
        disposition: CycleDisposition,
        started_at: Instant,
    ) -> CycleReport {
        let report = CycleReport {
            cycle_id,
            snapshot_len,
            pool,
            arbitration,
            disposition,
            elapsed: started_at.elapsed(),
        };

        tracing::info!(
            target: "supervisor",
            cycle_id = cycle_id,
            disposition = report.disposition.label(),
            proposals = report.pool.proposals().len(),
            rejections = report.arbitration.rejections.len(),
            evaluator_failures = report.evaluator_failures(),
            batch_deadline_hit = report.pool.batch_deadline_hit,
            elapsed_ms = report.elapsed.as_millis() as u64,
            total_emissions = self.state.total_emissions(),
            "cycle_completed"
        );

        report
    }
}
