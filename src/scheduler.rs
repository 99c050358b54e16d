use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use validator::Validate;

pub type CycleId = u64;

fn default_min_transcript_count() -> usize {
    5
}

fn default_analysis_interval() -> usize {
    10
}

fn default_min_time_interval_seconds() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TriggerPolicy {
    #[serde(default = "default_min_transcript_count")]
    #[validate(range(min = 1))]
    pub min_transcript_count: usize,
    #[serde(default = "default_analysis_interval")]
    #[validate(range(min = 1))]
    pub analysis_interval: usize,
    #[serde(default = "default_min_time_interval_seconds")]
    pub min_time_interval_seconds: u64,
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        Self {
            min_transcript_count: default_min_transcript_count(),
            analysis_interval: default_analysis_interval(),
            min_time_interval_seconds: default_min_time_interval_seconds(),
        }
    }
}

impl TriggerPolicy {
    pub fn min_time_interval(&self) -> Duration {
        Duration::from_secs(self.min_time_interval_seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    CycleRunning {
        cycle_id: CycleId,
        started_at: Instant,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    BelowMinimumCorpus { total_finals: usize, required: usize },
    AwaitingNewFinals { new_finals: usize, required: usize },
    CoolingDown { remaining: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    Fire { cycle_id: CycleId },
    Hold(HoldReason),
    /// A cycle is already running; the check is folded into it.
    Coalesced { running: CycleId },
}

#[derive(Debug, Clone, Copy)]
struct CycleMark {
    started_at: Instant,
    finals_at_start: usize,
}

/// Decides when an analysis cycle fires and guarantees cycles never overlap.
///
/// `Idle -> CycleRunning` happens only inside [`AnalysisScheduler::evaluate`], and the way
/// back only through [`AnalysisScheduler::complete_cycle`] with the matching id.
#[derive(Debug)]
pub struct AnalysisScheduler {
    policy: TriggerPolicy,
    state: SchedulerState,
    next_cycle_id: CycleId,
    last_cycle: Option<CycleMark>,
    coalesced_checks: u64,
}

impl AnalysisScheduler {
    pub fn new(policy: TriggerPolicy) -> Self {
        Self {
            policy,
            state: SchedulerState::Idle,
            next_cycle_id: 1,
            last_cycle: None,
            coalesced_checks: 0,
        }
    }

    pub fn policy(&self) -> &TriggerPolicy {
        &self.policy
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, SchedulerState::Idle)
    }

    pub fn cycles_started(&self) -> u64 {
        self.next_cycle_id - 1
    }

    pub fn coalesced_checks(&self) -> u64 {
        self.coalesced_checks
    }

    pub fn evaluate(&mut self, total_finals: usize, now: Instant) -> TriggerDecision {
        if let SchedulerState::CycleRunning { cycle_id, .. } = self.state {
            self.coalesced_checks = self.coalesced_checks.saturating_add(1);
            return TriggerDecision::Coalesced { running: cycle_id };
        }

        if let Some(reason) = self.hold_reason(total_finals, now) {
            return TriggerDecision::Hold(reason);
        }

        let cycle_id = self.next_cycle_id;
        self.next_cycle_id = self.next_cycle_id.saturating_add(1);
        self.last_cycle = Some(CycleMark {
            started_at: now,
            finals_at_start: total_finals,
        });
        self.state = SchedulerState::CycleRunning {
            cycle_id,
            started_at: now,
        };
        tracing::debug!(
            target: "scheduler",
            cycle_id = cycle_id,
            total_finals = total_finals,
            "cycle_triggered"
        );

        TriggerDecision::Fire { cycle_id }
    }

    /// Returns the scheduler to `Idle`. A stale or unknown id leaves the state untouched.
    pub fn complete_cycle(&mut self, cycle_id: CycleId) -> bool {
        match self.state {
            SchedulerState::CycleRunning { cycle_id: running, .. } if running == cycle_id => {
                self.state = SchedulerState::Idle;
                true
            }
            _ => {
                tracing::warn!(
                    target: "scheduler",
                    cycle_id = cycle_id,
                    state = ?self.state,
                    "cycle_completion_ignored"
                );
                false
            }
        }
    }

    fn hold_reason(&self, total_finals: usize, now: Instant) -> Option<HoldReason> {
        if total_finals < self.policy.min_transcript_count {
            return Some(HoldReason::BelowMinimumCorpus {
                total_finals,
                required: self.policy.min_transcript_count,
            });
        }

        let last = self.last_cycle?;

        let new_finals = total_finals.saturating_sub(last.finals_at_start);
        if new_finals < self.policy.analysis_interval {
            return Some(HoldReason::AwaitingNewFinals {
                new_finals,
                required: self.policy.analysis_interval,
            });
        }

        let elapsed = now.saturating_duration_since(last.started_at);
        let min_interval = self.policy.min_time_interval();
        if elapsed < min_interval {
            return Some(HoldReason::CoolingDown {
                remaining: min_interval - elapsed,
            });
        }

        None
    }
}
