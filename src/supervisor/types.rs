use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::evaluator::{Perspective, Proposal};

fn default_priority_threshold() -> f64 {
    0.6
}

fn default_max_responses_per_agent() -> u32 {
    5
}

fn default_min_interval_seconds() -> u64 {
    30
}

fn default_global_min_interval_seconds() -> u64 {
    5
}

fn default_similarity_threshold() -> f64 {
    0.7
}

fn default_skip_evaluation_during_cooldown() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ArbitrationPolicy {
    #[serde(default = "default_priority_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub priority_threshold: f64,
    #[serde(default = "default_max_responses_per_agent")]
    pub max_responses_per_agent: u32,
    /// Minimum spacing between two emissions of the same source.
    #[serde(default = "default_min_interval_seconds")]
    pub min_interval_seconds: u64,
    /// Minimum spacing between any two emissions.
    #[serde(default = "default_global_min_interval_seconds")]
    pub global_min_interval_seconds: u64,
    #[serde(default = "default_similarity_threshold")]
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub similarity_threshold: f64,
    #[serde(default = "default_skip_evaluation_during_cooldown")]
    pub skip_evaluation_during_cooldown: bool,
}

impl Default for ArbitrationPolicy {
    fn default() -> Self {
        Self {
            priority_threshold: default_priority_threshold(),
            max_responses_per_agent: default_max_responses_per_agent(),
            min_interval_seconds: default_min_interval_seconds(),
            global_min_interval_seconds: default_global_min_interval_seconds(),
            similarity_threshold: default_similarity_threshold(),
            skip_evaluation_during_cooldown: default_skip_evaluation_during_cooldown(),
        }
    }
}

impl ArbitrationPolicy {
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_seconds)
    }

    pub fn global_min_interval(&self) -> Duration {
        Duration::from_secs(self.global_min_interval_seconds)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    GlobalCooldown {
        remaining: Duration,
    },
    ResponseCapReached {
        emitted: u32,
        cap: u32,
    },
    SourceCooldown {
        remaining: Duration,
    },
    BelowPriorityThreshold {
        score: f64,
        threshold: f64,
    },
    Duplicate {
        similarity: f64,
        matched_source: Perspective,
    },
    /// Passed every gate but lost selection. Not carried over to later cycles.
    Outranked {
        winner: Perspective,
    },
}

impl RejectionReason {
    pub fn gate(&self) -> &'static str {
        match self {
            RejectionReason::GlobalCooldown { .. } => "global",
            RejectionReason::ResponseCapReached { .. } | RejectionReason::SourceCooldown { .. } => {
                "source_rate"
            }
            RejectionReason::BelowPriorityThreshold { .. } => "priority",
            RejectionReason::Duplicate { .. } => "dedup",
            RejectionReason::Outranked { .. } => "selection",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub proposal: Proposal,
    pub reason: RejectionReason,
}

/// Result of running the gates and selection over one cycle's proposals.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arbitration {
    pub winner: Option<Proposal>,
    pub rejections: Vec<Rejection>,
}

impl Arbitration {
    pub fn rejected_at(&self, gate: &str) -> impl Iterator<Item = &Rejection> {
        self.rejections
            .iter()
            .filter(move |rejection| rejection.reason.gate() == gate)
    }

    pub fn rejection_of(&self, source: Perspective) -> Option<&RejectionReason> {
        self.rejections
            .iter()
            .find(|rejection| rejection.proposal.source == source)
            .map(|rejection| &rejection.reason)
    }
}
