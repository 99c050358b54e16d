use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use validator::Validate;

pub const CONFIDENCE_WEIGHT: f64 = 0.4;
pub const URGENCY_WEIGHT: f64 = 0.3;
pub const RELEVANCE_WEIGHT: f64 = 0.3;

/// The closed set of evaluator sources. Each variant is one seat at the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perspective {
    ProjectManagement,
    Market,
    Legal,
    Sales,
    Synthesis,
}

impl Perspective {
    pub const ALL: [Perspective; 5] = [
        Perspective::ProjectManagement,
        Perspective::Market,
        Perspective::Legal,
        Perspective::Sales,
        Perspective::Synthesis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Perspective::ProjectManagement => "project_management",
            Perspective::Market => "market",
            Perspective::Legal => "legal",
            Perspective::Sales => "sales",
            Perspective::Synthesis => "synthesis",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Perspective::ProjectManagement => "PM Agent",
            Perspective::Market => "Marketer Agent",
            Perspective::Legal => "Legal Agent",
            Perspective::Sales => "Sales Agent",
            Perspective::Synthesis => "Consultant Agent",
        }
    }

    pub fn badge(self) -> &'static str {
        match self {
            Perspective::ProjectManagement => "📊",
            Perspective::Market => "📈",
            Perspective::Legal => "⚖️",
            Perspective::Sales => "💼",
            Perspective::Synthesis => "💡",
        }
    }

    /// Lower rank wins a priority-score tie.
    pub fn tie_break_rank(self) -> u8 {
        match self {
            Perspective::Legal => 0,
            Perspective::ProjectManagement => 1,
            Perspective::Sales => 2,
            Perspective::Market => 3,
            Perspective::Synthesis => 4,
        }
    }
}

impl fmt::Display for Perspective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an evaluator hands back when it wants to speak. The pool stamps source and
/// creation time to turn it into a [`Proposal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub content: String,
    pub confidence: f64,
    pub urgency: f64,
    pub relevance: f64,
    #[serde(default)]
    pub rationale: String,
}

impl Assessment {
    pub fn new(content: impl Into<String>, confidence: f64, urgency: f64, relevance: f64) -> Self {
        Self {
            content: content.into(),
            confidence,
            urgency,
            relevance,
            rationale: String::new(),
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub source: Perspective,
    pub content: String,
    pub confidence: f64,
    pub urgency: f64,
    pub relevance: f64,
    pub rationale: String,
    pub created_at: Instant,
}

impl Proposal {
    pub fn from_assessment(source: Perspective, assessment: Assessment, created_at: Instant) -> Self {
        Self {
            source,
            content: assessment.content,
            confidence: clamp_signal(assessment.confidence),
            urgency: clamp_signal(assessment.urgency),
            relevance: clamp_signal(assessment.relevance),
            rationale: assessment.rationale,
            created_at,
        }
    }

    pub fn priority_score(&self) -> f64 {
        priority_score(self.confidence, self.urgency, self.relevance)
    }
}

pub fn priority_score(confidence: f64, urgency: f64, relevance: f64) -> f64 {
    CONFIDENCE_WEIGHT * confidence + URGENCY_WEIGHT * urgency + RELEVANCE_WEIGHT * relevance
}

pub fn clamp_signal(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

fn default_perspectives() -> Vec<Perspective> {
    Perspective::ALL.to_vec()
}

fn default_member_timeout_ms() -> u64 {
    20_000
}

fn default_cycle_deadline_ms() -> u64 {
    30_000
}

fn default_min_snapshot_len() -> usize {
    3
}

fn default_cue_window() -> usize {
    10
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EvaluationConfig {
    #[serde(default = "default_perspectives")]
    #[validate(length(min = 1))]
    pub perspectives: Vec<Perspective>,
    #[serde(default = "default_member_timeout_ms")]
    #[validate(range(min = 1))]
    pub member_timeout_ms: u64,
    #[serde(default = "default_cycle_deadline_ms")]
    #[validate(range(min = 1))]
    pub cycle_deadline_ms: u64,
    #[serde(default = "default_min_snapshot_len")]
    pub min_snapshot_len: usize,
    #[serde(default = "default_cue_window")]
    #[validate(range(min = 1))]
    pub cue_window: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            perspectives: default_perspectives(),
            member_timeout_ms: default_member_timeout_ms(),
            cycle_deadline_ms: default_cycle_deadline_ms(),
            min_snapshot_len: default_min_snapshot_len(),
            cue_window: default_cue_window(),
        }
    }
}

impl EvaluationConfig {
    pub fn limits(&self) -> EvaluationLimits {
        EvaluationLimits {
            member_timeout: Duration::from_millis(self.member_timeout_ms.max(1)),
            cycle_deadline: Duration::from_millis(self.cycle_deadline_ms.max(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationLimits {
    pub member_timeout: Duration,
    pub cycle_deadline: Duration,
}

impl Default for EvaluationLimits {
    fn default() -> Self {
        EvaluationConfig::default().limits()
    }
}
