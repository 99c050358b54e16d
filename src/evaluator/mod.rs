pub mod cues;
pub mod error;
pub mod pool;
pub mod ports;
pub mod registry;
pub mod types;

pub use cues::CueEvaluator;
pub use error::{EvaluatorError, EvaluatorErrorKind};
pub use pool::{EvaluatorPool, MemberOutcome, MemberReport, PoolReport};
pub use ports::Evaluator;
pub use registry::EvaluatorRegistry;
pub use types::{
    Assessment, EvaluationConfig, EvaluationLimits, Perspective, Proposal, priority_score,
};
