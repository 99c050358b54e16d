use async_trait::async_trait;

use crate::{
    evaluator::{
        error::EvaluatorError,
        types::{Assessment, Perspective},
    },
    transcript::DiscourseSnapshot,
};

/// One opinionated seat in the pool. `Ok(None)` means the evaluator has nothing worth
/// saying this cycle.
#[async_trait]
pub trait Evaluator: Send + Sync {
    fn perspective(&self) -> Perspective;

    async fn evaluate(
        &self,
        snapshot: &DiscourseSnapshot,
    ) -> Result<Option<Assessment>, EvaluatorError>;
}
