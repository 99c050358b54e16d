use std::{collections::BTreeSet, sync::Arc};

use crate::evaluator::{
    cues::CueEvaluator,
    error::{EvaluatorError, duplicate_perspective},
    ports::Evaluator,
    types::{EvaluationConfig, Perspective},
};

/// Static set of evaluators fixed at session start, at most one per perspective.
pub struct EvaluatorRegistry {
    members: Vec<Arc<dyn Evaluator>>,
}

impl EvaluatorRegistry {
    pub fn new(members: Vec<Arc<dyn Evaluator>>) -> Result<Self, EvaluatorError> {
        let mut seen = BTreeSet::new();
        for member in &members {
            let perspective = member.perspective();
            if !seen.insert(perspective) {
                return Err(duplicate_perspective(format!(
                    "perspective '{perspective}' is registered more than once"
                )));
            }
        }

        Ok(Self { members })
    }

    pub fn from_config(config: &EvaluationConfig) -> Result<Self, EvaluatorError> {
        let members = config
            .perspectives
            .iter()
            .map(|perspective| {
                Arc::new(CueEvaluator::new(
                    *perspective,
                    config.min_snapshot_len,
                    config.cue_window,
                )) as Arc<dyn Evaluator>
            })
            .collect();
        Self::new(members)
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

    pub(crate) fn into_members(self) -> Vec<Arc<dyn Evaluator>> {
        self.members
    }
}
