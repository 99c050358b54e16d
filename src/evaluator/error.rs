use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorErrorKind {
    Backend,
    InvalidAssessment,
    DuplicatePerspective,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatorError {
    pub kind: EvaluatorErrorKind,
    pub message: String,
}

impl EvaluatorError {
    pub fn new(kind: EvaluatorErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for EvaluatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EvaluatorError {}

pub fn backend_failure(message: impl Into<String>) -> EvaluatorError {
    EvaluatorError::new(EvaluatorErrorKind::Backend, message)
}

pub fn invalid_assessment(message: impl Into<String>) -> EvaluatorError {
    EvaluatorError::new(EvaluatorErrorKind::InvalidAssessment, message)
}

pub fn duplicate_perspective(message: impl Into<String>) -> EvaluatorError {
    EvaluatorError::new(EvaluatorErrorKind::DuplicatePerspective, message)
}

pub fn internal_error(message: impl Into<String>) -> EvaluatorError {
    EvaluatorError::new(EvaluatorErrorKind::Internal, message)
}
