use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptErrorKind {
    MalformedEvent,
    OutOfOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptError {
    pub kind: TranscriptErrorKind,
    pub message: String,
}

impl TranscriptError {
    pub fn new(kind: TranscriptErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TranscriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TranscriptError {}

pub fn malformed_event(message: impl Into<String>) -> TranscriptError {
    TranscriptError::new(TranscriptErrorKind::MalformedEvent, message)
}

pub fn out_of_order(message: impl Into<String>) -> TranscriptError {
    TranscriptError::new(TranscriptErrorKind::OutOfOrder, message)
}
