use std::fmt;

use crate::dispatch::{DispatchError, DispatchErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeErrorKind {
    NotConnected,
    SendFailed,
    Timeout,
    Rejected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeError {
    pub kind: BridgeErrorKind,
    pub message: String,
}

impl BridgeError {
    pub fn new(kind: BridgeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BridgeError {}

impl From<BridgeError> for DispatchError {
    fn from(err: BridgeError) -> Self {
        let kind = match err.kind {
            BridgeErrorKind::NotConnected | BridgeErrorKind::Disconnected => {
                DispatchErrorKind::Unavailable
            }
            BridgeErrorKind::SendFailed => DispatchErrorKind::Internal,
            BridgeErrorKind::Timeout => DispatchErrorKind::Timeout,
            BridgeErrorKind::Rejected => DispatchErrorKind::Rejected,
        };
        DispatchError::new(kind, err.message)
    }
}

pub fn not_connected(message: impl Into<String>) -> BridgeError {
    BridgeError::new(BridgeErrorKind::NotConnected, message)
}

pub fn send_failed(message: impl Into<String>) -> BridgeError {
    BridgeError::new(BridgeErrorKind::SendFailed, message)
}

pub fn post_timed_out(message: impl Into<String>) -> BridgeError {
    BridgeError::new(BridgeErrorKind::Timeout, message)
}

pub fn post_rejected(message: impl Into<String>) -> BridgeError {
    BridgeError::new(BridgeErrorKind::Rejected, message)
}

pub fn disconnected(message: impl Into<String>) -> BridgeError {
    BridgeError::new(BridgeErrorKind::Disconnected, message)
}
