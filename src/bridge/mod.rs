pub mod error;
pub mod unix_socket;
pub mod wire;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use error::{BridgeError, BridgeErrorKind};
pub use unix_socket::{BridgeAdapter, BridgeBroker, BridgeOutputSink};

fn default_socket_path() -> PathBuf {
    PathBuf::from("huddle.sock")
}

fn default_post_timeout_ms() -> u64 {
    8_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BridgeConfig {
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    #[serde(default = "default_post_timeout_ms")]
    #[validate(range(min = 1))]
    pub post_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            post_timeout_ms: default_post_timeout_ms(),
        }
    }
}
