use async_trait::async_trait;

use crate::dispatch::error::DispatchError;

/// Where winning advice ends up. `Ok(())` must mean the post was confirmed; `pin` is a
/// hint the sink may ignore.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn post(&self, content: &str, pin: bool) -> Result<(), DispatchError>;
}
