use async_trait::async_trait;

use crate::dispatch::{error::DispatchError, ports::OutputSink};

/// Sink that only logs what would have been posted. Always confirms.
#[derive(Debug, Clone, Default)]
pub struct TracingOutputSink;

#[async_trait]
impl OutputSink for TracingOutputSink {
    async fn post(&self, content: &str, pin: bool) -> Result<(), DispatchError> {
        tracing::info!(target: "dispatch", pin = pin, content = content, "message_posted");
        Ok(())
    }
}
