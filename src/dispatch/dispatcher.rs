use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, timeout};
use validator::Validate;

use crate::{
    dispatch::{
        error::{DispatchError, post_timeout, sink_failure},
        ports::OutputSink,
    },
    evaluator::{Perspective, Proposal},
    supervisor::SupervisorState,
};

fn default_pin_urgency_threshold() -> f64 {
    0.9
}

fn default_post_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Post through the connected meeting-platform bridge.
    #[default]
    Bridge,
    /// Write rendered messages to the log only.
    Log,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DispatchPolicy {
    #[serde(default = "default_pin_urgency_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub pin_urgency_threshold: f64,
    #[serde(default = "default_post_timeout_ms")]
    #[validate(range(min = 1))]
    pub post_timeout_ms: u64,
    #[serde(default)]
    pub sink: SinkKind,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            pin_urgency_threshold: default_pin_urgency_threshold(),
            post_timeout_ms: default_post_timeout_ms(),
            sink: SinkKind::default(),
        }
    }
}

impl DispatchPolicy {
    pub fn post_timeout(&self) -> Duration {
        Duration::from_millis(self.post_timeout_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReceipt {
    pub source: Perspective,
    pub message: String,
    pub pinned: bool,
    pub emitted_at: Instant,
}

/// Meeting chat rejects messages over 500 chars; keep a margin.
const MAX_MESSAGE_CHARS: usize = 480;
const ELLIPSIS: &str = "...";

/// Renders the chat message, cut to [`MAX_MESSAGE_CHARS`] chars with a trailing ellipsis.
pub fn render_message(proposal: &Proposal) -> String {
    let message = format!(
        "{} **{}**\n\n{}",
        proposal.source.badge(),
        proposal.source.display_name(),
        proposal.content.trim()
    );
    if message.chars().count() <= MAX_MESSAGE_CHARS {
        return message;
    }

    let mut truncated: String = message
        .chars()
        .take(MAX_MESSAGE_CHARS - ELLIPSIS.len())
        .collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Delivers a winning proposal and, only once the sink confirms, records the emission.
pub struct Dispatcher {
    sink: Arc<dyn OutputSink>,
    policy: DispatchPolicy,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn OutputSink>, policy: DispatchPolicy) -> Self {
        Self { sink, policy }
    }

    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    #[tracing::instrument(
        name = "dispatch_emit",
        target = "dispatch",
        skip(self, proposal, state),
        fields(source = %proposal.source, score = proposal.priority_score())
    )]
    pub async fn emit(
        &self,
        proposal: &Proposal,
        state: &mut SupervisorState,
    ) -> Result<DispatchReceipt, DispatchError> {
        let message = render_message(proposal);
        let pinned = proposal.urgency >= self.policy.pin_urgency_threshold;

        // The sink runs on its own task so a panicking sink fails this post only.
        let sink = Arc::clone(&self.sink);
        let content = message.clone();
        let mut post = tokio::spawn(async move { sink.post(&content, pinned).await });

        match timeout(self.policy.post_timeout(), &mut post).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(err))) => {
                tracing::warn!(
                    target: "dispatch",
                    source = %proposal.source,
                    error_kind = ?err.kind,
                    error = %err,
                    "post_failed"
                );
                return Err(err);
            }
            Ok(Err(join_err)) => {
                let err = sink_failure(format!("output sink task failed: {join_err}"));
                tracing::error!(
                    target: "dispatch",
                    source = %proposal.source,
                    error = %err,
                    "post_task_failed"
                );
                return Err(err);
            }
            Err(_) => {
                post.abort();
                let err = post_timeout(format!(
                    "sink did not confirm post within {}ms",
                    self.policy.post_timeout_ms
                ));
                tracing::warn!(
                    target: "dispatch",
                    source = %proposal.source,
                    error = %err,
                    "post_timed_out"
                );
                return Err(err);
            }
        }

        let emitted_at = Instant::now();
        state.record_emission(proposal.source, &proposal.content, emitted_at);
        let counters = state.counters(proposal.source);
        tracing::info!(
            target: "dispatch",
            source = %proposal.source,
            pinned = pinned,
            responses_emitted = counters.responses_emitted_count,
            "proposal_emitted"
        );

        Ok(DispatchReceipt {
            source: proposal.source,
            message,
            pinned,
            emitted_at,
        })
    }
}
