use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{
    signal::unix::{SignalKind, signal},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    bridge::{BridgeAdapter, BridgeBroker, BridgeOutputSink},
    config::Config,
    dispatch::{OutputSink, SinkKind, TracingOutputSink},
    session::{MeetingSession, SessionIngress, SessionSummary, session_channel},
};

/// Runs one meeting session behind the unix-socket bridge until the bridge sends
/// `session_end` or the process receives SIGINT/SIGTERM.
pub async fn run(config: Config) -> Result<SessionSummary> {
    let broker = Arc::new(BridgeBroker::new(config.bridge.post_timeout_ms));
    let sink: Arc<dyn OutputSink> = match config.dispatch.sink {
        SinkKind::Bridge => Arc::new(BridgeOutputSink::new(Arc::clone(&broker))),
        SinkKind::Log => Arc::new(TracingOutputSink),
    };

    let (ingress, events) = session_channel();
    let shutdown = CancellationToken::new();
    let session = MeetingSession::from_config(&config, sink, events, shutdown.child_token())?;

    let adapter = BridgeAdapter::new(config.bridge.socket_path.clone());
    let bridge_shutdown = shutdown.clone();
    let bridge_ingress = ingress.clone();
    let bridge_broker = Arc::clone(&broker);
    let mut bridge_task = tokio::spawn(async move {
        adapter
            .run(bridge_ingress, bridge_broker, bridge_shutdown)
            .await
    });
    let mut session_task = tokio::spawn(session.run());

    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;

    let summary = tokio::select! {
        joined = &mut session_task => joined.context("session task join failed")?,
        bridged = &mut bridge_task => {
            let summary = stop_session(&ingress, &mut session_task, "bridge_stopped").await?;
            bridged.context("bridge task join failed")??;
            return Ok(summary);
        }
        _ = sigint.recv() => stop_session(&ingress, &mut session_task, "SIGINT").await?,
        _ = sigterm.recv() => stop_session(&ingress, &mut session_task, "SIGTERM").await?,
    };

    shutdown.cancel();
    bridge_task.await.context("bridge task join failed")??;

    Ok(summary)
}

async fn stop_session(
    ingress: &SessionIngress,
    session_task: &mut JoinHandle<SessionSummary>,
    reason: &'static str,
) -> Result<SessionSummary> {
    tracing::info!(target: "session", reason = reason, "shutdown_requested");
    if let Err(err) = ingress.end().await {
        tracing::warn!(target: "session", error = %err, "session_end_not_enqueued");
    }
    session_task.await.context("session task join failed")
}
