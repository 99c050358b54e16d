use std::{
    collections::{BTreeMap, HashMap},
    fs,
    io::ErrorKind,
    os::unix::fs::FileTypeExt,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
    sync::{mpsc, oneshot},
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    bridge::{
        error::{BridgeError, disconnected, not_connected, post_rejected, post_timed_out, send_failed},
        wire::{
            BridgeEgressMessage, InboundBridgeMessage, PostOutcome, PostResultMessage,
            encode_bridge_egress_message, parse_bridge_ingress_message,
        },
    },
    dispatch::{DispatchError, OutputSink},
    session::{SessionEvent, SessionIngress},
};

struct PendingPost {
    bridge_id: u64,
    response_tx: oneshot::Sender<PostOutcome>,
}

#[derive(Default)]
struct BridgeBrokerState {
    bridges: BTreeMap<u64, mpsc::UnboundedSender<BridgeEgressMessage>>,
    pending: HashMap<String, PendingPost>,
}

/// Tracks connected meeting-platform bridges and posts awaiting their confirmation.
///
/// Posts go to the most recently connected bridge.
pub struct BridgeBroker {
    state: Mutex<BridgeBrokerState>,
    next_bridge_id: AtomicU64,
    post_timeout: Duration,
}

impl BridgeBroker {
    pub fn new(post_timeout_ms: u64) -> Self {
        Self {
            state: Mutex::new(BridgeBrokerState::default()),
            next_bridge_id: AtomicU64::new(1),
            post_timeout: Duration::from_millis(post_timeout_ms.max(1)),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, BridgeBrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn allocate_bridge_id(&self) -> u64 {
        self.next_bridge_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn attach_bridge(&self, bridge_id: u64, tx: mpsc::UnboundedSender<BridgeEgressMessage>) {
        self.lock_state().bridges.insert(bridge_id, tx);
        tracing::info!(target: "bridge", bridge_id = bridge_id, "bridge_attached");
    }

    pub fn connected_bridges(&self) -> usize {
        self.lock_state().bridges.len()
    }

    pub fn pending_posts(&self) -> usize {
        self.lock_state().pending.len()
    }

    /// Drops the bridge and fails every post still waiting on it.
    pub fn detach_bridge(&self, bridge_id: u64) {
        let mut state = self.lock_state();
        state.bridges.remove(&bridge_id);

        let stale_ids: Vec<String> = state
            .pending
            .iter()
            .filter(|(_, pending)| pending.bridge_id == bridge_id)
            .map(|(request_id, _)| request_id.clone())
            .collect();

        for request_id in stale_ids {
            if let Some(pending) = state.pending.remove(&request_id) {
                let _ = pending.response_tx.send(PostOutcome::Rejected {
                    reason: "bridge_disconnected".to_string(),
                });
            }
        }
        tracing::info!(target: "bridge", bridge_id = bridge_id, "bridge_detached");
    }

    pub fn resolve_result(&self, bridge_id: u64, result: PostResultMessage) {
        let mut state = self.lock_state();
        let Some(pending) = state.pending.remove(&result.request_id) else {
            tracing::debug!(
                target: "bridge",
                request_id = %result.request_id,
                "unknown_post_result"
            );
            return;
        };

        if pending.bridge_id != bridge_id {
            state.pending.insert(result.request_id, pending);
            return;
        }

        let _ = pending.response_tx.send(result.outcome);
    }

    pub async fn post(&self, content: &str, pin: bool) -> Result<(), BridgeError> {
        let (request_id, bridge_tx, response_rx) = {
            let mut state = self.lock_state();
            let Some((bridge_id, bridge_tx)) = state
                .bridges
                .iter()
                .next_back()
                .map(|(id, tx)| (*id, tx.clone()))
            else {
                return Err(not_connected("no meeting bridge is connected"));
            };

            let request_id = Uuid::now_v7().to_string();
            let (response_tx, response_rx) = oneshot::channel();
            state.pending.insert(
                request_id.clone(),
                PendingPost {
                    bridge_id,
                    response_tx,
                },
            );

            (request_id, bridge_tx, response_rx)
        };

        if bridge_tx
            .send(BridgeEgressMessage::Post {
                request_id: request_id.clone(),
                content: content.to_string(),
                pin,
            })
            .is_err()
        {
            self.lock_state().pending.remove(&request_id);
            return Err(send_failed(format!(
                "failed to send post request {request_id}"
            )));
        }

        match timeout(self.post_timeout, response_rx).await {
            Ok(Ok(PostOutcome::Delivered)) => Ok(()),
            Ok(Ok(PostOutcome::Rejected { reason })) if reason == "bridge_disconnected" => Err(
                disconnected(format!("bridge disconnected before confirming {request_id}")),
            ),
            Ok(Ok(PostOutcome::Rejected { reason })) => Err(post_rejected(format!(
                "bridge rejected post {request_id}: {reason}"
            ))),
            Ok(Err(_)) => Err(disconnected(format!(
                "post confirmation channel closed for {request_id}"
            ))),
            Err(_) => {
                self.lock_state().pending.remove(&request_id);
                Err(post_timed_out(format!(
                    "bridge did not confirm post {request_id}"
                )))
            }
        }
    }
}

/// Output sink that posts through the connected meeting bridge.
pub struct BridgeOutputSink {
    broker: Arc<BridgeBroker>,
}

impl BridgeOutputSink {
    pub fn new(broker: Arc<BridgeBroker>) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl OutputSink for BridgeOutputSink {
    async fn post(&self, content: &str, pin: bool) -> Result<(), DispatchError> {
        self.broker.post(content, pin).await.map_err(DispatchError::from)
    }
}

pub struct BridgeAdapter {
    pub socket_path: PathBuf,
}

impl BridgeAdapter {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    pub async fn run(
        &self,
        ingress: SessionIngress,
        broker: Arc<BridgeBroker>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        Self::prepare_socket_path(&self.socket_path)?;
        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("unable to bind socket {}", self.socket_path.display()))?;
        tracing::info!(
            target: "bridge",
            socket_path = %self.socket_path.display(),
            "bridge_listening"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    break;
                }
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, _)) => {
                            let ingress = ingress.clone();
                            let broker_ref = Arc::clone(&broker);
                            tokio::spawn(async move {
                                if let Err(err) = handle_bridge(stream, ingress, broker_ref).await {
                                    let error = format!("{err:#}");
                                    tracing::warn!(target: "bridge", error = %error, "bridge_handling_failed");
                                }
                            });
                        }
                        Err(err) => {
                            tracing::warn!(target: "bridge", error = %err, "accept_failed");
                        }
                    }
                }
            }
        }

        Self::cleanup_socket_path(&self.socket_path)?;
        Ok(())
    }

    fn prepare_socket_path(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("unable to create {}", parent.display()))?;
        }

        match fs::symlink_metadata(path) {
            Ok(metadata) => {
                if metadata.file_type().is_socket() || metadata.is_file() {
                    fs::remove_file(path).with_context(|| {
                        format!("unable to remove stale socket {}", path.display())
                    })?;
                } else {
                    bail!(
                        "socket path exists but is not removable as file/socket: {}",
                        path.display()
                    );
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| format!("unable to inspect {}", path.display()));
            }
        }

        Ok(())
    }

    fn cleanup_socket_path(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("unable to remove {}", path.display())),
        }
    }
}

async fn handle_bridge(
    stream: UnixStream,
    ingress: SessionIngress,
    broker: Arc<BridgeBroker>,
) -> Result<()> {
    let bridge_id = broker.allocate_bridge_id();
    let (read_half, mut write_half) = stream.into_split();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<BridgeEgressMessage>();
    broker.attach_bridge(bridge_id, outbound_tx);

    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let encoded = encode_bridge_egress_message(&message)?;
            write_half.write_all(encoded.as_bytes()).await?;
            write_half.flush().await?;
        }

        Ok::<(), anyhow::Error>(())
    });

    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(target: "bridge", bridge_id = bridge_id, error = %err, "bridge_read_failed");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_bridge_ingress_message(line) {
            Ok(InboundBridgeMessage::PostResult(result)) => {
                broker.resolve_result(bridge_id, result);
            }
            Ok(InboundBridgeMessage::Session(SessionEvent::End)) => {
                if let Err(err) = ingress.end().await {
                    tracing::debug!(target: "bridge", error = %err, "session_end_not_forwarded");
                }
            }
            Ok(InboundBridgeMessage::Session(event)) => {
                if let Err(err) = ingress.send(event).await {
                    tracing::debug!(target: "bridge", error = %err, "session_event_not_forwarded");
                }
            }
            Err(err) => {
                tracing::warn!(target: "bridge", bridge_id = bridge_id, error = %err, "invalid_bridge_message")
            }
        }
    }

    broker.detach_bridge(bridge_id);

    match writer_task.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            let error = format!("{err:#}");
            tracing::warn!(target: "bridge", error = %error, "socket_writer_failed")
        }
        Err(err) => tracing::warn!(target: "bridge", error = %err, "socket_writer_join_failed"),
    }

    Ok(())
}
