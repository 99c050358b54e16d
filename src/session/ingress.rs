use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::sync::{Mutex, mpsc};

use crate::session::types::SessionEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngressErrorKind {
    Closed,
    QueueClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressError {
    pub kind: IngressErrorKind,
    pub message: String,
}

impl IngressError {
    fn closed() -> Self {
        Self {
            kind: IngressErrorKind::Closed,
            message: "session ingress gate is closed".to_string(),
        }
    }

    fn queue_closed() -> Self {
        Self {
            kind: IngressErrorKind::QueueClosed,
            message: "session event receiver is closed".to_string(),
        }
    }
}

impl fmt::Display for IngressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IngressError {}

/// Cloneable producer handle for a meeting session. Sends never wait on the session;
/// once the gate closes only the final `End` can still go through.
#[derive(Clone)]
pub struct SessionIngress {
    gate_open: Arc<AtomicBool>,
    send_lock: Arc<Mutex<()>>,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionIngress {
    pub fn new(tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            gate_open: Arc::new(AtomicBool::new(true)),
            send_lock: Arc::new(Mutex::new(())),
            tx,
        }
    }

    pub fn is_open(&self) -> bool {
        self.gate_open.load(Ordering::Acquire)
    }

    pub async fn send(&self, event: SessionEvent) -> Result<(), IngressError> {
        let _guard = self.send_lock.lock().await;
        if !self.gate_open.load(Ordering::Acquire) {
            return Err(IngressError::closed());
        }
        self.tx.send(event).map_err(|_| IngressError::queue_closed())
    }

    pub async fn close_gate(&self) {
        let _guard = self.send_lock.lock().await;
        self.gate_open.store(false, Ordering::Release);
    }

    /// Closes the gate and queues `End` behind everything already accepted.
    pub async fn end(&self) -> Result<(), IngressError> {
        let _guard = self.send_lock.lock().await;
        self.gate_open.store(false, Ordering::Release);
        self.tx
            .send(SessionEvent::End)
            .map_err(|_| IngressError::queue_closed())
    }
}

pub fn session_channel() -> (SessionIngress, mpsc::UnboundedReceiver<SessionEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SessionIngress::new(tx), rx)
}
