//! Deterministic evaluators and sinks for exercising the engine without a meeting.

use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    dispatch::{DispatchError, DispatchErrorKind, OutputSink},
    evaluator::{
        Assessment, Evaluator, EvaluatorError, Perspective, error::backend_failure,
    },
    transcript::DiscourseSnapshot,
};

#[derive(Debug, Clone)]
enum Script {
    Speak(Assessment),
    Abstain,
    Fail(EvaluatorError),
    Panic,
}

/// Evaluator that answers every cycle the same way, optionally after a delay.
#[derive(Debug)]
pub struct ScriptedEvaluator {
    perspective: Perspective,
    script: Script,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl ScriptedEvaluator {
    fn scripted(perspective: Perspective, script: Script) -> Self {
        Self {
            perspective,
            script,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn speaking(perspective: Perspective, assessment: Assessment) -> Self {
        Self::scripted(perspective, Script::Speak(assessment))
    }

    pub fn abstaining(perspective: Perspective) -> Self {
        Self::scripted(perspective, Script::Abstain)
    }

    pub fn failing(perspective: Perspective, message: &str) -> Self {
        Self::scripted(perspective, Script::Fail(backend_failure(message)))
    }

    pub fn panicking(perspective: Perspective) -> Self {
        Self::scripted(perspective, Script::Panic)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Shared counter of `evaluate` invocations, usable after the evaluator is moved.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn into_member(self) -> Arc<dyn Evaluator> {
        Arc::new(self)
    }
}

#[async_trait]
impl Evaluator for ScriptedEvaluator {
    fn perspective(&self) -> Perspective {
        self.perspective
    }

    async fn evaluate(
        &self,
        _snapshot: &DiscourseSnapshot,
    ) -> Result<Option<Assessment>, EvaluatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.script {
            Script::Speak(assessment) => Ok(Some(assessment.clone())),
            Script::Abstain => Ok(None),
            Script::Fail(err) => Err(err.clone()),
            Script::Panic => panic!("scripted evaluator panic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPost {
    pub content: String,
    pub pin: bool,
}

/// Sink that records every confirmed post and can be switched to fail, panic or stall.
#[derive(Debug, Default)]
pub struct RecordingSink {
    posts: Mutex<Vec<RecordedPost>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
    panicking: AtomicBool,
    delay: Mutex<Duration>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_panicking(&self, panicking: bool) {
        self.panicking.store(panicking, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    pub fn posts(&self) -> Vec<RecordedPost> {
        self.posts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OutputSink for RecordingSink {
    async fn post(&self, content: &str, pin: bool) -> Result<(), DispatchError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap_or_else(PoisonError::into_inner);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.panicking.load(Ordering::SeqCst) {
            panic!("recording sink is switched to panic");
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(DispatchError::new(
                DispatchErrorKind::Unavailable,
                "recording sink is switched to fail",
            ));
        }

        self.posts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedPost {
                content: content.to_string(),
                pin,
            });
        Ok(())
    }
}
