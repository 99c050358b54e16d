use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{
    sync::mpsc,
    task::{JoinError, JoinHandle},
    time::Instant,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    dispatch::{Dispatcher, OutputSink},
    evaluator::{EvaluatorPool, EvaluatorRegistry},
    scheduler::{AnalysisScheduler, CycleId, SchedulerState, TriggerDecision},
    session::types::{CycleRecord, SessionEvent, SessionSummary},
    supervisor::{CycleReport, Supervisor, SupervisorState},
    transcript::{AppendOutcome, TranscriptBuffer},
};

type CycleTask = JoinHandle<(Supervisor, CycleReport)>;

#[derive(Debug, Default)]
struct SessionTally {
    evaluator_failures: usize,
    dispatch_failures: usize,
    dropped_events: usize,
    cycles: Vec<CycleRecord>,
}

/// Coordinates one meeting: feeds the buffer, asks the scheduler, and hands the supervisor
/// to a cycle task whenever a cycle fires.
///
/// The supervisor lives either here or inside the single running cycle task, never both,
/// so cycles cannot overlap and emission state has one owner at a time.
pub struct MeetingSession {
    buffer: Arc<TranscriptBuffer>,
    scheduler: AnalysisScheduler,
    supervisor: Option<Supervisor>,
    in_flight: Option<CycleTask>,
    /// Trigger check postponed until the global emission cooldown ends.
    deferred_check: Option<Instant>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    cancel: CancellationToken,
    tally: SessionTally,
}

impl MeetingSession {
    pub fn new(
        scheduler: AnalysisScheduler,
        supervisor: Supervisor,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            buffer: Arc::new(TranscriptBuffer::new()),
            scheduler,
            supervisor: Some(supervisor),
            in_flight: None,
            deferred_check: None,
            events,
            cancel,
            tally: SessionTally::default(),
        }
    }

    pub fn from_config(
        config: &Config,
        sink: Arc<dyn OutputSink>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let registry = EvaluatorRegistry::from_config(&config.evaluation)
            .context("failed to build evaluator registry")?;
        let pool = EvaluatorPool::new(registry, config.evaluation.limits());
        let dispatcher = Dispatcher::new(sink, config.dispatch.clone());
        let supervisor = Supervisor::new(pool, config.arbitration.clone(), dispatcher);

        Ok(Self::new(
            AnalysisScheduler::new(config.scheduler.clone()),
            supervisor,
            events,
            cancel,
        ))
    }

    /// Shared read handle for display consumers (latest partials, roster).
    pub fn buffer(&self) -> Arc<TranscriptBuffer> {
        Arc::clone(&self.buffer)
    }

    pub async fn run(mut self) -> SessionSummary {
        tracing::info!(target: "session", "session_started");
        let mut ending = false;

        loop {
            if ending && self.in_flight.is_none() {
                break;
            }

            tokio::select! {
                joined = join_cycle(&mut self.in_flight), if self.in_flight.is_some() => {
                    self.in_flight = None;
                    self.on_cycle_joined(joined);
                    if !ending {
                        self.check_trigger();
                    }
                }
                _ = wait_until(self.deferred_check), if !ending && self.deferred_check.is_some() => {
                    self.deferred_check = None;
                    self.check_trigger();
                }
                _ = self.cancel.cancelled(), if !ending => {
                    tracing::info!(target: "session", "session_cancelled");
                    ending = true;
                }
                event = self.events.recv(), if !ending => {
                    match event {
                        Some(SessionEvent::End) | None => ending = true,
                        Some(event) => self.on_event(event),
                    }
                }
            }
        }

        let summary = self.summary();
        tracing::info!(
            target: "session",
            transcript_count = summary.transcript_count,
            analysis_count = summary.analysis_count,
            message_count = summary.message_count,
            dropped_events = summary.dropped_events,
            "session_ended"
        );
        summary
    }

    fn on_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Utterance(utterance) => match self.buffer.append(utterance) {
                Ok(AppendOutcome::Final { .. }) => self.check_trigger(),
                Ok(_) => {}
                Err(err) => {
                    self.tally.dropped_events += 1;
                    tracing::warn!(
                        target: "session",
                        error_kind = ?err.kind,
                        error = %err,
                        "utterance_dropped"
                    );
                }
            },
            SessionEvent::ParticipantJoined(participant) => {
                self.buffer.participant_joined(participant)
            }
            SessionEvent::ParticipantLeft { participant_id } => {
                if self.buffer.participant_left(&participant_id).is_none() {
                    tracing::debug!(
                        target: "session",
                        participant_id = %participant_id,
                        "unknown_participant_left"
                    );
                }
            }
            SessionEvent::End => {}
        }
    }

    fn check_trigger(&mut self) {
        let now = Instant::now();
        // Firing into the global cooldown would spend the scheduler mark on a skipped cycle.
        let cooldown = self
            .supervisor
            .as_ref()
            .and_then(|supervisor| supervisor.cooldown_remaining(now));
        if let Some(remaining) = cooldown {
            self.deferred_check = Some(now + remaining);
            tracing::trace!(
                target: "session",
                remaining_ms = remaining.as_millis() as u64,
                "trigger_deferred"
            );
            return;
        }

        let total_finals = self.buffer.final_count();
        match self.scheduler.evaluate(total_finals, now) {
            TriggerDecision::Fire { cycle_id } => self.start_cycle(cycle_id),
            TriggerDecision::Hold(reason) => {
                tracing::trace!(target: "session", reason = ?reason, "trigger_held")
            }
            TriggerDecision::Coalesced { running } => {
                tracing::trace!(target: "session", running = running, "trigger_coalesced")
            }
        }
    }

    fn start_cycle(&mut self, cycle_id: CycleId) {
        let Some(mut supervisor) = self.supervisor.take() else {
            tracing::error!(target: "session", cycle_id = cycle_id, "supervisor_unavailable");
            self.scheduler.complete_cycle(cycle_id);
            return;
        };

        let snapshot = self.buffer.snapshot(Instant::now());
        self.in_flight = Some(tokio::spawn(async move {
            let report = supervisor.run_cycle(cycle_id, snapshot).await;
            (supervisor, report)
        }));
    }

    fn on_cycle_joined(&mut self, joined: Result<(Supervisor, CycleReport), JoinError>) {
        let (supervisor, report) = match joined {
            Ok(result) => result,
            Err(err) => {
                // The supervisor went down with the task; further cycles cannot run.
                tracing::error!(target: "session", error = %err, "cycle_task_failed");
                if let SchedulerState::CycleRunning { cycle_id, .. } =
                    self.scheduler.state()
                {
                    self.scheduler.complete_cycle(cycle_id);
                }
                return;
            }
        };

        self.scheduler.complete_cycle(report.cycle_id);
        self.tally.evaluator_failures += report.evaluator_failures();
        if report.dispatch_failed() {
            self.tally.dispatch_failures += 1;
        }
        self.tally.cycles.push(CycleRecord {
            cycle_id: report.cycle_id,
            disposition: report.disposition.label().to_string(),
            winner: report.arbitration.winner.as_ref().map(|winner| winner.source),
            proposals: report.pool.proposals().len(),
        });
        self.supervisor = Some(supervisor);
    }

    fn summary(&self) -> SessionSummary {
        let statistics = self
            .supervisor
            .as_ref()
            .map(|supervisor| supervisor.statistics())
            .unwrap_or_else(|| SupervisorState::default().statistics());

        SessionSummary {
            transcript_count: self.buffer.final_count(),
            participant_count: self.buffer.participant_count(),
            analysis_count: self.tally.cycles.len(),
            message_count: statistics.total_responses,
            responses_by_source: statistics.by_source,
            evaluator_failures: self.tally.evaluator_failures,
            dispatch_failures: self.tally.dispatch_failures,
            dropped_events: self.tally.dropped_events,
            coalesced_checks: self.scheduler.coalesced_checks(),
            cycles: self.tally.cycles.clone(),
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn join_cycle(slot: &mut Option<CycleTask>) -> Result<(Supervisor, CycleReport), JoinError> {
    match slot {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
