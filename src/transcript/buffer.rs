use std::{
    collections::BTreeMap,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use time::OffsetDateTime;
use tokio::time::Instant;

use crate::transcript::{
    error::{TranscriptError, malformed_event, out_of_order},
    types::{DiscourseSnapshot, Participant, SpeakerId, UtteranceEvent},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Final { total_finals: usize },
    Partial,
    /// A partial that arrived after the final it belongs to.
    SupersededPartial,
}

#[derive(Debug, Default)]
struct BufferInner {
    finals: Vec<UtteranceEvent>,
    latest_partials: BTreeMap<SpeakerId, UtteranceEvent>,
    last_final_at: BTreeMap<SpeakerId, OffsetDateTime>,
    roster: BTreeMap<String, Participant>,
    snapshot_cursor: usize,
}

/// Append-only store of the meeting's utterances.
///
/// One ingestion path writes; the scheduler, the session and display readers read.
/// Snapshots copy the finals out under the lock so a cycle never observes later appends.
#[derive(Debug, Default)]
pub struct TranscriptBuffer {
    inner: RwLock<BufferInner>,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, event: UtteranceEvent) -> Result<AppendOutcome, TranscriptError> {
        validate_event(&event)?;

        let mut inner = self.write();
        let last_final_at = inner.last_final_at.get(&event.speaker_id).copied();

        if event.is_partial {
            if last_final_at.is_some_and(|last| event.timestamp <= last) {
                return Ok(AppendOutcome::SupersededPartial);
            }
            inner
                .latest_partials
                .insert(event.speaker_id.clone(), event);
            return Ok(AppendOutcome::Partial);
        }

        if let Some(last) = last_final_at
            && event.timestamp < last
        {
            return Err(out_of_order(format!(
                "final utterance from '{}' at {} precedes the previous final at {}",
                event.speaker_id, event.timestamp, last
            )));
        }

        inner.latest_partials.remove(&event.speaker_id);
        inner
            .last_final_at
            .insert(event.speaker_id.clone(), event.timestamp);
        if !inner.roster.contains_key(&event.speaker_id) {
            inner.roster.insert(
                event.speaker_id.clone(),
                Participant::from_speaker(&event.speaker_id),
            );
        }
        inner.finals.push(event);

        Ok(AppendOutcome::Final {
            total_finals: inner.finals.len(),
        })
    }

    pub fn participant_joined(&self, participant: Participant) {
        self.write()
            .roster
            .insert(participant.participant_id.clone(), participant);
    }

    pub fn participant_left(&self, participant_id: &str) -> Option<Participant> {
        self.write().roster.remove(participant_id)
    }

    /// Copies every final utterance and the roster, and advances the "new since previous
    /// snapshot" cursor.
    pub fn snapshot(&self, taken_at: Instant) -> DiscourseSnapshot {
        let mut inner = self.write();
        let new_since_previous = inner.finals.len() - inner.snapshot_cursor;
        inner.snapshot_cursor = inner.finals.len();
        DiscourseSnapshot::new(
            inner.finals.clone(),
            inner.roster.clone(),
            new_since_previous,
            taken_at,
        )
    }

    pub fn final_count(&self) -> usize {
        self.read().finals.len()
    }

    pub fn participant_count(&self) -> usize {
        self.read().roster.len()
    }

    pub fn latest_partial(&self, speaker_id: &str) -> Option<UtteranceEvent> {
        self.read().latest_partials.get(speaker_id).cloned()
    }

    pub fn latest_partials(&self) -> Vec<UtteranceEvent> {
        self.read().latest_partials.values().cloned().collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, BufferInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BufferInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_event(event: &UtteranceEvent) -> Result<(), TranscriptError> {
    if event.speaker_id.trim().is_empty() {
        return Err(malformed_event("utterance speaker_id cannot be empty"));
    }
    if !event.is_partial && event.text.trim().is_empty() {
        return Err(malformed_event(format!(
            "final utterance from '{}' has no text",
            event.speaker_id
        )));
    }
    Ok(())
}
