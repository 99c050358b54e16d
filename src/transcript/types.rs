use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::time::Instant;

pub type SpeakerId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtteranceEvent {
    pub speaker_id: SpeakerId,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default)]
    pub is_partial: bool,
}

impl UtteranceEvent {
    pub fn finalized(
        speaker_id: impl Into<SpeakerId>,
        text: impl Into<String>,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            speaker_id: speaker_id.into(),
            text: text.into(),
            timestamp,
            is_partial: false,
        }
    }

    pub fn partial(
        speaker_id: impl Into<SpeakerId>,
        text: impl Into<String>,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            speaker_id: speaker_id.into(),
            text: text.into(),
            timestamp,
            is_partial: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub participant_id: String,
    pub display_name: String,
    #[serde(default)]
    pub is_host: bool,
}

impl Participant {
    pub fn new(participant_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            display_name: display_name.into(),
            is_host: false,
        }
    }

    pub(crate) fn from_speaker(speaker_id: &str) -> Self {
        Self::new(speaker_id, speaker_id)
    }
}

/// Point-in-time view of the finalized discourse handed to one analysis cycle.
///
/// Built by [`TranscriptBuffer::snapshot`](super::TranscriptBuffer::snapshot) and never
/// mutated afterwards; evaluators share it through an `Arc`.
#[derive(Debug, Clone)]
pub struct DiscourseSnapshot {
    utterances: Vec<UtteranceEvent>,
    roster: BTreeMap<String, Participant>,
    new_since_previous: usize,
    taken_at: Instant,
}

impl DiscourseSnapshot {
    pub(crate) fn new(
        utterances: Vec<UtteranceEvent>,
        roster: BTreeMap<String, Participant>,
        new_since_previous: usize,
        taken_at: Instant,
    ) -> Self {
        Self {
            utterances,
            roster,
            new_since_previous,
            taken_at,
        }
    }

    pub fn utterances(&self) -> &[UtteranceEvent] {
        &self.utterances
    }

    /// The trailing `window` utterances, or all of them when fewer exist.
    pub fn recent(&self, window: usize) -> &[UtteranceEvent] {
        let start = self.utterances.len().saturating_sub(window);
        &self.utterances[start..]
    }

    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }

    pub fn new_since_previous(&self) -> usize {
        self.new_since_previous
    }

    pub fn taken_at(&self) -> Instant {
        self.taken_at
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.roster.values()
    }

    pub fn participant_count(&self) -> usize {
        self.roster.len()
    }

    pub fn display_name<'a>(&'a self, speaker_id: &'a str) -> &'a str {
        self.roster
            .get(speaker_id)
            .map(|participant| participant.display_name.as_str())
            .unwrap_or(speaker_id)
    }

    /// Renders the discourse as `[timestamp] speaker: text` lines.
    pub fn render(&self) -> String {
        self.utterances
            .iter()
            .map(|utterance| {
                let timestamp = utterance
                    .timestamp
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| utterance.timestamp.unix_timestamp().to_string());
                format!(
                    "[{}] {}: {}",
                    timestamp,
                    self.display_name(&utterance.speaker_id),
                    utterance.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
