use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    evaluator::Perspective,
    scheduler::CycleId,
    transcript::{Participant, UtteranceEvent},
};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Utterance(UtteranceEvent),
    ParticipantJoined(Participant),
    ParticipantLeft { participant_id: String },
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleRecord {
    pub cycle_id: CycleId,
    pub disposition: String,
    pub winner: Option<Perspective>,
    pub proposals: usize,
}

/// End-of-session statistics, logged by the binary when a meeting finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct SessionSummary {
    pub transcript_count: usize,
    pub participant_count: usize,
    pub analysis_count: usize,
    pub message_count: u32,
    pub responses_by_source: BTreeMap<Perspective, u32>,
    pub evaluator_failures: usize,
    pub dispatch_failures: usize,
    pub dropped_events: usize,
    pub coalesced_checks: u64,
    pub cycles: Vec<CycleRecord>,
}
