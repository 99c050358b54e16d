use std::collections::BTreeMap;

use serde::Serialize;
use tokio::time::Instant;

use crate::{evaluator::Perspective, supervisor::similarity::ContentProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceCounters {
    pub responses_emitted_count: u32,
    pub last_emitted_at: Option<Instant>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmissionRecord {
    pub source: Perspective,
    pub content_fingerprint: String,
    pub emitted_at: Instant,
    profile: ContentProfile,
}

impl EmissionRecord {
    pub fn new(source: Perspective, content: &str, emitted_at: Instant) -> Self {
        let profile = ContentProfile::of(content);
        Self {
            source,
            content_fingerprint: profile.fingerprint().to_string(),
            emitted_at,
            profile,
        }
    }

    pub fn profile(&self) -> &ContentProfile {
        &self.profile
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmissionStatistics {
    pub total_responses: u32,
    pub by_source: BTreeMap<Perspective, u32>,
}

/// Session-scoped emission history and per-source rate counters.
///
/// Arbitration only reads this. The sole mutation path is
/// [`crate::dispatch::Dispatcher::emit`] after the sink confirmed a post.
#[derive(Debug, Clone, Default)]
pub struct SupervisorState {
    counters: BTreeMap<Perspective, SourceCounters>,
    records: Vec<EmissionRecord>,
}

impl SupervisorState {
    pub fn new(sources: impl IntoIterator<Item = Perspective>) -> Self {
        Self {
            counters: sources
                .into_iter()
                .map(|source| (source, SourceCounters::default()))
                .collect(),
            records: Vec::new(),
        }
    }

    /// Rebuilds counters from an emission history, oldest first.
    pub fn with_history(
        sources: impl IntoIterator<Item = Perspective>,
        history: impl IntoIterator<Item = EmissionRecord>,
    ) -> Self {
        let mut state = Self::new(sources);
        for record in history {
            state.apply(record);
        }
        state
    }

    pub fn counters(&self, source: Perspective) -> SourceCounters {
        self.counters.get(&source).copied().unwrap_or_default()
    }

    pub fn records(&self) -> &[EmissionRecord] {
        &self.records
    }

    pub fn last_emission_at(&self) -> Option<Instant> {
        self.records.iter().map(|record| record.emitted_at).max()
    }

    pub fn total_emissions(&self) -> u32 {
        self.records.len() as u32
    }

    pub fn statistics(&self) -> EmissionStatistics {
        let by_source: BTreeMap<Perspective, u32> = self
            .counters
            .iter()
            .map(|(source, counters)| (*source, counters.responses_emitted_count))
            .collect();
        EmissionStatistics {
            total_responses: by_source.values().sum(),
            by_source,
        }
    }

    pub(crate) fn record_emission(&mut self, source: Perspective, content: &str, at: Instant) {
        self.apply(EmissionRecord::new(source, content, at));
    }

    fn apply(&mut self, record: EmissionRecord) {
        let counters = self.counters.entry(record.source).or_default();
        counters.responses_emitted_count = counters.responses_emitted_count.saturating_add(1);
        counters.last_emitted_at = Some(
            counters
                .last_emitted_at
                .map_or(record.emitted_at, |last| last.max(record.emitted_at)),
        );
        self.records.push(record);
    }
}
