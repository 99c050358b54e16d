use std::collections::BTreeSet;

use async_trait::async_trait;
use regex::Regex;

use crate::{
    evaluator::{
        error::EvaluatorError,
        ports::Evaluator,
        types::{Assessment, Perspective},
    },
    transcript::DiscourseSnapshot,
};

#[derive(Debug, Clone, Copy)]
struct CueSet {
    cues: &'static [&'static str],
    pressing: &'static [&'static str],
    base_urgency: f64,
}

const PROJECT_MANAGEMENT_CUES: CueSet = CueSet {
    cues: &[
        "deadline",
        "schedule",
        "delay",
        "slip",
        "blocker",
        "blocked",
        "milestone",
        "resource",
        "scope",
        "owner",
        "dependency",
    ],
    pressing: &["deadline", "blocker", "blocked", "slip"],
    base_urgency: 0.5,
};

const MARKET_CUES: CueSet = CueSet {
    cues: &[
        "market",
        "competitor",
        "segment",
        "positioning",
        "trend",
        "launch",
        "brand",
        "campaign",
        "audience",
    ],
    pressing: &["launch", "competitor"],
    base_urgency: 0.4,
};

const LEGAL_CUES: CueSet = CueSet {
    cues: &[
        "contract",
        "compliance",
        "liability",
        "privacy",
        "gdpr",
        "license",
        "regulation",
        "nda",
        "personal data",
        "terms",
    ],
    pressing: &["liability", "gdpr", "personal data", "regulation"],
    base_urgency: 0.6,
};

const SALES_CUES: CueSet = CueSet {
    cues: &[
        "price",
        "pricing",
        "discount",
        "deal",
        "budget",
        "quote",
        "renewal",
        "pipeline",
        "upsell",
    ],
    pressing: &["discount", "renewal", "quote"],
    base_urgency: 0.45,
};

const SYNTHESIS_CUES: CueSet = CueSet {
    cues: &[
        "agreed",
        "decided",
        "decision",
        "action item",
        "next step",
        "follow up",
        "takeaway",
        "summary",
    ],
    pressing: &["decided", "action item"],
    base_urgency: 0.35,
};

fn cue_set(perspective: Perspective) -> CueSet {
    match perspective {
        Perspective::ProjectManagement => PROJECT_MANAGEMENT_CUES,
        Perspective::Market => MARKET_CUES,
        Perspective::Legal => LEGAL_CUES,
        Perspective::Sales => SALES_CUES,
        Perspective::Synthesis => SYNTHESIS_CUES,
    }
}

/// Keyword-cue scorer standing in for a perspective's reasoning backend.
///
/// Looks at the trailing window of the discourse, collects which of the perspective's
/// cues appear as whole words, and speaks only when at least one does.
#[derive(Debug, Clone)]
pub struct CueEvaluator {
    perspective: Perspective,
    min_snapshot_len: usize,
    window: usize,
    base_urgency: f64,
    patterns: Vec<CuePattern>,
}

#[derive(Debug, Clone)]
struct CuePattern {
    cue: &'static str,
    pressing: bool,
    matcher: Regex,
}

/// `\b`-anchored, case-insensitive matcher; words of a phrase may be split by any whitespace.
fn cue_matcher(cue: &str) -> Option<Regex> {
    let words: Vec<String> = cue.split_whitespace().map(regex::escape).collect();
    Regex::new(&format!(r"(?i)\b{}\b", words.join(r"\s+"))).ok()
}

impl CueEvaluator {
    pub fn new(perspective: Perspective, min_snapshot_len: usize, window: usize) -> Self {
        let set = cue_set(perspective);
        let patterns = set
            .cues
            .iter()
            .filter_map(|cue| {
                let Some(matcher) = cue_matcher(cue) else {
                    tracing::warn!(
                        target: "evaluator",
                        perspective = %perspective,
                        cue = *cue,
                        "cue_pattern_rejected"
                    );
                    return None;
                };
                Some(CuePattern {
                    cue: *cue,
                    pressing: set.pressing.contains(cue),
                    matcher,
                })
            })
            .collect();

        Self {
            perspective,
            min_snapshot_len,
            window: window.max(1),
            base_urgency: set.base_urgency,
            patterns,
        }
    }

    pub fn assess(&self, snapshot: &DiscourseSnapshot) -> Option<Assessment> {
        if snapshot.len() < self.min_snapshot_len {
            return None;
        }

        let recent = snapshot.recent(self.window);
        let mut matched: BTreeSet<&'static str> = BTreeSet::new();
        let mut pressing: BTreeSet<&'static str> = BTreeSet::new();
        let mut utterances_with_cue = 0usize;

        for utterance in recent {
            let mut hit = false;
            let hits = self
                .patterns
                .iter()
                .filter(|pattern| pattern.matcher.is_match(&utterance.text));
            for pattern in hits {
                matched.insert(pattern.cue);
                if pattern.pressing {
                    pressing.insert(pattern.cue);
                }
                hit = true;
            }
            if hit {
                utterances_with_cue += 1;
            }
        }

        if matched.is_empty() {
            return None;
        }

        let confidence = (0.5 + 0.1 * matched.len() as f64).min(0.95);
        let urgency = (self.base_urgency + 0.15 * pressing.len() as f64).min(1.0);
        let relevance = 0.4 + 0.6 * (utterances_with_cue as f64 / recent.len().max(1) as f64);
        let terms = matched.iter().copied().collect::<Vec<_>>().join(", ");

        Some(
            Assessment::new(
                render_advice(self.perspective, &terms),
                confidence,
                urgency,
                relevance,
            )
            .with_rationale(format!(
                "{} of the last {} utterances mention: {}",
                utterances_with_cue,
                recent.len(),
                terms
            )),
        )
    }
}

#[async_trait]
impl Evaluator for CueEvaluator {
    fn perspective(&self) -> Perspective {
        self.perspective
    }

    async fn evaluate(
        &self,
        snapshot: &DiscourseSnapshot,
    ) -> Result<Option<Assessment>, EvaluatorError> {
        Ok(self.assess(snapshot))
    }
}

fn render_advice(perspective: Perspective, terms: &str) -> String {
    match perspective {
        Perspective::ProjectManagement => format!(
            "Delivery risk check: the discussion touched on {terms}. Confirm owners and dates before moving on."
        ),
        Perspective::Market => format!(
            "Market angle: {terms} came up. Worth checking how this lands with the target segment."
        ),
        Perspective::Legal => format!(
            "Legal flag: {terms} was mentioned. Please loop in legal review before committing."
        ),
        Perspective::Sales => format!(
            "Commercial note: {terms} is on the table. Align on the approval path for any concessions."
        ),
        Perspective::Synthesis => format!(
            "Recap: the group has signalled {terms}. Capture the outcome and who follows up."
        ),
    }
}
