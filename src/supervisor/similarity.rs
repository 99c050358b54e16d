use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

/// Normalized view of a piece of content used by the dedup gate and emission history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentProfile {
    fingerprint: String,
    terms: BTreeSet<String>,
}

impl ContentProfile {
    pub fn of(content: &str) -> Self {
        let normalized = normalize(content);
        Self {
            fingerprint: fingerprint_normalized(&normalized),
            terms: terms(&normalized),
        }
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Similarity in `[0, 1]`: Jaccard overlap of terms, 1.0 for identical fingerprints.
    pub fn similarity(&self, other: &ContentProfile) -> f64 {
        if self.fingerprint == other.fingerprint {
            return 1.0;
        }
        if self.terms.is_empty() || other.terms.is_empty() {
            return 0.0;
        }

        let intersection = self.terms.intersection(&other.terms).count();
        let union = self.terms.len() + other.terms.len() - intersection;
        intersection as f64 / union as f64
    }
}

pub fn fingerprint(content: &str) -> String {
    fingerprint_normalized(&normalize(content))
}

fn fingerprint_normalized(normalized: &str) -> String {
    format!("{:x}", Sha256::digest(normalized.as_bytes()))
}

fn normalize(content: &str) -> String {
    content
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() {
                ch.to_lowercase().next().unwrap_or(ch)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn terms(normalized: &str) -> BTreeSet<String> {
    let mut terms = BTreeSet::new();
    for token in normalized.split(' ').filter(|token| !token.is_empty()) {
        let chars: Vec<char> = token.chars().collect();
        // Unsegmented scripts arrive as one long token; bigrams keep overlap measurable.
        if !token.is_ascii() && chars.len() > 2 {
            for pair in chars.windows(2) {
                terms.insert(pair.iter().collect());
            }
        } else {
            terms.insert(token.to_string());
        }
    }
    terms
}
