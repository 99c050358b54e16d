
use tokio::time::Instant;

use huddle::evaluator::{Assessment, Perspective, Proposal};

pub fn proposal_with_urgency(source: Perspective, content: &str, urgency: f64) -> Proposal {
    Proposal::from_assessment(
        source,
        Assessment::new(content, 0.8, urgency, 0.8),
        Instant::now(),
    )
}
