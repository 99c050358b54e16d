pub mod buffer;
pub mod error;
pub mod types;

pub use buffer::{AppendOutcome, TranscriptBuffer};
pub use error::{TranscriptError, TranscriptErrorKind};
pub use types::{DiscourseSnapshot, Participant, SpeakerId, UtteranceEvent};
