mod buffer;

use time::{Duration, OffsetDateTime, macros::datetime};

use huddle::transcript::UtteranceEvent;

pub fn at(offset_seconds: i64) -> OffsetDateTime {
    datetime!(2024-05-01 10:00 UTC) + Duration::seconds(offset_seconds)
}

pub fn final_from(speaker: &str, text: &str, offset_seconds: i64) -> UtteranceEvent {
    UtteranceEvent::finalized(speaker, text, at(offset_seconds))
}

pub fn partial_from(speaker: &str, text: &str, offset_seconds: i64) -> UtteranceEvent {
    UtteranceEvent::partial(speaker, text, at(offset_seconds))
}
