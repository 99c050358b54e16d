use huddle::transcript::{AppendOutcome, TranscriptBuffer, TranscriptErrorKind};

use super::{final_from, partial_from};

#[test]
fn given_finals_when_appended_then_total_counts_in_arrival_order() {
    let buffer = TranscriptBuffer::new();
    assert_eq!(
        buffer.append(final_from("alice", "first", 0)),
        Ok(AppendOutcome::Final { total_finals: 1 })
    );
    assert_eq!(
        buffer.append(final_from("bob", "second", 5)),
        Ok(AppendOutcome::Final { total_finals: 2 })
    );
    // Arrival order wins over timestamps across speakers.
    assert_eq!(
        buffer.append(final_from("carol", "third", 1)),
        Ok(AppendOutcome::Final { total_finals: 3 })
    );
    assert_eq!(buffer.final_count(), 3);
}

#[test]
fn given_partial_when_appended_then_only_side_slot_changes() {
    let buffer = TranscriptBuffer::new();
    assert_eq!(
        buffer.append(partial_from("alice", "we should", 1)),
        Ok(AppendOutcome::Partial)
    );
    assert_eq!(
        buffer.append(partial_from("alice", "we should ship", 2)),
        Ok(AppendOutcome::Partial)
    );

    assert_eq!(buffer.final_count(), 0);
    let latest = buffer.latest_partial("alice").expect("partial should be kept");
    assert_eq!(latest.text, "we should ship");
}

#[test]
fn given_partial_when_final_arrives_then_partial_is_superseded() {
    let buffer = TranscriptBuffer::new();
    buffer
        .append(partial_from("alice", "we should", 1))
        .expect("partial should append");
    buffer
        .append(final_from("alice", "we should ship friday", 3))
        .expect("final should append");

    assert!(buffer.latest_partial("alice").is_none());
    assert_eq!(
        buffer.append(partial_from("alice", "we should ship", 2)),
        Ok(AppendOutcome::SupersededPartial)
    );
    assert!(buffer.latest_partials().is_empty());
}

#[test]
fn given_final_older_than_speaker_previous_when_appended_then_dropped() {
    let buffer = TranscriptBuffer::new();
    buffer
        .append(final_from("alice", "later", 10))
        .expect("final should append");

    let err = buffer
        .append(final_from("alice", "earlier", 4))
        .expect_err("out of order final should be rejected");
    assert_eq!(err.kind, TranscriptErrorKind::OutOfOrder);
    assert_eq!(buffer.final_count(), 1);

    buffer
        .append(final_from("alice", "same instant", 10))
        .expect("equal timestamps are not out of order");
}

#[test]
fn given_malformed_events_when_appended_then_rejected_without_side_effects() {
    let buffer = TranscriptBuffer::new();
    let err = buffer
        .append(final_from("  ", "hello", 0))
        .expect_err("blank speaker is malformed");
    assert_eq!(err.kind, TranscriptErrorKind::MalformedEvent);

    let err = buffer
        .append(final_from("alice", "   ", 0))
        .expect_err("blank final text is malformed");
    assert_eq!(err.kind, TranscriptErrorKind::MalformedEvent);

    assert_eq!(buffer.final_count(), 0);
    assert_eq!(buffer.participant_count(), 0);
}

#[test]
fn given_unknown_speaker_when_final_appended_then_roster_gains_speaker() {
    let buffer = TranscriptBuffer::new();
    buffer
        .append(final_from("dave", "hi all", 0))
        .expect("final should append");
    assert_eq!(buffer.participant_count(), 1);

    assert!(buffer.participant_left("dave").is_some());
    assert!(buffer.participant_left("dave").is_none());
}
