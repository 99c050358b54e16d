use huddle::evaluator::{CueEvaluator, Evaluator, Perspective};

use super::{snapshot_of, small_talk};

#[tokio::test]
async fn given_short_discourse_then_cue_evaluator_abstains() {
    let evaluator = CueEvaluator::new(Perspective::Legal, 3, 10);
    let snapshot = snapshot_of(&["the contract has a liability clause", "gdpr too"]);
    assert_eq!(evaluator.evaluate(&snapshot).await, Ok(None));
}

#[tokio::test]
async fn given_no_cues_then_cue_evaluator_abstains() {
    let evaluator = CueEvaluator::new(Perspective::Sales, 3, 10);
    assert_eq!(evaluator.evaluate(&small_talk(8)).await, Ok(None));
}

#[tokio::test]
async fn given_legal_cues_then_assessment_names_matched_terms() {
    let evaluator = CueEvaluator::new(Perspective::Legal, 3, 10);
    let snapshot = snapshot_of(&[
        "morning everyone",
        "the vendor contract caps liability at one month",
        "they also process personal data under gdpr",
    ]);

    let assessment = evaluator
        .evaluate(&snapshot)
        .await
        .expect("cue evaluation cannot fail")
        .expect("legal cues should produce advice");
    assert!(assessment.content.starts_with("Legal flag:"));
    assert!(assessment.rationale.contains("liability"));
    assert!(assessment.confidence > 0.5 && assessment.confidence <= 0.95);
    assert!(assessment.urgency >= 0.9, "pressing cues raise urgency");
    assert!((0.0..=1.0).contains(&assessment.relevance));
}

#[tokio::test]
async fn given_cues_outside_window_then_they_are_ignored() {
    let evaluator = CueEvaluator::new(Perspective::Sales, 3, 2);
    let snapshot = snapshot_of(&[
        "can we offer a discount on the renewal",
        "moving on",
        "next topic is hiring",
        "sounds good",
    ]);
    assert!(evaluator.assess(&snapshot).is_none());
}

#[tokio::test]
async fn given_cue_inside_longer_words_then_it_does_not_match() {
    let legal = CueEvaluator::new(Perspective::Legal, 3, 10);
    let snapshot = snapshot_of(&[
        "let's start with the agenda",
        "ok",
        "we ship on Monday",
        "sounds good",
        "see you then",
    ]);
    assert!(legal.assess(&snapshot).is_none());

    let sales = CueEvaluator::new(Perspective::Sales, 3, 10);
    let market = CueEvaluator::new(Perspective::Market, 3, 10);
    let snapshot = snapshot_of(&[
        "an ideal outcome",
        "I went to the supermarket",
        "the telescope arrived",
    ]);
    assert!(sales.assess(&snapshot).is_none());
    assert!(market.assess(&snapshot).is_none());
}

#[tokio::test]
async fn given_phrase_cue_with_other_casing_and_spacing_then_it_matches() {
    let evaluator = CueEvaluator::new(Perspective::Legal, 3, 10);
    let snapshot = snapshot_of(&[
        "quick update",
        "we store Personal   Data in the EU region",
        "the NDA is signed",
    ]);

    let assessment = evaluator
        .assess(&snapshot)
        .expect("whole-word cues should match");
    assert!(assessment.rationale.contains("personal data"));
    assert!(assessment.rationale.contains("nda"));
}
