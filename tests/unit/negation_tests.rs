/*!
 * Tests for negation annotation through the public API
 */

use negbatch::artifact::SentenceRecord;
use negbatch::negation::{BUILTIN_CUES, CueVocabulary, NegationAnnotator};

#[test]
fn test_annotate_withReferenceSentence_shouldMatchExpectedScope() {
    let sentence = "The patient does not have any signs of infection.";
    let annotation = NegationAnnotator::default().annotate(sentence);

    assert!(annotation.has_negation());
    assert!(annotation.cue_words.contains(&"not".to_string()));
    let scope = annotation.scope.unwrap();
    assert_eq!(scope.text, "have any signs of infection.");
    assert_eq!(scope.end, sentence.chars().count());
}

#[test]
fn test_annotate_withNoCue_shouldHaveNoScope() {
    let annotation = NegationAnnotator::default().annotate("Blood pressure is stable.");
    assert!(!annotation.has_negation());
    assert!(annotation.scope.is_none());
}

#[test]
fn test_vocabulary_withExtraCues_shouldAppendAfterBuiltins() {
    let extra = vec![
        "ruled out".to_string(),
        "  ".to_string(),
        "not".to_string(),
        "free of".to_string(),
    ];
    let vocabulary = CueVocabulary::with_extra(&extra);

    // blanks and duplicates are skipped
    assert_eq!(vocabulary.len(), BUILTIN_CUES.len() + 2);
    let texts: Vec<&str> = vocabulary.iter().map(|cue| cue.text()).collect();
    assert_eq!(&texts[texts.len() - 2..], &["ruled out", "free of"]);
}

#[test]
fn test_sentenceRecord_annotated_shouldStoreScopeOffsets() {
    let annotator = NegationAnnotator::default();
    let record = SentenceRecord::annotated(
        7,
        2,
        "She denies chest pain.".to_string(),
        "notes.txt",
        &annotator,
    );

    assert_eq!(record.id, 7);
    assert_eq!(record.line_number, 2);
    assert_eq!(record.word_count, 4);
    assert_eq!(record.char_count, 22);
    assert_eq!(record.cue_words, vec!["denies"]);
    assert_eq!(record.scope, "chest pain.");
    assert_eq!(record.scope_start, Some(11));
    assert_eq!(record.scope_end, Some(22));
    assert!(record.scope_is_consistent());
}

#[test]
fn test_sentenceRecord_reannotate_afterEdit_shouldDropStaleScope() {
    let annotator = NegationAnnotator::default();
    let mut record =
        SentenceRecord::annotated(1, 1, "No fever.".to_string(), "notes.txt", &annotator);
    assert!(record.has_negation);

    record.text = "Fever.".to_string();
    record.reannotate(&annotator);

    assert!(!record.has_negation);
    assert!(record.cue_words.is_empty());
    assert_eq!(record.scope_start, None);
    assert!(record.scope.is_empty());
    assert!(record.scope_is_consistent());
}
