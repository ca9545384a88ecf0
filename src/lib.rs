//! Smart Melody Tokenizer
//!
//! Compound-token encoding of monophonic melodies with musical pattern
//! annotation. This crate ties together [`smt_core`] (vocabulary and
//! tokenizer) and [`smt_patterns`] (pattern detection).
//!
//! # Examples
//!
//! ```
//! use smt::{encode_with_patterns, Note, PatternDetector, Tokenizer};
//!
//! let notes: Vec<Note> = [60, 64, 67, 72]
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &p)| Note::new(p, i as f64 * 0.5, i as f64 * 0.5 + 0.5, 70))
//!     .collect();
//!
//! let annotated = encode_with_patterns(
//!     &Tokenizer::default(),
//!     &PatternDetector::default(),
//!     &notes,
//!     "example",
//! );
//! assert_eq!(annotated.result.tokens[1], "PATTERN_ARPEGGIO_MAJOR");
//! ```

pub use smt_core::*;
pub use smt_patterns::{
    classify_chord, detect_leaps, format_analysis, pattern_tokens, resolve_overlaps,
    ChordQuality, DetectorConfig, Direction, Pattern, PatternDetector, PatternKind,
};

/// An encoding whose token stream carries pattern markers.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedEncoding {
    pub result: EncodeResult,
    pub patterns: Vec<Pattern>,
}

/// Insert each pattern's `PATTERN_*` token right before the note token that
/// starts it.
///
/// `start_index` counts note tokens, so patterns must come from the same notes
/// the tokens were built from. Patterns starting on the same note keep their
/// order; patterns past the last note are dropped.
pub fn annotate_tokens<S: AsRef<str>>(tokens: &[S], patterns: &[Pattern]) -> Vec<String> {
    let mut out = Vec::with_capacity(tokens.len() + patterns.len());
    let mut note_index = 0;
    let mut placed = 0;

    for raw in tokens {
        let raw = raw.as_ref();
        if Token::parse(raw).is_note() {
            for pattern in patterns.iter().filter(|p| p.start_index == note_index) {
                out.push(pattern.kind.token());
                placed += 1;
            }
            note_index += 1;
        }
        out.push(raw.to_string());
    }

    if placed < patterns.len() {
        log::warn!(
            "{} patterns start past the last of {} notes",
            patterns.len() - placed,
            note_index
        );
    }
    out
}

/// Encode `notes`, detect patterns on the quantized notes and annotate the
/// tokens with them.
///
/// Pattern tokens absent from the vocabulary get the `[UNK]` id.
pub fn encode_with_patterns(
    tokenizer: &Tokenizer,
    detector: &PatternDetector,
    notes: &[Note],
    source: &str,
) -> AnnotatedEncoding {
    let mut result = tokenizer.encode_notes(notes, source);
    let patterns = detector.detect_patterns(&result.notes);

    if !patterns.is_empty() {
        result.tokens = annotate_tokens(&result.tokens, &patterns);
        result.token_ids = tokenizer.vocabulary().encode_tokens(&result.tokens);
        result.metadata.num_tokens = Some(result.tokens.len());
        result.metadata.compression_ratio =
            Some(result.metadata.num_notes as f64 / result.tokens.len() as f64);
    }

    AnnotatedEncoding { result, patterns }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eighths(pitches: &[u8]) -> Vec<Note> {
        pitches
            .iter()
            .enumerate()
            .map(|(i, &p)| Note::new(p, i as f64 * 0.5, i as f64 * 0.5 + 0.5, 65))
            .collect()
    }

    #[test]
    fn test_annotate_places_marker_before_first_note() {
        let notes = eighths(&[60, 62, 64]);
        let pattern = Pattern::new(PatternKind::ScaleUp, 1, &notes[1..3], 0.8, "scale");
        let tokens = [
            "[BOS]",
            "NOTE_C4_eighth_mf",
            "NOTE_D4_eighth_mf",
            "BAR",
            "NOTE_E4_eighth_mf",
            "[EOS]",
        ];

        assert_eq!(
            annotate_tokens(&tokens, &[pattern]),
            vec![
                "[BOS]",
                "NOTE_C4_eighth_mf",
                "PATTERN_SCALE_UP",
                "NOTE_D4_eighth_mf",
                "BAR",
                "NOTE_E4_eighth_mf",
                "[EOS]",
            ]
        );
    }

    #[test]
    fn test_annotate_without_patterns_is_identity() {
        let tokens = ["[BOS]", "NOTE_C4_eighth_mf", "[EOS]"];
        assert_eq!(annotate_tokens(&tokens, &[]), tokens);
    }

    #[test]
    fn test_annotate_drops_out_of_range_patterns() {
        let notes = eighths(&[60, 62, 64]);
        let pattern = Pattern::new(PatternKind::ScaleUp, 5, &notes, 0.8, "scale");
        let tokens = ["[BOS]", "NOTE_C4_eighth_mf", "[EOS]"];
        assert_eq!(annotate_tokens(&tokens, &[pattern]), tokens);
    }

    #[test]
    fn test_encode_with_patterns_updates_ids_and_metadata() {
        let tokenizer = Tokenizer::default();
        let annotated = encode_with_patterns(
            &tokenizer,
            &PatternDetector::default(),
            &eighths(&[60, 62, 64, 65, 67]),
            "scale",
        );

        assert_eq!(annotated.patterns.len(), 1);
        let result = &annotated.result;
        assert_eq!(result.tokens[1], "PATTERN_SCALE_UP");
        assert_eq!(result.tokens.len(), 8);
        assert_eq!(result.token_ids.len(), 8);
        assert_eq!(result.token_ids[1], tokenizer.vocabulary().encode_token("PATTERN_SCALE_UP"));
        assert_eq!(result.metadata.num_tokens, Some(8));

        // pattern markers do not disturb decoding
        let decoded = tokenizer.decode_tokens(&result.tokens);
        assert_eq!(decoded.len(), 5);
        assert_eq!(decoded[4].start_time, 2.0);
    }
}
