//! Musical pattern detection for the Smart Melody Tokenizer
//!
//! Recognizes scales, arpeggios, melodic sequences and leaps in a monophonic
//! melody, each with a confidence score, and picks a set of non-overlapping
//! spans. Detected patterns map onto the vocabulary's `PATTERN_*` tokens.
//!
//! # Examples
//!
//! ```
//! use smt_core::Note;
//! use smt_patterns::{pattern_tokens, PatternDetector};
//!
//! let notes: Vec<Note> = [60, 62, 64, 65, 67]
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &p)| Note::new(p, i as f64 * 0.5, i as f64 * 0.5 + 0.5, 65))
//!     .collect();
//!
//! let patterns = PatternDetector::default().detect_patterns(&notes);
//! assert_eq!(pattern_tokens(&patterns), ["PATTERN_SCALE_UP"]);
//! ```

pub mod detector;
pub mod pattern;

pub use detector::{
    classify_chord, detect_leaps, pattern_tokens, resolve_overlaps, DetectorConfig,
    PatternDetector,
};
pub use pattern::{format_analysis, ChordQuality, Direction, Pattern, PatternKind};
