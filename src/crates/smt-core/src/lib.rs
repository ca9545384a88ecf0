//! Core of the Smart Melody Tokenizer
//!
//! This crate turns monophonic melodies into sequences of compound tokens and
//! back. A single token carries pitch, duration and dynamic together, e.g.
//! `NOTE_C4_quarter_mf`, which keeps sequences short for language models.
//!
//! # Examples
//!
//! ```
//! use smt_core::{Note, Tokenizer};
//!
//! let tokenizer = Tokenizer::default();
//! let notes = vec![
//!     Note::new(60, 0.0, 1.0, 70),
//!     Note::new(64, 2.0, 3.0, 70),
//! ];
//!
//! let result = tokenizer.encode_notes(&notes, "example");
//! assert_eq!(
//!     result.tokens,
//!     ["[BOS]", "NOTE_C4_quarter_mf", "REST_quarter", "NOTE_E4_quarter_mf", "[EOS]"]
//! );
//!
//! let decoded = tokenizer.decode_tokens(&result.tokens);
//! assert_eq!(decoded[1].start_time, 2.0);
//! ```
//!
//! # Token families
//!
//! - Special: `[PAD] [BOS] [EOS] [MASK] [UNK] [SEP]`
//! - Structural: `BAR`, `PHRASE_START`, `VERSE`, ...
//! - Notes: `NOTE_{pitch}_{duration}_{dynamic}`
//! - Rests: `REST_{duration}`
//! - Patterns: `PATTERN_{LABEL}`
//! - Control: `TEMPO_*`, `KEY_*`, `TIME_*`, `STYLE_*` and articulations
//!
//! # Main Types
//!
//! - [`Vocabulary`]: token <-> id bijection built from a [`VocabConfig`]
//! - [`Tokenizer`]: quantizes notes and converts them to and from tokens
//! - [`Token`]: a classified token, produced by [`Token::lex`]

pub mod config;
pub mod error;
pub mod lexer;
pub mod note;
pub mod quantize;
pub mod tokenizer;
pub mod vocabulary;

#[cfg(test)]
mod tokenizer_tests;

pub use config::{PatternCatalog, PatternFamily, PitchRange, TokenizerConfig, VocabConfig};
pub use error::{ConfigError, Result, SmtError, TokenError};
pub use lexer::{lex_stream, NoteFields, Special, Structural, Token};
pub use note::{
    beats_to_duration_name, duration_name_to_beats, dynamic_to_velocity, name_to_pitch,
    pitch_to_name, velocity_to_dynamic, MelodyStats, Note, PitchSpan,
};
pub use quantize::quantize_notes;
pub use tokenizer::{
    Decoded, EncodeMetadata, EncodeResult, PitchBounds, SampleStyle, SkippedToken, Tokenizer,
    TokenizerSettings,
};
pub use vocabulary::{Vocabulary, CONTROL_TOKENS};
