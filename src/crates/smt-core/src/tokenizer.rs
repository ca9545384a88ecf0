//! Note sequence <-> token sequence conversion.
//!
//! Encoding quantizes the notes, then walks them in order emitting `BAR`
//! tokens at bar boundaries, `REST_*` tokens for gaps and one compound
//! `NOTE_{pitch}_{duration}_{dynamic}` token per note, framed by `[BOS]` and
//! `[EOS]`. Decoding runs the same walk backwards; `BAR` tokens resynchronize
//! absolute time to the bar grid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{TokenizerConfig, VocabConfig};
use crate::error::{ConfigError, Result, SmtError, TokenError};
use crate::lexer::{NoteFields, Special, Token};
use crate::note::{
    beats_to_duration_name, duration_name_to_beats, dynamic_to_velocity, name_to_pitch, Note,
};
use crate::quantize::quantize_notes;
use crate::vocabulary::Vocabulary;

/// A note may start this many beats after the previous one ends without
/// getting a rest.
pub const REST_TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchBounds {
    pub min: u8,
    pub max: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeMetadata {
    pub num_notes: usize,
    /// End time in beats of the last input note.
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_tokens: Option<usize>,
    /// Notes per token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_range: Option<PitchBounds>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeResult {
    pub tokens: Vec<String>,
    pub token_ids: Vec<u32>,
    pub metadata: EncodeMetadata,
    /// The quantized notes the tokens were built from.
    pub notes: Vec<Note>,
}

/// A note token that decoding had to drop.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedToken {
    pub index: usize,
    pub token: String,
    pub error: TokenError,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Decoded {
    pub notes: Vec<Note>,
    pub skipped: Vec<SkippedToken>,
}

/// Canned token sequences for demos and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleStyle {
    Simple,
    Scale,
    Arpeggio,
}

/// On-disk form of a tokenizer's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenizerSettings {
    #[serde(default)]
    pub vocab_config: VocabConfig,
    #[serde(default)]
    pub midi_config: TokenizerConfig,
    #[serde(default)]
    pub vocab_size: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    vocabulary: Vocabulary,
    config: TokenizerConfig,
}

impl Tokenizer {
    pub fn new(vocab_config: VocabConfig, config: TokenizerConfig) -> std::result::Result<Self, ConfigError> {
        let vocabulary = Vocabulary::new(vocab_config)?;
        Tokenizer::with_vocabulary(vocabulary, config)
    }

    pub fn with_vocabulary(
        vocabulary: Vocabulary,
        config: TokenizerConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Tokenizer { vocabulary, config })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Encode a melody sorted by start time.
    ///
    /// `source` is recorded in the metadata (usually the file the notes came
    /// from). An empty melody encodes to `[BOS] [EOS]` without quantizing.
    pub fn encode_notes(&self, notes: &[Note], source: &str) -> EncodeResult {
        let Some(last) = notes.last() else {
            let tokens = vec![
                Special::Bos.as_str().to_string(),
                Special::Eos.as_str().to_string(),
            ];
            return EncodeResult {
                token_ids: self.vocabulary.encode_tokens(&tokens),
                tokens,
                metadata: EncodeMetadata {
                    num_notes: 0,
                    duration: 0.0,
                    num_tokens: None,
                    compression_ratio: None,
                    source: None,
                    pitch_range: None,
                },
                notes: Vec::new(),
            };
        };

        let quantized = quantize_notes(notes, self.config.quantization_grid);
        let tokens: Vec<String> = self
            .notes_to_tokens(&quantized)
            .iter()
            .map(Token::to_string)
            .collect();
        let token_ids = self.vocabulary.encode_tokens(&tokens);

        let bars = tokens.iter().filter(|t| *t == "BAR").count() + 1;
        if bars > self.config.max_bars {
            log::warn!(
                "Melody spans {} bars, more than the configured max_bars of {}",
                bars,
                self.config.max_bars
            );
        }

        let metadata = EncodeMetadata {
            num_notes: notes.len(),
            duration: last.end_time,
            num_tokens: Some(tokens.len()),
            compression_ratio: Some(notes.len() as f64 / tokens.len() as f64),
            source: Some(source.to_string()),
            pitch_range: Some(PitchBounds {
                min: notes.iter().map(|n| n.pitch).min().unwrap_or(last.pitch),
                max: notes.iter().map(|n| n.pitch).max().unwrap_or(last.pitch),
            }),
        };

        EncodeResult {
            tokens,
            token_ids,
            metadata,
            notes: quantized,
        }
    }

    /// Token walk over already-quantized notes.
    pub fn notes_to_tokens(&self, notes: &[Note]) -> Vec<Token> {
        let beats_per_bar = self.config.beats_per_bar;
        let mut tokens = vec![Token::Special(Special::Bos)];
        let mut current_time = 0.0;
        let mut bar_start = 0.0;

        for note in notes {
            while note.start_time >= bar_start + beats_per_bar {
                tokens.push(Token::Bar);
                bar_start += beats_per_bar;
            }
            // The gap is measured from the previous note's end, even across
            // bar lines.
            let gap = note.start_time - current_time;
            if gap > REST_TOLERANCE && gap + f64::EPSILON >= self.config.min_rest_duration {
                let name = beats_to_duration_name(gap).unwrap_or("sixteenth");
                tokens.push(Token::Rest(name.to_string()));
            }

            tokens.push(Token::note(
                note.pitch_name.as_str(),
                note.duration_name.as_str(),
                note.dynamic_name.as_str(),
            ));
            current_time = note.end_time;
        }

        tokens.push(Token::Special(Special::Eos));
        tokens
    }

    pub fn decode_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<Note> {
        self.decode_detailed(tokens).notes
    }

    /// Decode token ids by first mapping them through the vocabulary.
    pub fn decode_ids(&self, ids: &[u32]) -> Vec<Note> {
        self.decode_tokens(&self.vocabulary.decode_tokens(ids))
    }

    /// Decode and also report every note token that had to be skipped.
    pub fn decode_detailed<S: AsRef<str>>(&self, tokens: &[S]) -> Decoded {
        let beats_per_bar = self.config.beats_per_bar;
        let mut decoded = Decoded::default();
        let mut current_time = 0.0;
        let mut current_bar: u32 = 0;

        for (index, raw) in tokens.iter().enumerate() {
            let raw = raw.as_ref();
            match Token::lex(raw) {
                Ok(Token::Bar) => {
                    current_bar += 1;
                    current_time = current_bar as f64 * beats_per_bar;
                }
                Ok(Token::Rest(duration)) => {
                    current_time += duration_name_to_beats(&duration);
                }
                Ok(Token::Note(fields)) => match note_from_fields(raw, &fields, current_time) {
                    Ok(note) => {
                        current_time = note.end_time;
                        decoded.notes.push(note);
                    }
                    Err(error) => skip(&mut decoded, index, raw, error),
                },
                Err(error @ TokenError::MalformedNote { .. }) => {
                    skip(&mut decoded, index, raw, error)
                }
                // Specials, patterns, control and structure markers carry no timing.
                Ok(_) | Err(_) => {}
            }
        }

        decoded
    }

    pub fn sample_tokens(&self, style: SampleStyle) -> Vec<String> {
        let tokens: &[&str] = match style {
            SampleStyle::Simple => &[
                "[BOS]",
                "BAR",
                "NOTE_C4_quarter_mf",
                "NOTE_D4_quarter_mf",
                "NOTE_E4_quarter_mf",
                "NOTE_F4_quarter_mf",
                "BAR",
                "NOTE_G4_half_f",
                "REST_half",
                "[EOS]",
            ],
            SampleStyle::Scale => &[
                "[BOS]",
                "BAR",
                "PATTERN_SCALE_UP",
                "NOTE_C4_eighth_mp",
                "NOTE_D4_eighth_mp",
                "NOTE_E4_eighth_mp",
                "NOTE_F4_eighth_mp",
                "NOTE_G4_eighth_mf",
                "NOTE_A4_eighth_mf",
                "NOTE_B4_eighth_f",
                "NOTE_C5_quarter_f",
                "[EOS]",
            ],
            SampleStyle::Arpeggio => &[
                "[BOS]",
                "BAR",
                "PATTERN_ARPEGGIO_MAJOR",
                "NOTE_C4_quarter_mf",
                "NOTE_E4_quarter_mf",
                "NOTE_G4_quarter_mf",
                "NOTE_C5_quarter_f",
                "[EOS]",
            ],
        };
        tokens.iter().map(|t| t.to_string()).collect()
    }

    pub fn settings(&self) -> TokenizerSettings {
        TokenizerSettings {
            vocab_config: self.vocabulary.config().clone(),
            midi_config: self.config.clone(),
            vocab_size: Some(self.vocabulary.size()),
        }
    }

    pub fn save_config(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.settings())?;
        std::fs::write(path, json).map_err(|e| SmtError::io(path, e))?;
        log::info!("Tokenizer configuration saved to {}", path.display());
        Ok(())
    }

    /// Build a tokenizer from a file written by [`Tokenizer::save_config`].
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SmtError::io(path, e))?;
        let settings: TokenizerSettings = serde_json::from_str(&json)?;
        let tokenizer = Tokenizer::new(settings.vocab_config, settings.midi_config)?;

        if let Some(expected) = settings.vocab_size {
            if expected != tokenizer.vocabulary.size() {
                log::warn!(
                    "{} records a vocabulary of {} tokens, rebuilt vocabulary has {}",
                    path.display(),
                    expected,
                    tokenizer.vocabulary.size()
                );
            }
        }
        log::info!("Tokenizer configuration loaded from {}", path.display());
        Ok(tokenizer)
    }
}

fn skip(decoded: &mut Decoded, index: usize, raw: &str, error: TokenError) {
    log::warn!("Skipping token {}: {}", index, error);
    decoded.skipped.push(SkippedToken {
        index,
        token: raw.to_string(),
        error,
    });
}

fn note_from_fields(raw: &str, fields: &NoteFields, start_time: f64) -> std::result::Result<Note, TokenError> {
    let pitch = name_to_pitch(&fields.pitch).ok_or_else(|| TokenError::UnknownPitch {
        token: raw.to_string(),
        pitch: fields.pitch.clone(),
    })?;
    let velocity = dynamic_to_velocity(&fields.dynamic).ok_or_else(|| TokenError::UnknownDynamic {
        token: raw.to_string(),
        dynamic: fields.dynamic.clone(),
    })?;
    let beats = duration_name_to_beats(&fields.duration);

    Ok(Note::with_names(
        pitch,
        start_time,
        start_time + beats,
        velocity,
        fields.pitch.clone(),
        fields.duration.clone(),
        fields.dynamic.clone(),
    ))
}
