//! The token alphabet and its token <-> id bijection.
//!
//! Tokens are enumerated in a fixed family order so that ids are stable for a
//! given configuration: special, structural, compound notes, rests, patterns,
//! control. Note tokens are truncated once `max_vocab_size - 200` of them
//! have been produced (pitch outermost, dynamic innermost).

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize, Serializer};

use crate::config::VocabConfig;
use crate::error::{ConfigError, Result, SmtError};
use crate::lexer::{Special, Structural, Token};
use crate::note::name_to_pitch;

const NATURALS: [&str; 7] = ["C", "D", "E", "F", "G", "A", "B"];
const CHROMATIC: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Tempo, key, time-signature, style and articulation markers.
pub const CONTROL_TOKENS: [&str; 24] = [
    "TEMPO_SLOW",
    "TEMPO_MEDIUM",
    "TEMPO_FAST",
    "TEMPO_VERY_FAST",
    "KEY_C_MAJOR",
    "KEY_G_MAJOR",
    "KEY_D_MAJOR",
    "KEY_A_MAJOR",
    "KEY_F_MAJOR",
    "KEY_BB_MAJOR",
    "KEY_A_MINOR",
    "KEY_E_MINOR",
    "KEY_D_MINOR",
    "TIME_4_4",
    "TIME_3_4",
    "TIME_2_4",
    "TIME_6_8",
    "STYLE_LEGATO",
    "STYLE_STACCATO",
    "STYLE_MARCATO",
    "ACCENT",
    "TENUTO",
    "SLUR_START",
    "SLUR_END",
];

/// Special, structural (BAR included) and control tokens.
pub const FIXED_TOKEN_COUNT: usize = Special::ALL.len() + 1 + Structural::ALL.len() + CONTROL_TOKENS.len();

#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    config: VocabConfig,
    vocab: Vec<String>,
    token_to_id: HashMap<String, u32>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Vocabulary::build(VocabConfig::default())
    }
}

impl Vocabulary {
    /// Validate `config` and enumerate its tokens.
    pub fn new(config: VocabConfig) -> std::result::Result<Self, ConfigError> {
        config.validate(FIXED_TOKEN_COUNT)?;
        Ok(Vocabulary::build(config))
    }

    fn build(config: VocabConfig) -> Self {
        let mut vocab: Vec<String> = Vec::new();

        vocab.extend(Special::ALL.iter().map(|s| s.as_str().to_string()));

        vocab.push(Token::Bar.to_string());
        vocab.extend(Structural::ALL.iter().map(|s| s.as_str().to_string()));

        let capacity = config.note_capacity();
        let mut note_count = 0;
        'notes: for pitch in pitch_names(&config) {
            for duration in &config.durations {
                for dynamic in &config.dynamics {
                    if note_count == capacity {
                        break 'notes;
                    }
                    vocab.push(Token::note(pitch.as_str(), duration, dynamic).to_string());
                    note_count += 1;
                }
            }
        }

        vocab.extend(
            config
                .durations
                .iter()
                .map(|duration| Token::Rest(duration.replace('.', "_")).to_string()),
        );

        vocab.extend(
            config
                .patterns
                .labels()
                .map(|label| Token::Pattern(label.to_uppercase()).to_string()),
        );

        vocab.extend(CONTROL_TOKENS.iter().map(|t| t.to_string()));

        let token_to_id = index_tokens(&vocab);
        log::info!("Built SMT vocabulary with {} tokens", vocab.len());

        Vocabulary {
            config,
            vocab,
            token_to_id,
        }
    }

    pub fn config(&self) -> &VocabConfig {
        &self.config
    }

    pub fn size(&self) -> usize {
        self.vocab.len()
    }

    /// Tokens in id order.
    pub fn tokens(&self) -> &[String] {
        &self.vocab
    }

    pub fn contains(&self, token: &str) -> bool {
        self.token_to_id.contains_key(token)
    }

    /// Id of `token`, or the id of `[UNK]` when it is not in the vocabulary.
    pub fn encode_token(&self, token: &str) -> u32 {
        self.token_to_id
            .get(token)
            .copied()
            .unwrap_or_else(|| self.unk_id())
    }

    /// Token for `id`, or `[UNK]` when the id is out of range.
    pub fn decode_token(&self, id: u32) -> &str {
        self.vocab
            .get(id as usize)
            .map(String::as_str)
            .unwrap_or(Special::Unk.as_str())
    }

    pub fn encode_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<u32> {
        tokens
            .iter()
            .map(|token| self.encode_token(token.as_ref()))
            .collect()
    }

    pub fn decode_tokens(&self, ids: &[u32]) -> Vec<String> {
        ids.iter()
            .map(|&id| self.decode_token(id).to_string())
            .collect()
    }

    fn special_id(&self, special: Special) -> u32 {
        // Special tokens are always enumerated first, in `Special::ALL` order.
        self.token_to_id
            .get(special.as_str())
            .copied()
            .unwrap_or(special as u32)
    }

    pub fn pad_id(&self) -> u32 {
        self.special_id(Special::Pad)
    }

    pub fn bos_id(&self) -> u32 {
        self.special_id(Special::Bos)
    }

    pub fn eos_id(&self) -> u32 {
        self.special_id(Special::Eos)
    }

    pub fn unk_id(&self) -> u32 {
        self.special_id(Special::Unk)
    }

    /// The six special tokens and their ids.
    pub fn special_tokens(&self) -> BTreeMap<&'static str, u32> {
        Special::ALL
            .iter()
            .filter_map(|special| {
                let name = special.as_str();
                self.token_to_id.get(name).map(|&id| (name, id))
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        let file = VocabularyFile {
            vocab: &self.vocab,
            token_to_id: TokenIds(&self.vocab),
            id_to_token: IdTokens(&self.vocab),
            config: &self.config,
            size: self.vocab.len(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Restore a vocabulary saved by [`Vocabulary::to_json`].
    ///
    /// The stored token list is taken verbatim; it is not rebuilt from the
    /// stored configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: LoadedVocabulary = serde_json::from_str(json)?;

        if file.size != file.vocab.len() {
            return Err(SmtError::CorruptVocabulary(format!(
                "size is {} but the token list has {} entries",
                file.size,
                file.vocab.len()
            )));
        }
        if file.token_to_id.len() != file.vocab.len() || file.id_to_token.len() != file.vocab.len() {
            return Err(SmtError::CorruptVocabulary(
                "token maps do not cover the token list".to_string(),
            ));
        }
        for (id, token) in file.vocab.iter().enumerate() {
            if file.token_to_id.get(token) != Some(&(id as u32)) {
                return Err(SmtError::CorruptVocabulary(format!(
                    "token_to_id disagrees for '{}'",
                    token
                )));
            }
            if file.id_to_token.get(&id.to_string()) != Some(token) {
                return Err(SmtError::CorruptVocabulary(format!(
                    "id_to_token disagrees for id {}",
                    id
                )));
            }
        }
        if !file.token_to_id.contains_key(Special::Unk.as_str()) {
            return Err(SmtError::CorruptVocabulary(
                "missing [UNK] token".to_string(),
            ));
        }

        Ok(Vocabulary {
            config: file.config,
            token_to_id: file.token_to_id,
            vocab: file.vocab,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| SmtError::io(path, e))?;
        log::info!("Vocabulary saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SmtError::io(path, e))?;
        let vocabulary = Vocabulary::from_json(&json)?;
        log::info!(
            "Vocabulary loaded from {} ({} tokens)",
            path.display(),
            vocabulary.size()
        );
        Ok(vocabulary)
    }
}

fn pitch_names(config: &VocabConfig) -> Vec<String> {
    let names: &[&str] = if config.pitch_range.include_accidentals {
        &CHROMATIC
    } else {
        &NATURALS
    };

    (config.pitch_range.min_octave..=config.pitch_range.max_octave)
        .flat_map(|octave| names.iter().map(move |name| format!("{}{}", name, octave)))
        // octave 9 stops at G9 (127)
        .filter(|name| name_to_pitch(name).is_some())
        .collect()
}

fn index_tokens(vocab: &[String]) -> HashMap<String, u32> {
    vocab
        .iter()
        .enumerate()
        .map(|(id, token)| (token.clone(), id as u32))
        .collect()
}

/// `{token: id}` in id order.
struct TokenIds<'a>(&'a [String]);

impl Serialize for TokenIds<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().enumerate().map(|(id, token)| (token, id)))
    }
}

/// `{"id": token}` in id order; JSON object keys must be strings.
struct IdTokens<'a>(&'a [String]);

impl Serialize for IdTokens<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.0
                .iter()
                .enumerate()
                .map(|(id, token)| (id.to_string(), token)),
        )
    }
}

#[derive(Serialize)]
struct VocabularyFile<'a> {
    vocab: &'a [String],
    token_to_id: TokenIds<'a>,
    id_to_token: IdTokens<'a>,
    config: &'a VocabConfig,
    size: usize,
}

#[derive(Deserialize)]
struct LoadedVocabulary {
    vocab: Vec<String>,
    token_to_id: HashMap<String, u32>,
    id_to_token: HashMap<String, String>,
    config: VocabConfig,
    size: usize,
}
