//! Configuration values for the vocabulary and tokenizer.
//!
//! Every struct deserializes with `#[serde(default)]`, so a JSON file only
//! needs the keys it wants to override. Call `validate()` (or go through the
//! constructors that do) before using a hand-built or loaded value.

use std::collections::HashSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

/// Tokens kept free for the non-note families when capping note tokens.
pub const NOTE_RESERVE: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchRange {
    pub min_octave: i32,
    pub max_octave: i32,
    /// Chromatic (12 names per octave) when true, diatonic naturals otherwise.
    pub include_accidentals: bool,
}

impl Default for PitchRange {
    fn default() -> Self {
        PitchRange {
            min_octave: 3,
            max_octave: 6,
            include_accidentals: true,
        }
    }
}

/// A named group of pattern labels, e.g. "scales" -> ["scale_up", ...].
#[derive(Debug, Clone, PartialEq)]
pub struct PatternFamily {
    pub category: String,
    pub labels: Vec<String>,
}

/// Pattern labels grouped by category.
///
/// Serialized as a JSON object. Category order matters for token ids, so it
/// is kept as a list instead of a hash map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatternCatalog(pub Vec<PatternFamily>);

impl PatternCatalog {
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .flat_map(|family| family.labels.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.0.iter().map(|family| family.labels.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for PatternCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.0
                .iter()
                .map(|family| (&family.category, &family.labels)),
        )
    }
}

impl<'de> Deserialize<'de> for PatternCatalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CatalogVisitor;

        impl<'de> Visitor<'de> for CatalogVisitor {
            type Value = PatternCatalog;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a map of pattern category to label list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut families = Vec::new();
                while let Some((category, labels)) = map.next_entry::<String, Vec<String>>()? {
                    families.push(PatternFamily { category, labels });
                }
                Ok(PatternCatalog(families))
            }
        }

        deserializer.deserialize_map(CatalogVisitor)
    }
}

fn family(category: &str, labels: &[&str]) -> PatternFamily {
    PatternFamily {
        category: category.to_string(),
        labels: labels.iter().map(|l| l.to_string()).collect(),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabConfig {
    pub pitch_range: PitchRange,
    pub durations: Vec<String>,
    pub dynamics: Vec<String>,
    pub patterns: PatternCatalog,
    pub max_vocab_size: usize,
}

impl Default for VocabConfig {
    fn default() -> Self {
        VocabConfig {
            pitch_range: PitchRange::default(),
            durations: strings(&[
                "sixteenth",
                "eighth",
                "quarter",
                "half",
                "whole",
                "dotted_quarter",
                "dotted_half",
            ]),
            dynamics: strings(&["pp", "p", "mp", "mf", "f", "ff"]),
            patterns: PatternCatalog(vec![
                family(
                    "scales",
                    &["scale_up", "scale_down", "chromatic_up", "chromatic_down"],
                ),
                family("intervals", &["step", "skip", "leap", "octave"]),
                family(
                    "arpeggios",
                    &[
                        "arpeggio_major",
                        "arpeggio_minor",
                        "arpeggio_dim",
                        "arpeggio_aug",
                    ],
                ),
                family(
                    "rhythmic",
                    &["syncopated", "steady", "accelerando", "ritardando"],
                ),
            ]),
            max_vocab_size: 2000,
        }
    }
}

impl VocabConfig {
    /// Number of note tokens allowed before truncation.
    pub fn note_capacity(&self) -> usize {
        self.max_vocab_size.saturating_sub(NOTE_RESERVE)
    }

    /// Check that this configuration yields a vocabulary with every reserved
    /// token present.
    ///
    /// `fixed_tokens` is the count of special, structural and control tokens.
    pub fn validate(&self, fixed_tokens: usize) -> Result<(), ConfigError> {
        let PitchRange {
            min_octave,
            max_octave,
            ..
        } = self.pitch_range;
        if min_octave > max_octave || min_octave < -1 || max_octave > 9 {
            return Err(ConfigError::InvalidOctaveRange {
                min: min_octave,
                max: max_octave,
            });
        }

        for duration in &self.durations {
            check_name("duration", duration, true)?;
        }
        for dynamic in &self.dynamics {
            check_name("dynamic", dynamic, false)?;
        }
        for label in self.patterns.labels() {
            check_name("pattern", label, true)?;
        }

        // every rendered token must be unique
        check_unique("duration", self.durations.iter(), |d| {
            format!("REST_{}", d.replace('.', "_"))
        })?;
        check_unique("dynamic", self.dynamics.iter(), |d| {
            format!("NOTE_{{pitch}}_{{duration}}_{}", d)
        })?;
        check_unique("pattern", self.patterns.labels(), |l| {
            format!("PATTERN_{}", l.to_uppercase())
        })?;

        if self.max_vocab_size < NOTE_RESERVE {
            return Err(ConfigError::VocabTooSmall {
                max_vocab_size: self.max_vocab_size,
                reserve: NOTE_RESERVE,
            });
        }

        let required = fixed_tokens + self.durations.len() + self.patterns.len();
        if required > NOTE_RESERVE {
            return Err(ConfigError::ReserveExceeded {
                required,
                reserve: NOTE_RESERVE,
            });
        }

        Ok(())
    }
}

fn check_name(kind: &'static str, name: &str, allow_underscore: bool) -> Result<(), ConfigError> {
    let reason = if name.is_empty() {
        Some("empty")
    } else if name.chars().any(char::is_whitespace) {
        Some("contains whitespace")
    } else if !allow_underscore && name.contains('_') {
        Some("must not contain '_'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigError::InvalidName {
            kind,
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn check_unique<S: AsRef<str>>(
    kind: &'static str,
    names: impl IntoIterator<Item = S>,
    render: impl Fn(&str) -> String,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for name in names {
        let name = name.as_ref();
        let token = render(name);
        if !seen.insert(token.clone()) {
            return Err(ConfigError::DuplicateToken {
                kind,
                name: name.to_string(),
                token,
            });
        }
    }
    Ok(())
}

/// Timing configuration for the tokenizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Subdivisions per whole note (16 = sixteenth-note grid).
    pub quantization_grid: u32,
    /// Smallest gap in beats that still gets an explicit rest token.
    pub min_rest_duration: f64,
    /// Melodies longer than this many bars are encoded in full but logged.
    pub max_bars: usize,
    pub beats_per_bar: f64,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        TokenizerConfig {
            quantization_grid: 16,
            min_rest_duration: 0.25,
            max_bars: 32,
            beats_per_bar: 4.0,
        }
    }
}

impl TokenizerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quantization_grid == 0 {
            return Err(ConfigError::invalid_value(
                "quantization_grid",
                "must be greater than zero",
            ));
        }
        if !(self.beats_per_bar.is_finite() && self.beats_per_bar > 0.0) {
            return Err(ConfigError::invalid_value(
                "beats_per_bar",
                format!("{} is not a positive number", self.beats_per_bar),
            ));
        }
        if !(self.min_rest_duration.is_finite() && self.min_rest_duration >= 0.0) {
            return Err(ConfigError::invalid_value(
                "min_rest_duration",
                format!("{} is negative or not finite", self.min_rest_duration),
            ));
        }
        Ok(())
    }

    /// Length of one quantization step in beats.
    pub fn grid_unit(&self) -> f64 {
        4.0 / self.quantization_grid.max(1) as f64
    }
}
