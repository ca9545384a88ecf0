//! Windowed pattern detection.
//!
//! Every detector family scans the melody independently and proposes
//! candidate spans. Candidates below the confidence threshold are dropped,
//! then overlaps are resolved greedily: highest confidence first, keeping a
//! span only if none of its notes is already claimed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use smt_core::{ConfigError, Note};

use crate::pattern::{ChordQuality, Direction, Pattern, PatternKind};

/// Local score a window needs before it becomes a candidate at all.
const CANDIDATE_FLOOR: f64 = 0.6;

const SEQUENCE_BLOCK_SIZES: std::ops::RangeInclusive<usize> = 2..=4;

const LEAP_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub min_pattern_length: usize,
    pub max_pattern_length: usize,
    pub sequence_min_repetitions: usize,
    pub confidence_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            min_pattern_length: 3,
            max_pattern_length: 8,
            sequence_min_repetitions: 2,
            confidence_threshold: 0.7,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_pattern_length == 0 {
            return Err(ConfigError::invalid_value(
                "min_pattern_length",
                "must be at least 1",
            ));
        }
        if self.max_pattern_length < self.min_pattern_length {
            return Err(ConfigError::invalid_value(
                "max_pattern_length",
                format!(
                    "{} is smaller than min_pattern_length {}",
                    self.max_pattern_length, self.min_pattern_length
                ),
            ));
        }
        if self.sequence_min_repetitions == 0 {
            return Err(ConfigError::invalid_value(
                "sequence_min_repetitions",
                "must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::invalid_value(
                "confidence_threshold",
                format!("{} is outside 0.0..=1.0", self.confidence_threshold),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    config: DetectorConfig,
}

impl PatternDetector {
    pub fn new(config: DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(PatternDetector { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect, filter and de-overlap patterns in a monophonic melody.
    ///
    /// Melodies shorter than `min_pattern_length` yield no patterns.
    pub fn detect_patterns(&self, notes: &[Note]) -> Vec<Pattern> {
        if notes.len() < self.config.min_pattern_length {
            return Vec::new();
        }

        let mut patterns = self.detect_scales(notes);
        patterns.extend(self.detect_arpeggios(notes));
        patterns.extend(self.detect_sequences(notes));
        patterns.extend(detect_leaps(notes));
        log::debug!("{} candidate patterns before filtering", patterns.len());

        patterns.retain(|p| p.confidence >= self.config.confidence_threshold);
        let resolved = resolve_overlaps(patterns);
        log::debug!("{} patterns after overlap resolution", resolved.len());
        resolved
    }

    pub fn detect_scales(&self, notes: &[Note]) -> Vec<Pattern> {
        self.scan_windows(notes, self.config.min_pattern_length, analyze_scale)
    }

    pub fn detect_arpeggios(&self, notes: &[Note]) -> Vec<Pattern> {
        self.scan_windows(notes, self.config.min_pattern_length.max(3), analyze_arpeggio)
    }

    /// Every start index and every length from `min_length` up to
    /// `max_pattern_length` that fits in the melody.
    fn scan_windows(
        &self,
        notes: &[Note],
        min_length: usize,
        analyze: fn(&[Note], usize) -> Option<Pattern>,
    ) -> Vec<Pattern> {
        let max_length = self.config.max_pattern_length.min(notes.len());
        if notes.len() < min_length {
            return Vec::new();
        }

        let mut patterns = Vec::new();
        for start in 0..=notes.len() - min_length {
            for length in min_length..=max_length {
                if start + length > notes.len() {
                    break;
                }
                if let Some(pattern) = analyze(&notes[start..start + length], start) {
                    if pattern.confidence >= CANDIDATE_FLOOR {
                        patterns.push(pattern);
                    }
                }
            }
        }
        patterns
    }

    /// Transposed repetitions of 2 to 4 note blocks.
    pub fn detect_sequences(&self, notes: &[Note]) -> Vec<Pattern> {
        let mut patterns = Vec::new();
        for size in SEQUENCE_BLOCK_SIZES {
            if notes.len() < size * 2 {
                continue;
            }
            for start in 0..=notes.len() - size * 2 {
                if let Some(pattern) = self.find_sequence(notes, start, size) {
                    patterns.push(pattern);
                }
            }
        }
        patterns
    }

    fn find_sequence(&self, notes: &[Note], start: usize, size: usize) -> Option<Pattern> {
        let profile = intervals(&notes[start..start + size]);

        let mut repetitions = 1;
        let mut pos = start + size;
        while pos + size <= notes.len() && intervals(&notes[pos..pos + size]) == profile {
            repetitions += 1;
            pos += size;
        }

        if repetitions < self.config.sequence_min_repetitions {
            return None;
        }

        let end = start + repetitions * size;
        let confidence = (0.5 + (repetitions as f64 - 2.0) * 0.15).min(0.9);
        Some(Pattern::new(
            PatternKind::Sequence,
            start,
            &notes[start..end],
            confidence,
            format!("Melodic sequence repeated {} times", repetitions),
        ))
    }
}

/// A large leap (more than 4 semitones) answered by a step.
pub fn detect_leaps(notes: &[Note]) -> Vec<Pattern> {
    notes
        .windows(3)
        .enumerate()
        .filter_map(|(i, triple)| {
            let first = triple[1].pitch as i32 - triple[0].pitch as i32;
            let second = triple[2].pitch as i32 - triple[1].pitch as i32;
            if first.abs() <= 4 || second.abs() > 2 {
                return None;
            }
            let (kind, direction) = if first > 0 {
                (PatternKind::LeapUp, Direction::Up)
            } else {
                (PatternKind::LeapDown, Direction::Down)
            };
            Some(Pattern::new(
                kind,
                i,
                triple,
                LEAP_CONFIDENCE,
                format!("Leap {} followed by step", direction.as_str()),
            ))
        })
        .collect()
}

fn intervals(notes: &[Note]) -> Vec<i32> {
    notes
        .windows(2)
        .map(|pair| pair[1].pitch as i32 - pair[0].pitch as i32)
        .collect()
}

fn ratio(intervals: &[i32], matches: impl Fn(i32) -> bool) -> f64 {
    let hits = intervals.iter().filter(|&&i| matches(i)).count();
    hits as f64 / intervals.len() as f64
}

fn analyze_scale(segment: &[Note], start: usize) -> Option<Pattern> {
    if segment.len() < 3 {
        return None;
    }
    let steps = intervals(segment);
    let stepwise = ratio(&steps, |i| i.abs() <= 2);
    if stepwise < 0.8 {
        return None;
    }

    let direction = Direction::of_intervals(&steps);
    let kind = match direction {
        Direction::Up => PatternKind::ScaleUp,
        Direction::Down => PatternKind::ScaleDown,
    };
    let bonus = if segment.len() >= 5 { 0.2 } else { 0.0 };

    Some(Pattern::new(
        kind,
        start,
        segment,
        stepwise * 0.8 + bonus,
        format!(
            "Scale passage ({}) with {} notes",
            direction.as_str(),
            segment.len()
        ),
    ))
}

fn analyze_arpeggio(segment: &[Note], start: usize) -> Option<Pattern> {
    if segment.len() < 3 {
        return None;
    }
    let steps = intervals(segment);
    let chordal = ratio(&steps, |i| (3..=5).contains(&i.abs()));
    if chordal < 0.6 {
        return None;
    }

    let pitches: Vec<u8> = segment.iter().map(|n| n.pitch).collect();
    let quality = classify_chord(&pitches);
    let direction = Direction::of_intervals(&steps);
    let bonus = if segment.len() >= 4 { 0.3 } else { 0.0 };

    Some(Pattern::new(
        PatternKind::Arpeggio(quality),
        start,
        segment,
        chordal * 0.7 + bonus,
        format!(
            "Arpeggio ({}, {}) with {} notes",
            quality.as_str(),
            direction.as_str(),
            segment.len()
        ),
    ))
}

/// Triad quality of a pitch collection, measured from its first pitch.
///
/// The pitch classes relative to the first note are tested against the
/// major, minor, diminished and augmented triads in that order; the first
/// triad fully contained wins.
pub fn classify_chord(pitches: &[u8]) -> ChordQuality {
    let Some(&root) = pitches.first() else {
        return ChordQuality::Unknown;
    };
    if pitches.len() < 3 {
        return ChordQuality::Unknown;
    }

    let classes: BTreeSet<i32> = pitches
        .iter()
        .map(|&p| (p as i32 - root as i32).rem_euclid(12))
        .collect();
    let has = |triad: [i32; 3]| triad.iter().all(|pc| classes.contains(pc));

    if has([0, 4, 7]) {
        ChordQuality::Major
    } else if has([0, 3, 7]) {
        ChordQuality::Minor
    } else if has([0, 3, 6]) {
        ChordQuality::Diminished
    } else if has([0, 4, 8]) {
        ChordQuality::Augmented
    } else {
        ChordQuality::Unknown
    }
}

/// Keep the most confident patterns whose spans do not share any note.
///
/// Greedy, not globally optimal. Equal confidences keep their input order.
pub fn resolve_overlaps(mut patterns: Vec<Pattern>) -> Vec<Pattern> {
    patterns.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut resolved: Vec<Pattern> = Vec::new();
    for pattern in patterns {
        if resolved.iter().all(|kept| !kept.overlaps(&pattern)) {
            resolved.push(pattern);
        }
    }
    resolved
}

/// `PATTERN_*` tokens for the given patterns, in order.
pub fn pattern_tokens(patterns: &[Pattern]) -> Vec<String> {
    patterns.iter().map(|p| p.kind.token()).collect()
}
