use std::fmt;

use serde::{Serialize, Serializer};
use smt_core::Note;

/// Triad quality of an arpeggiated span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordQuality {
    Major,
    Minor,
    Diminished,
    Augmented,
    Unknown,
}

impl ChordQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChordQuality::Major => "major",
            ChordQuality::Minor => "minor",
            ChordQuality::Diminished => "diminished",
            ChordQuality::Augmented => "augmented",
            ChordQuality::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Up when the intervals sum to a rise, down otherwise (a flat line
    /// counts as down).
    pub fn of_intervals(intervals: &[i32]) -> Self {
        if intervals.iter().sum::<i32>() > 0 {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    ScaleUp,
    ScaleDown,
    Arpeggio(ChordQuality),
    Sequence,
    LeapUp,
    LeapDown,
}

impl PatternKind {
    /// Textual tag, e.g. `scale_up` or `arpeggio_major`.
    pub fn pattern_type(&self) -> String {
        match self {
            PatternKind::ScaleUp => "scale_up".to_string(),
            PatternKind::ScaleDown => "scale_down".to_string(),
            PatternKind::Arpeggio(quality) => format!("arpeggio_{}", quality.as_str()),
            PatternKind::Sequence => "sequence".to_string(),
            PatternKind::LeapUp => "leap_up".to_string(),
            PatternKind::LeapDown => "leap_down".to_string(),
        }
    }

    /// `PATTERN_{TAG}` token for this kind.
    pub fn token(&self) -> String {
        format!("PATTERN_{}", self.pattern_type().to_uppercase())
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern_type())
    }
}

impl Serialize for PatternKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.pattern_type())
    }
}

/// A classified, contiguous span of a melody.
///
/// `start_index` and `end_index` are inclusive indices into the note slice
/// the detector was run on; `notes` holds copies of that span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pattern {
    #[serde(rename = "pattern_type")]
    pub kind: PatternKind,
    pub start_index: usize,
    pub end_index: usize,
    pub confidence: f64,
    pub description: String,
    pub notes: Vec<Note>,
}

impl Pattern {
    pub fn new(
        kind: PatternKind,
        start_index: usize,
        notes: &[Note],
        confidence: f64,
        description: impl Into<String>,
    ) -> Self {
        Pattern {
            kind,
            start_index,
            end_index: start_index + notes.len().saturating_sub(1),
            confidence: confidence.clamp(0.0, 1.0),
            description: description.into(),
            notes: notes.to_vec(),
        }
    }

    pub fn pattern_type(&self) -> String {
        self.kind.pattern_type()
    }

    pub fn len(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// True when the two index ranges share at least one note.
    pub fn overlaps(&self, other: &Pattern) -> bool {
        self.start_index <= other.end_index && other.start_index <= self.end_index
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.notes.iter().map(|n| n.pitch_name.as_str()).collect();
        writeln!(f, "{}", self.description)?;
        writeln!(f, "    Type: {}", self.kind)?;
        writeln!(
            f,
            "    Position: notes {}-{}",
            self.start_index + 1,
            self.end_index + 1
        )?;
        writeln!(f, "    Confidence: {:.2}", self.confidence)?;
        write!(f, "    Notes: {}", names.join(" -> "))
    }
}

/// Human-readable summary of a detection run, one block per pattern.
pub fn format_analysis(notes: &[Note], patterns: &[Pattern]) -> String {
    let mut out = format!(
        "Pattern analysis for melody with {} notes:\nDetected {} patterns:\n",
        notes.len(),
        patterns.len()
    );
    if patterns.is_empty() {
        out.push_str("  No significant patterns detected.\n");
        return out;
    }
    for (i, pattern) in patterns.iter().enumerate() {
        out.push_str(&format!("\n  Pattern {}: {}\n", i + 1, pattern));
    }
    out
}
