use serde::{Deserialize, Serialize};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Named durations in beats (quarter note = 1 beat).
pub const DURATIONS: [(&str, f64); 9] = [
    ("sixteenth", 0.25),
    ("dotted_sixteenth", 0.375),
    ("eighth", 0.5),
    ("dotted_eighth", 0.75),
    ("quarter", 1.0),
    ("dotted_quarter", 1.5),
    ("half", 2.0),
    ("dotted_half", 3.0),
    ("whole", 4.0),
];

/// Dynamic markings and the velocity each one decodes to.
pub const DYNAMICS: [(&str, u8); 6] = [
    ("pp", 25),
    ("p", 35),
    ("mp", 50),
    ("mf", 65),
    ("f", 85),
    ("ff", 100),
];

/// Maximum distance in beats for a duration to snap to a named duration.
pub const DURATION_TOLERANCE: f64 = 0.1;

/// A timed, pitched event measured in beats.
///
/// The three `*_name` fields are the human-readable labels used to build
/// compound tokens. They may be empty on notes built by hand with
/// [`Note::with_names`]; quantization fills in the missing ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub pitch: u8,
    pub start_time: f64,
    pub end_time: f64,
    pub velocity: u8,
    #[serde(default)]
    pub pitch_name: String,
    #[serde(default)]
    pub duration_name: String,
    #[serde(default)]
    pub dynamic_name: String,
}

impl Note {
    /// Create a note and derive its pitch, duration and dynamic names.
    pub fn new(pitch: u8, start_time: f64, end_time: f64, velocity: u8) -> Self {
        let duration_name = beats_to_duration_name(end_time - start_time)
            .unwrap_or("quarter")
            .to_string();
        Note {
            pitch,
            start_time,
            end_time,
            velocity,
            pitch_name: pitch_to_name(pitch),
            duration_name,
            dynamic_name: velocity_to_dynamic(velocity).to_string(),
        }
    }

    /// Create a note with explicit labels, taken as-is.
    pub fn with_names(
        pitch: u8,
        start_time: f64,
        end_time: f64,
        velocity: u8,
        pitch_name: impl Into<String>,
        duration_name: impl Into<String>,
        dynamic_name: impl Into<String>,
    ) -> Self {
        Note {
            pitch,
            start_time,
            end_time,
            velocity,
            pitch_name: pitch_name.into(),
            duration_name: duration_name.into(),
            dynamic_name: dynamic_name.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Convert a MIDI note number to a name such as "C4" or "F#5".
pub fn pitch_to_name(pitch: u8) -> String {
    let name = NOTE_NAMES[(pitch % 12) as usize];
    let octave = (pitch / 12) as i32 - 1;
    format!("{}{}", name, octave)
}

/// Parse a pitch name back to its MIDI note number.
///
/// Accepts sharps written as `#` or `s` ("C#4", "Cs4"), flats written as `b`
/// ("Db4") and negative octaves ("C-1"). Returns `None` for anything that is
/// not a pitch or falls outside 0-127.
pub fn name_to_pitch(name: &str) -> Option<u8> {
    let mut chars = name.chars();
    let base: i32 = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (shift, octave_str) = match rest.chars().next()? {
        '#' | 's' => (1, &rest[1..]),
        'b' => (-1, &rest[1..]),
        _ => (0, rest),
    };

    if octave_str.is_empty() || octave_str.starts_with('+') {
        return None;
    }
    let octave: i32 = octave_str.parse().ok()?;
    let pitch = (octave + 1) * 12 + base + shift;
    u8::try_from(pitch).ok().filter(|p| *p <= 127)
}

/// Map a MIDI velocity to a dynamic marking.
pub fn velocity_to_dynamic(velocity: u8) -> &'static str {
    match velocity {
        0..=19 => "pp",
        20..=39 => "p",
        40..=59 => "mp",
        60..=79 => "mf",
        80..=99 => "f",
        _ => "ff",
    }
}

/// Map a dynamic marking to a representative velocity.
pub fn dynamic_to_velocity(dynamic: &str) -> Option<u8> {
    DYNAMICS
        .iter()
        .find(|(name, _)| *name == dynamic)
        .map(|(_, velocity)| *velocity)
}

/// Snap a length in beats to the nearest named duration.
///
/// Returns `None` when nothing lies within [`DURATION_TOLERANCE`]; callers
/// pick their own fallback.
pub fn beats_to_duration_name(beats: f64) -> Option<&'static str> {
    let (name, value) = DURATIONS
        .iter()
        .min_by(|a, b| (a.1 - beats).abs().total_cmp(&(b.1 - beats).abs()))?;
    ((value - beats).abs() < DURATION_TOLERANCE).then_some(*name)
}

/// Length in beats of a named duration. Unknown names count as a quarter note.
pub fn duration_name_to_beats(name: &str) -> f64 {
    DURATIONS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, beats)| *beats)
        .unwrap_or(1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchSpan {
    pub min: u8,
    pub max: u8,
    pub span: u8,
}

/// Summary statistics for a melody.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MelodyStats {
    pub num_notes: usize,
    pub pitch_range: PitchSpan,
    pub total_beats: f64,
    pub avg_note_duration: f64,
    pub min_duration: f64,
    pub max_duration: f64,
    pub avg_velocity: f64,
    pub min_velocity: u8,
    pub max_velocity: u8,
    /// Notes per beat.
    pub note_density: f64,
}

impl MelodyStats {
    /// Returns `None` for an empty melody.
    pub fn from_notes(notes: &[Note]) -> Option<Self> {
        let last = notes.last()?;
        let count = notes.len() as f64;

        let min_pitch = notes.iter().map(|n| n.pitch).min()?;
        let max_pitch = notes.iter().map(|n| n.pitch).max()?;
        let durations: Vec<f64> = notes.iter().map(Note::duration).collect();
        let total_beats = last.end_time;

        Some(MelodyStats {
            num_notes: notes.len(),
            pitch_range: PitchSpan {
                min: min_pitch,
                max: max_pitch,
                span: max_pitch - min_pitch,
            },
            total_beats,
            avg_note_duration: durations.iter().sum::<f64>() / count,
            min_duration: durations.iter().copied().fold(f64::INFINITY, f64::min),
            max_duration: durations.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            avg_velocity: notes.iter().map(|n| n.velocity as f64).sum::<f64>() / count,
            min_velocity: notes.iter().map(|n| n.velocity).min()?,
            max_velocity: notes.iter().map(|n| n.velocity).max()?,
            note_density: if total_beats > 0.0 {
                count / total_beats
            } else {
                count
            },
        })
    }
}
