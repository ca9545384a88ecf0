use smt_core::{pitch_to_name, MelodyStats, Note, Special, Token};

/// Summary of a melody followed by its first `max_notes` notes.
pub fn describe_melody(notes: &[Note], max_notes: usize) -> String {
    let Some(stats) = MelodyStats::from_notes(notes) else {
        return "No notes found\n".to_string();
    };

    let mut out = String::from("Melody Information:\n");
    out.push_str(&format!("  Total notes: {}\n", stats.num_notes));
    out.push_str(&format!("  Duration: {:.1} beats\n", stats.total_beats));
    out.push_str(&format!(
        "  Pitch range: {} - {}\n",
        pitch_to_name(stats.pitch_range.min),
        pitch_to_name(stats.pitch_range.max)
    ));
    out.push_str(&format!(
        "  Note density: {:.1} notes/beat\n",
        stats.note_density
    ));

    let shown = max_notes.min(notes.len());
    out.push_str(&format!("\nFirst {} notes:\n", shown));
    for (i, note) in notes.iter().take(shown).enumerate() {
        out.push_str(&format!(
            "  {:2}: {:4} {:14} {:2} (t={:.2}-{:.2})\n",
            i + 1,
            note.pitch_name,
            note.duration_name,
            note.dynamic_name,
            note.start_time,
            note.end_time
        ));
    }
    if notes.len() > shown {
        out.push_str(&format!("  ... and {} more notes\n", notes.len() - shown));
    }
    out
}

/// One line per token with what it means, then a count of notes and bars.
pub fn describe_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut out = String::new();
    let mut bars = 0;
    let mut notes = 0;

    for (i, raw) in tokens.iter().enumerate() {
        let raw = raw.as_ref();
        let meaning = match Token::parse(raw) {
            Token::Special(Special::Bos) => "Start of sequence".to_string(),
            Token::Special(Special::Eos) => "End of sequence".to_string(),
            Token::Bar => {
                bars += 1;
                format!("Bar {}", bars)
            }
            Token::Note(fields) => {
                notes += 1;
                format!(
                    "Note {}: {} {} {}",
                    notes, fields.pitch, fields.duration, fields.dynamic
                )
            }
            Token::Rest(duration) => format!("Rest ({})", duration),
            Token::Pattern(label) => {
                format!("Pattern: {}", label.replace('_', " ").to_lowercase())
            }
            _ => String::new(),
        };

        if meaning.is_empty() {
            out.push_str(&format!("{:3}: {}\n", i, raw));
        } else {
            out.push_str(&format!("{:3}: {:28} <- {}\n", i, raw, meaning));
        }
    }

    out.push_str(&format!(
        "\nSummary: {} notes, {} bars, {} total tokens\n",
        notes,
        bars,
        tokens.len()
    ));
    out
}
