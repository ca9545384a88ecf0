use anyhow::Result;
use smt_core::{EncodeResult, Note, Tokenizer};
use std::path::Path;

use crate::midi;

/// Load one instrument of a MIDI file and encode it.
pub fn encode_midi_file(
    tokenizer: &Tokenizer,
    path: &Path,
    track_index: usize,
) -> Result<EncodeResult> {
    let notes = midi::load(path, track_index)?;
    Ok(tokenizer.encode_notes(&notes, &path.display().to_string()))
}

/// Decode tokens and write the notes to `path`.
///
/// Nothing is written when the tokens contain no notes.
pub fn decode_to_midi_file<S: AsRef<str>>(
    tokenizer: &Tokenizer,
    tokens: &[S],
    path: &Path,
    tempo_bpm: f64,
) -> Result<Vec<Note>> {
    let notes = tokenizer.decode_tokens(tokens);
    if notes.is_empty() {
        log::warn!("No notes decoded, not writing {}", path.display());
    } else {
        midi::save(&notes, path, tempo_bpm)?;
    }
    Ok(notes)
}
