use crate::note::{beats_to_duration_name, pitch_to_name, velocity_to_dynamic, Note};

/// Snap note timings to a grid of `grid` subdivisions per whole note.
///
/// Starts round to the nearest grid line; durations round the same way but
/// never drop below one grid unit. The duration name is recomputed from the
/// quantized length, and empty pitch or dynamic names are filled in from the
/// note's numbers. Applying this twice with the same grid changes nothing.
pub fn quantize_notes(notes: &[Note], grid: u32) -> Vec<Note> {
    let unit = 4.0 / grid.max(1) as f64;

    notes
        .iter()
        .map(|note| {
            let start = (note.start_time / unit).round() * unit;
            let duration = ((note.duration() / unit).round() * unit).max(unit);

            let pitch_name = if note.pitch_name.is_empty() {
                pitch_to_name(note.pitch)
            } else {
                note.pitch_name.clone()
            };
            let dynamic_name = if note.dynamic_name.is_empty() {
                velocity_to_dynamic(note.velocity).to_string()
            } else {
                note.dynamic_name.clone()
            };

            Note {
                pitch: note.pitch,
                start_time: start,
                end_time: start + duration,
                velocity: note.velocity,
                pitch_name,
                duration_name: beats_to_duration_name(duration)
                    .unwrap_or("quarter")
                    .to_string(),
                dynamic_name,
            }
        })
        .collect()
}
