use anyhow::{bail, Context, Result};
use midly::{
    num::{u15, u24, u28, u4, u7},
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};
use smt_core::Note;
use std::collections::{HashMap, VecDeque};
use std::path::Path;

/// Resolution of files written by [`save`].
pub const TICKS_PER_BEAT: u16 = 480;

pub const DEFAULT_TEMPO_BPM: f64 = 120.0;

const MELODY_TRACK_NAME: &str = "Generated Melody";

/// Notes of one instrument plus the file-level facts around them.
#[derive(Debug, Clone)]
pub struct MidiMelody {
    pub notes: Vec<Note>,
    pub tempo_bpm: f64,
    pub ticks_per_beat: u16,
    /// Tracks that contain at least one note.
    pub instruments: usize,
    /// Index into the instruments that `notes` came from.
    pub instrument_index: usize,
    pub track_name: Option<String>,
}

struct Instrument {
    notes: Vec<Note>,
    name: Option<String>,
}

/// Load the notes of one instrument, sorted by start time.
pub fn load(path: &Path, track_index: usize) -> Result<Vec<Note>> {
    Ok(read(path, track_index)?.notes)
}

pub fn read(path: &Path, track_index: usize) -> Result<MidiMelody> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read MIDI file: {}", path.display()))?;
    let melody = parse(&data, track_index)
        .with_context(|| format!("Error loading MIDI file {}", path.display()))?;
    log::info!(
        "Loaded {} notes from {}",
        melody.notes.len(),
        path.display()
    );
    Ok(melody)
}

/// Parse an in-memory Standard MIDI File.
///
/// Every track with notes counts as an instrument. An out-of-range
/// `track_index` falls back to the first instrument.
pub fn parse(data: &[u8], track_index: usize) -> Result<MidiMelody> {
    let smf = Smf::parse(data).context("Failed to parse MIDI file")?;

    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(tpb) => tpb.as_int(),
        Timing::Timecode(fps, subframe) => {
            // Approximate ticks per beat for timecode-based files
            (fps.as_f32() * subframe as f32 * 4.0) as u16
        }
    }
    .max(1);

    let mut instruments: Vec<Instrument> = smf
        .tracks
        .iter()
        .map(|track| collect_notes(track, ticks_per_beat as f64))
        .filter(|instrument| !instrument.notes.is_empty())
        .collect();

    if instruments.is_empty() {
        bail!("No instruments found in MIDI file");
    }

    let count = instruments.len();
    let instrument_index = if track_index < count {
        track_index
    } else {
        log::warn!("Track {} not found, using track 0", track_index);
        0
    };
    let Instrument { mut notes, name } = instruments.swap_remove(instrument_index);
    notes.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    Ok(MidiMelody {
        notes,
        tempo_bpm: tempo_bpm(&smf),
        ticks_per_beat,
        instruments: count,
        instrument_index,
        track_name: name,
    })
}

fn tempo_bpm(smf: &Smf) -> f64 {
    for track in &smf.tracks {
        for event in track {
            if let TrackEventKind::Meta(MetaMessage::Tempo(tempo)) = event.kind {
                return 60_000_000.0 / tempo.as_int().max(1) as f64;
            }
        }
    }
    DEFAULT_TEMPO_BPM
}

/// Pair note-ons with note-offs per channel and key, first in first out.
fn collect_notes(track: &[TrackEvent], ticks_per_beat: f64) -> Instrument {
    let mut tick: u64 = 0;
    let mut sounding: HashMap<(u8, u8), VecDeque<(u64, u8)>> = HashMap::new();
    let mut notes = Vec::new();
    let mut name = None;

    for event in track {
        tick += event.delta.as_int() as u64;

        match event.kind {
            TrackEventKind::Midi { channel, message } => {
                let (key, on_velocity) = match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        (key.as_int(), Some(vel.as_int()))
                    }
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        (key.as_int(), None)
                    }
                    _ => continue,
                };
                let slot = sounding.entry((channel.as_int(), key)).or_default();

                match on_velocity {
                    Some(velocity) => slot.push_back((tick, velocity)),
                    None => {
                        let Some((start, velocity)) = slot.pop_front() else {
                            continue;
                        };
                        if tick > start {
                            notes.push(Note::new(
                                key,
                                start as f64 / ticks_per_beat,
                                tick as f64 / ticks_per_beat,
                                velocity,
                            ));
                        }
                    }
                }
            }
            TrackEventKind::Meta(MetaMessage::TrackName(raw)) => {
                if let Ok(text) = std::str::from_utf8(raw) {
                    let cleaned = text.trim_end_matches('\0').trim();
                    if !cleaned.is_empty() {
                        name = Some(cleaned.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    let dangling: usize = sounding.values().map(VecDeque::len).sum();
    if dangling > 0 {
        log::warn!("Dropping {} notes without a note-off", dangling);
    }

    Instrument { notes, name }
}

/// Write `notes` as a format 1 file: a tempo track and one melody track.
pub fn save(notes: &[Note], path: &Path, tempo_bpm: f64) -> Result<()> {
    let smf = to_smf(notes, tempo_bpm)?;
    let mut buf = Vec::new();
    smf.write(&mut buf)
        .map_err(|e| anyhow::anyhow!("Failed to encode MIDI data: {}", e))?;
    std::fs::write(path, &buf)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Saved {} notes to {}", notes.len(), path.display());
    Ok(())
}

pub fn to_smf(notes: &[Note], tempo_bpm: f64) -> Result<Smf<'static>> {
    if !(tempo_bpm.is_finite() && tempo_bpm > 0.0) {
        bail!("Tempo must be a positive number of BPM, got {}", tempo_bpm);
    }

    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_BEAT)),
    ));

    let micros_per_beat = (60_000_000.0 / tempo_bpm).round().clamp(1.0, 16_777_215.0) as u32;
    smf.tracks.push(vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(micros_per_beat))),
        },
        end_of_track(0),
    ]);

    smf.tracks.push(melody_track(notes));
    Ok(smf)
}

fn melody_track(notes: &[Note]) -> Track<'static> {
    let channel = u4::new(0);
    let mut track: Track<'static> = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(MELODY_TRACK_NAME.as_bytes())),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange { program: u7::new(0) },
            },
        },
    ];

    // (tick, note-off first, message)
    let mut events: Vec<(u32, u8, MidiMessage)> = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        let key = u7::new(note.pitch.min(127));
        let start = beats_to_ticks(note.start_time);
        let end = beats_to_ticks(note.end_time).max(start + 1);
        events.push((
            start,
            1,
            MidiMessage::NoteOn {
                key,
                vel: u7::new(note.velocity.clamp(1, 127)),
            },
        ));
        events.push((end, 0, MidiMessage::NoteOff { key, vel: u7::new(0) }));
    }
    events.sort_by_key(|(tick, order, _)| (*tick, *order));

    let mut last_tick = 0;
    for (tick, _, message) in events {
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = tick;
    }

    track.push(end_of_track(0));
    track
}

fn beats_to_ticks(beats: f64) -> u32 {
    (beats.max(0.0) * TICKS_PER_BEAT as f64) as u32
}

fn end_of_track(delta: u32) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    }
}
