//! MIDI adapter for the Smart Melody Tokenizer
//!
//! Reads MIDI files into beat-timed notes, writes notes back out, and wires
//! both ends to a [`smt_core::Tokenizer`].

pub mod convert;
pub mod midi;
pub mod report;

// Re-export main entry points for convenience
pub use convert::{decode_to_midi_file, encode_midi_file};
pub use midi::{load, parse, read, save, MidiMelody, DEFAULT_TEMPO_BPM, TICKS_PER_BEAT};
pub use report::{describe_melody, describe_tokens};
