use midi_to_smt::{decode_to_midi_file, encode_midi_file, load, read, save};
use smt_core::{Note, Tokenizer};

fn melody() -> Vec<Note> {
    vec![
        Note::new(60, 0.0, 1.0, 80),
        Note::new(64, 1.0, 1.5, 100),
        Note::new(67, 2.0, 4.0, 60),
        Note::new(72, 4.0, 5.0, 30),
    ]
}

#[test]
fn save_then_load_preserves_notes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("melody.mid");

    save(&melody(), &path, 100.0).unwrap();
    let loaded = read(&path, 0).unwrap();

    assert_eq!(loaded.instruments, 1);
    assert_eq!(loaded.ticks_per_beat, 480);
    assert_eq!(loaded.track_name.as_deref(), Some("Generated Melody"));
    assert!((loaded.tempo_bpm - 100.0).abs() < 1e-3);

    assert_eq!(loaded.notes.len(), 4);
    for (original, back) in melody().iter().zip(&loaded.notes) {
        assert_eq!(back.pitch, original.pitch);
        assert_eq!(back.start_time, original.start_time);
        assert_eq!(back.end_time, original.end_time);
        assert_eq!(back.velocity, original.velocity);
        assert_eq!(back.pitch_name, original.pitch_name);
        assert_eq!(back.duration_name, original.duration_name);
    }
}

#[test]
fn missing_track_falls_back_to_first() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("melody.mid");
    save(&melody(), &path, 120.0).unwrap();

    let notes = load(&path, 7).unwrap();
    assert_eq!(notes.len(), 4);
}

#[test]
fn file_without_notes_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.mid");
    save(&[], &path, 120.0).unwrap();

    let err = load(&path, 0).unwrap_err();
    assert!(format!("{:#}", err).contains("No instruments found in MIDI file"));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load(&dir.path().join("nope.mid"), 0).is_err());
}

#[test]
fn encode_and_decode_through_midi_files() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.mid");
    let rendered = dir.path().join("rendered.mid");
    save(&melody(), &source, 120.0).unwrap();

    let tokenizer = Tokenizer::default();
    let encoded = encode_midi_file(&tokenizer, &source, 0).unwrap();
    assert_eq!(encoded.metadata.num_notes, 4);
    assert_eq!(
        encoded.metadata.source.as_deref(),
        Some(source.display().to_string().as_str())
    );
    assert!(encoded.tokens.contains(&"REST_eighth".to_string()));

    let decoded = decode_to_midi_file(&tokenizer, &encoded.tokens, &rendered, 120.0).unwrap();
    assert_eq!(decoded.len(), 4);

    let reloaded = load(&rendered, 0).unwrap();
    let pitches: Vec<u8> = reloaded.iter().map(|n| n.pitch).collect();
    assert_eq!(pitches, vec![60, 64, 67, 72]);
    let starts: Vec<f64> = reloaded.iter().map(|n| n.start_time).collect();
    assert_eq!(starts, vec![0.0, 1.0, 2.0, 4.0]);
}

#[test]
fn decoding_nothing_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nothing.mid");
    let tokenizer = Tokenizer::default();

    let notes = decode_to_midi_file(&tokenizer, &["[BOS]", "[EOS]"], &path, 120.0).unwrap();
    assert!(notes.is_empty());
    assert!(!path.exists());
}
