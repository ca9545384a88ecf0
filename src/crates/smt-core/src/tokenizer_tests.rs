// Encode/decode behaviour of the tokenizer over whole melodies

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::config::{TokenizerConfig, VocabConfig};
    use crate::error::TokenError;
    use crate::note::{Note, DYNAMICS};
    use crate::quantize::quantize_notes;
    use crate::tokenizer::{SampleStyle, Tokenizer};

    fn quarter(pitch: u8, start: f64) -> Note {
        Note::new(pitch, start, start + 1.0, 65)
    }

    fn strs(tokens: &[String]) -> Vec<&str> {
        tokens.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_encode_simple_melody() {
        let tokenizer = Tokenizer::default();
        let notes = vec![
            quarter(60, 0.0),
            quarter(62, 1.0),
            Note::new(64, 2.0, 3.5, 90),
        ];
        let result = tokenizer.encode_notes(&notes, "test.mid");

        assert_eq!(
            strs(&result.tokens),
            vec![
                "[BOS]",
                "NOTE_C4_quarter_mf",
                "NOTE_D4_quarter_mf",
                "NOTE_E4_dotted_quarter_f",
                "[EOS]",
            ]
        );
        assert_eq!(result.token_ids.len(), result.tokens.len());
        assert_eq!(result.token_ids[0], tokenizer.vocabulary().bos_id());
        assert_eq!(result.notes.len(), 3);
    }

    #[test]
    fn test_encode_metadata() {
        let tokenizer = Tokenizer::default();
        let notes = vec![quarter(60, 0.0), quarter(64, 2.0)];
        let result = tokenizer.encode_notes(&notes, "melody.mid");
        let meta = &result.metadata;

        assert_eq!(meta.num_notes, 2);
        assert_eq!(meta.duration, 3.0);
        assert_eq!(meta.num_tokens, Some(5));
        assert_eq!(meta.compression_ratio, Some(0.4));
        assert_eq!(meta.source.as_deref(), Some("melody.mid"));
        let range = meta.pitch_range.unwrap();
        assert_eq!((range.min, range.max), (60, 64));
    }

    #[test]
    fn test_gap_produces_single_rest() {
        let tokenizer = Tokenizer::default();
        let notes = vec![quarter(60, 0.0), quarter(64, 2.0)];
        let tokens = tokenizer.encode_notes(&notes, "").tokens;

        assert_eq!(
            strs(&tokens),
            vec![
                "[BOS]",
                "NOTE_C4_quarter_mf",
                "REST_quarter",
                "NOTE_E4_quarter_mf",
                "[EOS]",
            ]
        );
        assert_eq!(tokens.iter().filter(|t| t.starts_with("REST_")).count(), 1);
    }

    #[test]
    fn test_bar_before_each_new_bar() {
        let tokenizer = Tokenizer::default();
        let notes = vec![quarter(60, 0.0), quarter(62, 4.0), quarter(64, 8.0)];
        let tokens = tokenizer.encode_notes(&notes, "").tokens;

        assert_eq!(
            strs(&tokens),
            vec![
                "[BOS]",
                "NOTE_C4_quarter_mf",
                "BAR",
                "REST_dotted_half",
                "NOTE_D4_quarter_mf",
                "BAR",
                "REST_dotted_half",
                "NOTE_E4_quarter_mf",
                "[EOS]",
            ]
        );
    }

    #[test]
    fn test_rest_across_bar_line_measured_from_previous_note() {
        let tokenizer = Tokenizer::default();
        let notes = vec![quarter(60, 0.0), quarter(62, 4.0)];
        let tokens = tokenizer.encode_notes(&notes, "").tokens;

        assert_eq!(
            strs(&tokens),
            vec![
                "[BOS]",
                "NOTE_C4_quarter_mf",
                "BAR",
                "REST_dotted_half",
                "NOTE_D4_quarter_mf",
                "[EOS]",
            ]
        );

        // no gap at the bar line, no rest
        let legato = vec![Note::new(60, 0.0, 4.0, 65), quarter(62, 4.0)];
        let tokens = tokenizer.encode_notes(&legato, "").tokens;
        assert_eq!(
            strs(&tokens),
            vec![
                "[BOS]",
                "NOTE_C4_whole_mf",
                "BAR",
                "NOTE_D4_quarter_mf",
                "[EOS]",
            ]
        );
    }

    #[test]
    fn test_empty_melody() {
        let tokenizer = Tokenizer::default();
        let result = tokenizer.encode_notes(&[], "empty.mid");

        assert_eq!(strs(&result.tokens), vec!["[BOS]", "[EOS]"]);
        assert_eq!(
            result.token_ids,
            vec![
                tokenizer.vocabulary().bos_id(),
                tokenizer.vocabulary().eos_id()
            ]
        );
        assert_eq!(result.metadata.num_notes, 0);
        assert_eq!(result.metadata.duration, 0.0);
        assert!(result.metadata.num_tokens.is_none());
        assert!(result.notes.is_empty());

        let json = serde_json::to_value(&result.metadata).unwrap();
        assert_eq!(json, serde_json::json!({"num_notes": 0, "duration": 0.0}));
    }

    #[test]
    fn test_short_gaps_get_no_rest() {
        let tokenizer = Tokenizer::default();
        // 0.1 beats quantizes away entirely
        let notes = vec![quarter(60, 0.0), quarter(62, 1.1)];
        let tokens = tokenizer.encode_notes(&notes, "").tokens;
        assert!(!tokens.iter().any(|t| t.starts_with("REST_")));

        let sixteenth_gap = vec![quarter(60, 0.0), quarter(62, 1.25)];
        let tokens = tokenizer.encode_notes(&sixteenth_gap, "").tokens;
        assert!(tokens.contains(&"REST_sixteenth".to_string()));
    }

    #[test]
    fn test_min_rest_duration_suppresses_rests() {
        let config = TokenizerConfig {
            min_rest_duration: 0.5,
            ..TokenizerConfig::default()
        };
        let tokenizer = Tokenizer::new(VocabConfig::default(), config).unwrap();

        let notes = vec![quarter(60, 0.0), quarter(62, 1.25)];
        let tokens = tokenizer.encode_notes(&notes, "").tokens;
        assert!(!tokens.iter().any(|t| t.starts_with("REST_")));

        let notes = vec![quarter(60, 0.0), quarter(62, 1.5)];
        let tokens = tokenizer.encode_notes(&notes, "").tokens;
        assert!(tokens.contains(&"REST_eighth".to_string()));
    }

    #[test]
    fn test_unnamed_gap_falls_back_to_sixteenth_rest() {
        let tokenizer = Tokenizer::default();
        // 2.5 beats is no named duration
        let notes = vec![Note::new(60, 0.0, 0.5, 65), quarter(62, 3.0)];
        let tokens = tokenizer.encode_notes(&notes, "").tokens;
        assert!(tokens.contains(&"REST_sixteenth".to_string()));
    }

    #[test]
    fn test_out_of_vocabulary_note_encodes_to_unk() {
        let tokenizer = Tokenizer::default();
        // B6 lies past the note-token cap of the default vocabulary
        let result = tokenizer.encode_notes(&[quarter(95, 0.0)], "");
        assert_eq!(result.tokens[1], "NOTE_B6_quarter_mf");
        assert_eq!(result.token_ids[1], tokenizer.vocabulary().unk_id());
    }

    #[test]
    fn test_decode_tokens() {
        let tokenizer = Tokenizer::default();
        let tokens = [
            "[BOS]",
            "NOTE_C4_quarter_mf",
            "REST_half",
            "NOTE_G4_dotted_quarter_ff",
            "[EOS]",
        ];
        let notes = tokenizer.decode_tokens(&tokens);

        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].pitch, 60);
        assert_eq!(notes[0].start_time, 0.0);
        assert_eq!(notes[0].end_time, 1.0);
        assert_eq!(notes[0].velocity, 65);

        assert_eq!(notes[1].pitch, 67);
        assert_eq!(notes[1].start_time, 3.0);
        assert_eq!(notes[1].end_time, 4.5);
        assert_eq!(notes[1].velocity, 100);
        assert_eq!(notes[1].duration_name, "dotted_quarter");
    }

    #[test]
    fn test_decode_bar_resyncs_time() {
        let tokenizer = Tokenizer::default();
        let tokens = ["NOTE_C4_eighth_mf", "BAR", "BAR", "NOTE_D4_quarter_mf"];
        let notes = tokenizer.decode_tokens(&tokens);
        assert_eq!(notes[1].start_time, 8.0);
    }

    #[test]
    fn test_decode_ignores_non_timing_tokens() {
        let tokenizer = Tokenizer::default();
        let tokens = [
            "[BOS]",
            "PATTERN_SCALE_UP",
            "KEY_C_MAJOR",
            "VERSE",
            "GARBAGE",
            "NOTE_C4_quarter_mf",
            "[EOS]",
        ];
        let decoded = tokenizer.decode_detailed(&tokens);
        assert_eq!(decoded.notes.len(), 1);
        assert_eq!(decoded.notes[0].start_time, 0.0);
        assert!(decoded.skipped.is_empty());
    }

    #[test]
    fn test_decode_skips_bad_note_tokens() {
        let tokenizer = Tokenizer::default();
        let tokens = [
            "[BOS]",
            "NOTE_C4_quarter",
            "NOTE_H4_quarter_mf",
            "NOTE_C4_quarter_fff",
            "NOTE_D4_half_p",
            "[EOS]",
        ];
        let decoded = tokenizer.decode_detailed(&tokens);

        assert_eq!(decoded.notes.len(), 1);
        assert_eq!(decoded.notes[0].pitch, 62);
        assert_eq!(decoded.notes[0].start_time, 0.0);

        let indices: Vec<usize> = decoded.skipped.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert!(matches!(
            decoded.skipped[0].error,
            TokenError::MalformedNote { .. }
        ));
        assert!(matches!(
            decoded.skipped[1].error,
            TokenError::UnknownPitch { .. }
        ));
        assert!(matches!(
            decoded.skipped[2].error,
            TokenError::UnknownDynamic { .. }
        ));
        assert_eq!(decoded.skipped[2].error.token(), "NOTE_C4_quarter_fff");
        assert_eq!(decoded.skipped[0].token, "NOTE_C4_quarter");
    }

    #[test]
    fn test_unknown_duration_decodes_as_quarter() {
        let tokenizer = Tokenizer::default();
        let notes = tokenizer.decode_tokens(&["NOTE_C4_breve_mf", "NOTE_D4_eighth_mf"]);
        assert_eq!(notes[0].end_time, 1.0);
        assert_eq!(notes[1].start_time, 1.0);
    }

    #[test]
    fn test_round_trip_within_bars() {
        let tokenizer = Tokenizer::default();
        let notes = vec![
            quarter(60, 0.0),
            Note::new(62, 1.0, 1.5, 85),
            Note::new(64, 2.0, 4.0, 40),
            Note::new(67, 4.5, 6.0, 100),
            Note::new(72, 6.0, 8.0, 25),
            Note::new(74, 8.0, 12.0, 65),
        ];
        let result = tokenizer.encode_notes(&notes, "");
        let decoded = tokenizer.decode_tokens(&result.tokens);

        assert_eq!(decoded.len(), notes.len());
        for (original, back) in notes.iter().zip(&decoded) {
            assert_eq!(back.pitch, original.pitch);
            assert_eq!(back.start_time, original.start_time);
            assert_eq!(back.end_time, original.end_time);
            assert_eq!(back.dynamic_name, original.dynamic_name);
        }
    }

    #[test]
    fn test_decode_ids_matches_decode_tokens() {
        let tokenizer = Tokenizer::default();
        let notes = vec![quarter(60, 0.0), quarter(64, 2.0), quarter(67, 5.0)];
        let result = tokenizer.encode_notes(&notes, "");

        assert_eq!(
            tokenizer.decode_ids(&result.token_ids),
            tokenizer.decode_tokens(&result.tokens)
        );
    }

    #[test]
    fn test_sample_tokens_decode() {
        let tokenizer = Tokenizer::default();

        let simple = tokenizer.sample_tokens(SampleStyle::Simple);
        let notes = tokenizer.decode_tokens(&simple);
        assert_eq!(notes.len(), 5);
        assert_eq!(notes[0].start_time, 4.0);
        assert_eq!(notes[4].start_time, 8.0);
        assert_eq!(notes[4].end_time, 10.0);

        let scale = tokenizer.sample_tokens(SampleStyle::Scale);
        assert_eq!(tokenizer.decode_tokens(&scale).len(), 8);

        let arpeggio = tokenizer.sample_tokens(SampleStyle::Arpeggio);
        let pitches: Vec<u8> = tokenizer
            .decode_tokens(&arpeggio)
            .iter()
            .map(|n| n.pitch)
            .collect();
        assert_eq!(pitches, vec![60, 64, 67, 72]);

        for sample in [simple, scale, arpeggio] {
            for token in &sample {
                assert!(tokenizer.vocabulary().contains(token), "{}", token);
            }
        }
    }

    #[test]
    fn test_custom_beats_per_bar() {
        let config = TokenizerConfig {
            beats_per_bar: 3.0,
            ..TokenizerConfig::default()
        };
        let tokenizer = Tokenizer::new(VocabConfig::default(), config).unwrap();
        let notes = vec![
            Note::new(60, 0.0, 3.0, 65),
            Note::new(62, 3.0, 6.0, 65),
            Note::new(64, 6.0, 9.0, 65),
        ];
        let result = tokenizer.encode_notes(&notes, "");

        assert_eq!(result.tokens.iter().filter(|t| *t == "BAR").count(), 2);
        assert!(!result.tokens.iter().any(|t| t.starts_with("REST_")));
        let starts: Vec<f64> = tokenizer
            .decode_tokens(&result.tokens)
            .iter()
            .map(|n| n.start_time)
            .collect();
        assert_eq!(starts, vec![0.0, 3.0, 6.0]);
    }

    #[test]
    fn test_invalid_tokenizer_config_rejected() {
        let config = TokenizerConfig {
            quantization_grid: 0,
            ..TokenizerConfig::default()
        };
        assert!(Tokenizer::new(VocabConfig::default(), config).is_err());
    }

    #[test]
    fn test_save_and_load_config() {
        let config = TokenizerConfig {
            quantization_grid: 8,
            ..TokenizerConfig::default()
        };
        let tokenizer = Tokenizer::new(VocabConfig::default(), config).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenizer.json");

        tokenizer.save_config(&path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["vocab_size"], 1861);
        assert_eq!(json["midi_config"]["quantization_grid"], 8);
        assert!(json["vocab_config"]["patterns"]["scales"].is_array());

        let loaded = Tokenizer::from_config_file(&path).unwrap();
        assert_eq!(loaded.config(), tokenizer.config());
        assert_eq!(loaded.vocabulary().tokens(), tokenizer.vocabulary().tokens());
    }

    #[test]
    fn test_load_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Tokenizer::from_config_file(dir.path().join("missing.json")).is_err());
    }

    fn arb_notes() -> impl Strategy<Value = Vec<Note>> {
        prop::collection::vec((0u8..=127, 0.0f64..64.0, 0.01f64..8.0, 0u8..=127), 0..24).prop_map(
            |mut raw| {
                raw.sort_by(|a, b| a.1.total_cmp(&b.1));
                raw.into_iter()
                    .map(|(pitch, start, length, velocity)| {
                        Note::new(pitch, start, start + length, velocity)
                    })
                    .collect()
            },
        )
    }

    proptest! {
        #[test]
        fn prop_quantize_is_idempotent(notes in arb_notes(), grid in prop::sample::select(vec![4u32, 8, 16, 32])) {
            let once = quantize_notes(&notes, grid);
            let twice = quantize_notes(&once, grid);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_quantized_notes_sit_on_grid(notes in arb_notes()) {
            let unit = TokenizerConfig::default().grid_unit();
            for note in quantize_notes(&notes, 16) {
                prop_assert_eq!((note.start_time / unit).fract(), 0.0);
                prop_assert!(note.duration() >= unit);
            }
        }

        #[test]
        fn prop_round_trip_keeps_note_labels(notes in arb_notes()) {
            let tokenizer = Tokenizer::default();
            let result = tokenizer.encode_notes(&notes, "");
            let decoded = tokenizer.decode_detailed(&result.tokens);

            prop_assert!(decoded.skipped.is_empty());
            prop_assert_eq!(decoded.notes.len(), notes.len());
            for (quantized, back) in result.notes.iter().zip(&decoded.notes) {
                prop_assert_eq!(back.pitch, quantized.pitch);
                prop_assert_eq!(&back.duration_name, &quantized.duration_name);
                prop_assert_eq!(&back.dynamic_name, &quantized.dynamic_name);
                prop_assert!(DYNAMICS.iter().any(|(_, v)| *v == back.velocity));
            }
        }

        #[test]
        fn prop_encoding_is_framed(notes in arb_notes()) {
            let tokenizer = Tokenizer::default();
            let result = tokenizer.encode_notes(&notes, "");
            prop_assert_eq!(result.tokens.first().map(String::as_str), Some("[BOS]"));
            prop_assert_eq!(result.tokens.last().map(String::as_str), Some("[EOS]"));
            prop_assert_eq!(
                result.tokens.iter().filter(|t| t.starts_with("NOTE_")).count(),
                notes.len()
            );
        }
    }
}
