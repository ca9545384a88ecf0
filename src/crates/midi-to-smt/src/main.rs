use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use midi_to_smt::{decode_to_midi_file, describe_melody, describe_tokens, encode_midi_file, midi};
use smt_core::{lex_stream, SampleStyle, Tokenizer, VocabConfig, Vocabulary};
use smt_patterns::{format_analysis, pattern_tokens, DetectorConfig, PatternDetector};

#[derive(Parser)]
#[command(name = "midi-to-smt")]
#[command(about = "Encode MIDI melodies as Smart Melody Tokenizer tokens and back", long_about = None)]
struct Cli {
    /// Tokenizer configuration written by `Tokenizer::save_config`
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log debug output, including detected patterns
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode one instrument of a MIDI file to tokens (JSON)
    Encode {
        /// Path to the MIDI file
        midi: PathBuf,

        /// Instrument index (tracks without notes are not counted)
        #[arg(short, long, default_value = "0")]
        track: usize,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Decode tokens to a MIDI file
    Decode {
        /// Token file: encode output, a JSON array of tokens or ids, or plain text
        tokens: PathBuf,

        /// MIDI file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Tempo in BPM
        #[arg(long, default_value = "120")]
        tempo: f64,
    },
    /// Detect scales, arpeggios, sequences and leaps in a MIDI melody
    Patterns {
        /// Path to the MIDI file
        midi: PathBuf,

        /// Instrument index
        #[arg(short, long, default_value = "0")]
        track: usize,

        /// Detector configuration (JSON)
        #[arg(long)]
        detector: Option<PathBuf>,

        /// Print patterns as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or save the vocabulary
    Vocab {
        /// Vocabulary configuration (JSON); ignored with --config
        #[arg(long)]
        vocab_config: Option<PathBuf>,

        /// Write the full vocabulary to this file
        #[arg(short, long)]
        save: Option<PathBuf>,
    },
    /// Print statistics about a MIDI melody
    Info {
        /// Path to the MIDI file
        midi: PathBuf,

        /// Instrument index
        #[arg(short, long, default_value = "0")]
        track: usize,

        /// How many notes to list
        #[arg(long, default_value = "10")]
        max_notes: usize,
    },
    /// Print a canned token sequence, optionally rendering it to MIDI
    Sample {
        #[arg(short, long, value_enum, default_value_t = Style::Simple)]
        style: Style,

        /// MIDI file to write the decoded sample to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Style {
    Simple,
    Scale,
    Arpeggio,
}

impl From<Style> for SampleStyle {
    fn from(style: Style) -> Self {
        match style {
            Style::Simple => SampleStyle::Simple,
            Style::Scale => SampleStyle::Scale,
            Style::Arpeggio => SampleStyle::Arpeggio,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, true) => "debug",
        _ => "info",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let tokenizer = match &cli.config {
        Some(path) => Tokenizer::from_config_file(path)?,
        None => Tokenizer::default(),
    };

    match cli.command {
        Commands::Encode { midi, track, output } => {
            let result = encode_midi_file(&tokenizer, &midi, track)?;
            let json = serde_json::to_string_pretty(&result)?;
            write_or_print(output.as_deref(), &json)?;
        }
        Commands::Decode {
            tokens,
            output,
            tempo,
        } => {
            let text = fs::read_to_string(&tokens)
                .with_context(|| format!("Failed to read {}", tokens.display()))?;
            let tokens = read_tokens(&text, tokenizer.vocabulary())?;
            let notes = decode_to_midi_file(&tokenizer, &tokens, &output, tempo)?;
            eprintln!("Decoded {} notes", notes.len());
        }
        Commands::Patterns {
            midi: path,
            track,
            detector,
            json,
        } => {
            let config = match detector {
                Some(path) => {
                    let text = fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    serde_json::from_str::<DetectorConfig>(&text)?
                }
                None => DetectorConfig::default(),
            };
            let detector = PatternDetector::new(config)?;

            let notes = midi::load(&path, track)?;
            let encoded = tokenizer.encode_notes(&notes, &path.display().to_string());
            let patterns = detector.detect_patterns(&encoded.notes);

            if json {
                println!("{}", serde_json::to_string_pretty(&patterns)?);
            } else {
                print!("{}", format_analysis(&encoded.notes, &patterns));
                println!("\nPattern tokens: {}", pattern_tokens(&patterns).join(" "));
            }
        }
        Commands::Vocab { vocab_config, save } => {
            let vocabulary = match (&cli.config, vocab_config) {
                (None, Some(path)) => {
                    let text = fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    Vocabulary::new(serde_json::from_str::<VocabConfig>(&text)?)?
                }
                _ => tokenizer.vocabulary().clone(),
            };

            println!("Vocabulary size: {}", vocabulary.size());
            for (token, id) in vocabulary.special_tokens() {
                println!("  {:8} {}", token, id);
            }
            if let Some(path) = save {
                vocabulary.save(&path)?;
            }
        }
        Commands::Info {
            midi: path,
            track,
            max_notes,
        } => {
            let melody = midi::read(&path, track)?;
            println!(
                "{}: {} instrument(s), using #{}{}, {:.1} BPM, {} ticks per beat",
                path.display(),
                melody.instruments,
                melody.instrument_index,
                melody
                    .track_name
                    .as_deref()
                    .map(|name| format!(" ({})", name))
                    .unwrap_or_default(),
                melody.tempo_bpm,
                melody.ticks_per_beat
            );
            print!("{}", describe_melody(&melody.notes, max_notes));
        }
        Commands::Sample { style, output } => {
            let tokens = tokenizer.sample_tokens(style.into());
            print!("{}", describe_tokens(&tokens));
            if let Some(path) = output {
                decode_to_midi_file(&tokenizer, &tokens, &path, midi::DEFAULT_TEMPO_BPM)?;
            }
        }
    }

    Ok(())
}

fn write_or_print(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, format!("{}\n", text))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Output saved to {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

/// Accepts `encode` output, a JSON array of token strings or ids, or
/// whitespace-separated tokens.
fn read_tokens(text: &str, vocabulary: &Vocabulary) -> Result<Vec<String>> {
    let trimmed = text.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return Ok(lex_stream(text).iter().map(|t| t.to_string()).collect());
    }

    let value: Value = serde_json::from_str(text).context("Invalid token JSON")?;
    let items = match &value {
        Value::Object(map) => map
            .get("tokens")
            .and_then(Value::as_array)
            .context("JSON object has no \"tokens\" array")?,
        Value::Array(items) => items,
        _ => bail!("Expected a JSON object or array of tokens"),
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(token) => Ok(token.clone()),
            Value::Number(n) => n
                .as_u64()
                .and_then(|id| u32::try_from(id).ok())
                .map(|id| vocabulary.decode_token(id).to_string())
                .with_context(|| format!("Invalid token id {}", n)),
            other => bail!("Unexpected token {}", other),
        })
        .collect()
}
