//! chordroll - MIDI corpus to chord-label sequences
//!
//! Subcommands:
//! - `chordroll extract` - Extract chord sequences, build the vocabulary, write index files
//! - `chordroll normalize-tempo <output>` - Rewrite the corpus at a single fixed tempo
//! - `chordroll reindex` - Rebuild the vocabulary from persisted chord records
//! - `chordroll survey` - Print scale, key and chord statistics
//! - `chordroll config` - Print the effective configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use chordconf::{ChordStyle, ChordrollConfig};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chordroll")]
#[command(about = "Turn a MIDI corpus into chord-label and chord-index sequences")]
#[command(version)]
struct Cli {
    /// Config file replacing ./chordroll.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract chords for every MIDI file in the corpus
    Extract {
        /// Corpus root (overrides paths.input_dir)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output root (overrides paths.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Chord naming: triad or seventh
        #[arg(long)]
        style: Option<ChordStyle>,

        /// Transpose every song to C major / A minor before naming
        #[arg(long)]
        transpose: bool,

        /// Concurrent files
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Rewrite the corpus at extraction.target_bpm
    NormalizeTempo {
        /// Where the rewritten tree goes
        output: PathBuf,

        /// Corpus root (overrides paths.input_dir)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Tempo to write (overrides extraction.target_bpm)
        #[arg(long)]
        bpm: Option<f64>,
    },

    /// Rebuild vocabulary and index files from persisted chord records
    Reindex {
        /// Output root (overrides paths.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Vocabulary size including the unknown slot
        #[arg(short, long)]
        num_chords: Option<usize>,
    },

    /// Print scale, key and chord statistics of persisted chord records
    Survey {
        /// Output root (overrides paths.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Chords to list
        #[arg(short, long, default_value = "20")]
        top: usize,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = ChordrollConfig::load_with_sources_from(cli.config.as_deref())
        .context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.telemetry.log_level)
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Extract {
            input,
            output,
            style,
            transpose,
            jobs,
        } => {
            if let Some(input) = input {
                config.paths.input_dir = input;
            }
            if let Some(output) = output {
                config.paths.output_dir = output;
            }
            if let Some(style) = style {
                config.extraction.chord_style = style;
            }
            if transpose {
                config.extraction.transpose = true;
            }
            if let Some(jobs) = jobs {
                config.run.jobs = jobs;
            }

            let report = chordroll::run_extract(&config).await?;
            println!(
                "{} extracted, {} skipped, {} failed; vocabulary of {} written to {}",
                report.extracted(),
                report.skipped(),
                report.failed(),
                report.vocabulary_size,
                config.paths.output_dir.display()
            );
        }
        Commands::NormalizeTempo { output, input, bpm } => {
            if let Some(input) = input {
                config.paths.input_dir = input;
            }
            if let Some(bpm) = bpm {
                config.extraction.target_bpm = bpm;
            }

            let summary = chordroll::run_normalize_tempo(&config, &output).await?;
            println!(
                "{} files written to {}, {} failed",
                summary.written,
                output.display(),
                summary.failed.len()
            );
        }
        Commands::Reindex { output, num_chords } => {
            if let Some(output) = output {
                config.paths.output_dir = output;
            }
            if let Some(n) = num_chords {
                config.vocabulary.num_chords = n;
            }

            let vocabulary = chordroll::run_reindex(&config)?;
            println!("vocabulary of {} written", vocabulary.len());
        }
        Commands::Survey { output, top, json } => {
            if let Some(output) = output {
                config.paths.output_dir = output;
            }

            let records = chordroll::OutputStore::new(&config.paths.output_dir)
                .load_chord_records()?;
            let survey = chordroll::Survey::from_records(
                &records,
                config.extraction.key_histogram_size,
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&survey)?);
            } else {
                print!("{}", survey.render(top));
            }
        }
        Commands::Config => {
            for file in &sources.files {
                println!("# loaded: {}", file.display());
            }
            for var in &sources.env_overrides {
                println!("# env: {}", var);
            }
            print!("{}", config.to_toml());
        }
    }

    Ok(())
}
