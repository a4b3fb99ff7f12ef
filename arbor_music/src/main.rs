// Arbor Music composer: CLI entry point.
//
// Grows a four-voice piece from a tonic, a scale and a structure string and
// writes it to MIDI. The pipeline: phrase planning -> harmony -> melodies ->
// rendering -> MIDI output (all inside `notator::compose` except the last).
//
// Usage:
//   cargo run -p arbor_music --bin compose -- <TONIC> <SCALE> <STRUCTURE> [NAME]
//     [--seed N] [--config FILE] [--output FILE] [--summary]
//
// Tonics: C, CSHARP, C#, DFLAT, Db, ... Scales: MAJOR, MINOR.
// Log verbosity follows RUST_LOG (default "info").

use anyhow::{Context, Result};
use arbor_music::config::ComposerConfig;
use arbor_music::midi::write_midi;
use arbor_music::notator::compose;
use arbor_music::pitch::PitchClass;
use arbor_music::scale::Scale;
use arbor_prng::ArborRng;
use clap::Parser;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "compose")]
#[command(about = "Compose a four-voice piece with L-system grammars")]
#[command(version)]
struct Cli {
    /// Tonic pitch (e.g. C, FSHARP, Bb)
    tonic: PitchClass,

    /// MAJOR or MINOR
    scale: Scale,

    /// Phrase structure, one character per phrase (e.g. aaba)
    structure: String,

    /// Piece name; the default output file is <NAME>.mid
    #[arg(default_value = "piece")]
    name: String,

    /// RNG seed (derived from the clock if omitted)
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON file with composition parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output MIDI path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the phrase and melody overview
    #[arg(long)]
    summary: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ComposerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ComposerConfig::default(),
    };
    let seed = match cli.seed {
        Some(seed) => seed,
        None => clock_seed()?,
    };
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.mid", cli.name)));

    println!("=== Arbor Music Composer ===");
    println!("Piece: {}", cli.name);
    println!("Key: {} {}", cli.tonic, cli.scale);
    println!("Structure: {}", cli.structure);
    println!("Seed: {}", seed);
    println!();

    println!("[1/2] Composing...");
    let mut rng = ArborRng::new(seed);
    let piece = compose(cli.tonic, cli.scale, &cli.structure, &config, &mut rng)
        .context("composition failed")?;
    for (index, phrase) in piece.phrases.iter().enumerate() {
        let plays = piece.order.iter().filter(|&&i| i == index).count();
        println!(
            "  Phrase {:?}: {} bar(s), {} chord(s), played {}x",
            phrase.symbol,
            phrase.bars,
            phrase.chords.len(),
            plays
        );
    }
    let notes: usize = piece.sequence.tracks().iter().map(|t| t.note_count()).sum();
    println!(
        "  {} bars + final chord, {} notes across {} voices",
        piece.total_bars(),
        notes,
        piece.sequence.tracks().len()
    );

    if cli.summary {
        println!();
        print!("{}", piece.summary());
        println!();
    }

    println!("[2/2] Writing MIDI to {}...", output.display());
    write_midi(&piece.sequence, config.tempo_bpm, &output)
        .with_context(|| format!("writing {}", output.display()))?;
    let beats = piece.sequence.end_tick() as f64 / config.ticks_per_quarter as f64;
    println!(
        "  Done! Duration: {:.0}s at {} BPM",
        beats * 60.0 / config.tempo_bpm as f64,
        config.tempo_bpm
    );

    Ok(())
}

fn clock_seed() -> Result<u64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the Unix epoch")?;
    Ok(elapsed.as_nanos() as u64)
}
