//! synthbot CLI
//!
//! Plays an audio-analysis document (or a recorded note log) as key presses
//! on a keyboard-bound synth. Ctrl-C stops playback between notes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use synthbot::notelog::write_json;
use synthbot::{
    classify_with, events_to_midi, load_analysis, load_note_log, ExportOptions, KeySink,
    LoggingKeySink, MemoryNoteLog, NoteEvent, NoteLog, NoteLogDocument, Player, PlayerConfig,
    RecordingKeySink, Segment, Session, SessionConfig, TracingNoteLog,
};
use synthconf::SynthConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file, replacing ./synthbot.toml
    #[arg(short, long, global = true, env = "SYNTHBOT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify and play an audio-analysis JSON document
    Play {
        /// Analysis JSON with a `segments` array
        analysis: PathBuf,

        #[command(flatten)]
        playback: PlaybackArgs,
    },

    /// Play a note log recorded with --record
    Replay {
        /// Note log JSON (`{"notes": [...]}`)
        notes: PathBuf,

        #[command(flatten)]
        playback: PlaybackArgs,
    },

    /// Print the note events for an analysis without playing them
    Classify {
        analysis: PathBuf,

        /// Loudness threshold override
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Show the effective configuration and where it came from
    Config,
}

#[derive(Args, Debug, Clone)]
struct PlaybackArgs {
    /// Where key signals go
    #[arg(long, value_enum)]
    sink: Option<SinkKind>,

    /// Stop at the first malformed segment
    #[arg(long)]
    strict: bool,

    /// Milliseconds cut from each hold so repeated notes re-trigger
    #[arg(long)]
    slop_ms: Option<u64>,

    /// Milliseconds to wait before the first note
    #[arg(long)]
    lead_in_ms: Option<u64>,

    /// Write the played note log as JSON
    #[arg(long)]
    record: Option<PathBuf>,

    /// Write the played notes as a MIDI file
    #[arg(long)]
    midi: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum SinkKind {
    /// Log key signals at debug level
    Log,
    /// Record key signals in memory and report the count
    Dry,
    /// Press real keys (requires the `keyboard` feature)
    Keyboard,
}

enum Playlist {
    Segments(Vec<Segment>),
    Events(Vec<NoteEvent>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = SynthConfig::load_with_sources_from(cli.config.as_deref())
        .context("loading configuration")?;

    let filter = EnvFilter::try_new(&config.telemetry.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Play { analysis, playback } => {
            let document = load_analysis(&analysis)?;
            info!(
                path = %analysis.display(),
                segments = document.segments.len(),
                "loaded analysis"
            );
            play(&config, Playlist::Segments(document.segments), playback).await?;
        }
        Commands::Replay { notes, playback } => {
            let document = load_note_log(&notes)?;
            info!(path = %notes.display(), events = document.notes.len(), "loaded note log");
            play(&config, Playlist::Events(document.notes), playback).await?;
        }
        Commands::Classify {
            analysis,
            threshold,
        } => {
            classify_only(&config, &analysis, threshold)?;
        }
        Commands::Config => {
            print!("{}", config.to_toml());
            println!();
            for file in &sources.files {
                println!("# loaded: {}", file.display());
            }
            for var in &sources.env_overrides {
                println!("# env override: {}", var);
            }
        }
    }

    Ok(())
}

fn classify_only(config: &SynthConfig, analysis: &Path, threshold: Option<f64>) -> Result<()> {
    let document = load_analysis(analysis)?;
    let mut params = SessionConfig::from_config(config).classifier;
    if let Some(threshold) = threshold {
        params.loud_threshold = threshold;
    }

    let mut notes = Vec::with_capacity(document.segments.len());
    for (index, segment) in document.segments.iter().enumerate() {
        match classify_with(segment, &params) {
            Ok(event) => notes.push(event),
            Err(e) => warn!(index, start = segment.start, error = %e, "skipping malformed segment"),
        }
    }

    let total = document.segments.len();
    let output = serde_json::to_string_pretty(&NoteLogDocument { notes })?;
    println!("{}", output);
    info!(total, "total segments");
    Ok(())
}

fn open_sink(kind: SinkKind, dry: &RecordingKeySink) -> Result<Box<dyn KeySink>> {
    match kind {
        SinkKind::Log => Ok(Box::new(LoggingKeySink)),
        SinkKind::Dry => Ok(Box::new(dry.clone())),
        SinkKind::Keyboard => open_keyboard(),
    }
}

#[cfg(feature = "keyboard")]
fn open_keyboard() -> Result<Box<dyn KeySink>> {
    let sink = synthbot::EnigoKeySink::connect().context("connecting to the OS keyboard")?;
    Ok(Box::new(sink))
}

#[cfg(not(feature = "keyboard"))]
fn open_keyboard() -> Result<Box<dyn KeySink>> {
    anyhow::bail!("this build has no keyboard support; rebuild with `--features keyboard`")
}

async fn play(config: &SynthConfig, playlist: Playlist, args: PlaybackArgs) -> Result<()> {
    let kind = match args.sink {
        Some(kind) => kind,
        None => SinkKind::from_str(&config.output.sink, true)
            .map_err(|e| anyhow::anyhow!("invalid sink {:?} in config: {}", config.output.sink, e))?,
    };

    let mut player_config = PlayerConfig::from_config(config);
    if let Some(ms) = args.slop_ms {
        player_config.release_slop = Duration::from_millis(ms);
    }
    let mut session_config = SessionConfig::from_config(config);
    session_config.strict |= args.strict;
    if let Some(ms) = args.lead_in_ms {
        session_config.lead_in = Duration::from_millis(ms);
    }

    let dry = RecordingKeySink::new();
    let dry_handle = dry.clone();

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after the current note");
            signal_token.cancel();
        }
    });

    // Playback blocks for every note; the keyboard handle is opened and
    // dropped on the blocking thread
    let (result, memory) = tokio::task::spawn_blocking(move || -> Result<_> {
        let sink = open_sink(kind, &dry_handle)?;
        let mut session = Session::new(Player::new(sink, player_config), session_config);
        let mut memory = MemoryNoteLog::new();
        let mut tracing_log = TracingNoteLog;

        let result = {
            let mut log = |index: usize, event: &NoteEvent| {
                tracing_log.record(index, event);
                memory.record(index, event);
            };
            match &playlist {
                Playlist::Segments(segments) => session.run(segments, &mut log, &cancel),
                Playlist::Events(events) => session.replay(events, &mut log, &cancel),
            }
        };
        Ok((result, memory))
    })
    .await
    .context("playback task panicked")??;

    // Keep whatever was played, even if the session halted
    let document = memory.into_document();
    if let Some(path) = &args.record {
        write_json(path, &document)?;
        info!(path = %path.display(), notes = document.notes.len(), "wrote note log");
    }
    if let Some(path) = &args.midi {
        let bytes = events_to_midi(&document.notes, &ExportOptions::default())
            .context("encoding MIDI")?;
        std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "wrote MIDI");
    }

    let report = result.context("playback halted")?;
    if kind == SinkKind::Dry {
        info!(signals = dry.len(), "dry run key signals");
    }
    for skipped in &report.skipped {
        warn!(
            index = skipped.index,
            start = skipped.start,
            reason = %skipped.reason,
            "skipped segment"
        );
    }
    println!(
        "total segments: {} (played {}, silent {}, skipped {}){}",
        report.total_segments(),
        report.played,
        report.silences,
        report.skipped.len(),
        if report.cancelled { ", cancelled" } else { "" }
    );

    Ok(())
}
