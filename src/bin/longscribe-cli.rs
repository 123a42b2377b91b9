use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use longscribe::backends::ffmpeg::{FfmpegExtractor, FfmpegProber};
use longscribe::backends::whisper::WhisperEngine;
use longscribe::driver::PipelineDriver;
use longscribe::opts::RunOpts;

/// Exit codes: 0 all segments transcribed, 1 hard failure, 2 partial success.
const EXIT_PARTIAL: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "longscribe")]
#[command(about = "Resumable segmented transcription for long media files")]
struct Cli {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Run a (resumable) transcription over a media file.
    Transcribe(TranscribeArgs),

    /// Remove the checkpoint, segment cache, and stray temp files from an
    /// output directory so the next run starts from scratch.
    Cleanup {
        /// Output directory to clean.
        #[arg(short = 'o', long = "output", default_value = "transcripts")]
        output: PathBuf,
    },

    /// Show how much disk the artifacts and segment cache are using.
    DiskUsage {
        /// Output directory to inspect.
        #[arg(short = 'o', long = "output", default_value = "transcripts")]
        output: PathBuf,
    },
}

#[derive(Parser, Debug)]
struct TranscribeArgs {
    /// Path to the source media file.
    #[arg(short = 's', long = "source")]
    source: PathBuf,

    /// Directory for the checkpoint, segment cache, and final artifacts.
    #[arg(short = 'o', long = "output", default_value = "transcripts")]
    output: PathBuf,

    /// Path to the whisper model file.
    #[arg(short = 'm', long = "model")]
    model: String,

    /// Segment length in seconds.
    #[arg(long = "segment-seconds", default_value_t = 1800.0)]
    segment_seconds: f64,

    /// Language hint (e.g. "en"); omit to auto-detect.
    #[arg(short = 'l', long = "language")]
    language: Option<String>,

    /// Extra attempts per failed segment before moving on.
    #[arg(long = "max-retries", default_value_t = 0)]
    max_retries: u32,

    /// Start from the beginning, ignoring any existing checkpoint.
    #[arg(long = "no-resume", default_value_t = false)]
    no_resume: bool,
}

fn main() -> ExitCode {
    longscribe::logging::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Some(CliCommand::Transcribe(args)) => transcribe(args),
        Some(CliCommand::Cleanup { output }) => cleanup(&output).map(|_| ExitCode::SUCCESS),
        Some(CliCommand::DiskUsage { output }) => disk_usage(&output).map(|_| ExitCode::SUCCESS),
        None => interactive(),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn transcribe(args: TranscribeArgs) -> Result<ExitCode> {
    let opts = RunOpts {
        segment_length: args.segment_seconds,
        resume: !args.no_resume,
        max_retries: args.max_retries,
        default_language: args.language.clone().unwrap_or_else(|| "en".to_string()),
    };

    let engine = WhisperEngine::new(&args.model, args.language.clone())
        .context("failed to load whisper model")?;

    let driver = PipelineDriver::new(
        FfmpegProber::default(),
        FfmpegExtractor::default(),
        engine,
        &args.output,
        opts,
    );

    // Durable state is written after every segment, so a killed process is
    // already resumable; no signal handler is needed for that guarantee.
    let cancel = AtomicBool::new(false);
    let summary = driver.run(&args.source, &cancel)?;

    println!(
        "segments transcribed: {}/{}",
        summary.succeeded, summary.total_segments
    );
    if let Some(artifacts) = &summary.artifacts {
        println!("  text: {}", artifacts.text.display());
        println!("  srt:  {}", artifacts.srt.display());
        println!("  json: {}", artifacts.json.display());
    }

    if summary.total_segments == 0 || summary.succeeded == 0 {
        eprintln!("no segments were successfully transcribed");
        return Ok(ExitCode::FAILURE);
    }
    if !summary.all_succeeded() {
        return Ok(ExitCode::from(EXIT_PARTIAL));
    }
    Ok(ExitCode::SUCCESS)
}

fn cleanup(output: &Path) -> Result<()> {
    let mut removed = 0usize;

    let segments_dir = output.join("segments");
    if segments_dir.is_dir() {
        fs::remove_dir_all(&segments_dir)
            .with_context(|| format!("removing {}", segments_dir.display()))?;
        println!("removed: {}", segments_dir.display());
        removed += 1;
    }

    let checkpoint = output.join("checkpoint.json");
    if checkpoint.is_file() {
        fs::remove_file(&checkpoint)
            .with_context(|| format!("removing {}", checkpoint.display()))?;
        println!("removed: {}", checkpoint.display());
        removed += 1;
    }

    // Stray extraction temp files from crashed runs.
    if output.is_dir() {
        for entry in fs::read_dir(output)? {
            let path = entry?.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with("longscribe_segment_") && name.ends_with(".wav") {
                fs::remove_file(&path)?;
                println!("removed: {}", path.display());
                removed += 1;
            }
        }
    }

    println!("cleanup complete, items removed: {removed}");
    Ok(())
}

fn disk_usage(output: &Path) -> Result<()> {
    fn dir_size(dir: &Path) -> io::Result<u64> {
        let mut total = 0;
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if meta.is_dir() {
                total += dir_size(&entry.path())?;
            } else {
                total += meta.len();
            }
        }
        Ok(total)
    }

    if !output.is_dir() {
        println!("{}: not found", output.display());
        return Ok(());
    }

    let total = dir_size(output)?;
    println!(
        "{}: {:.1} MB",
        output.display(),
        total as f64 / 1024.0 / 1024.0
    );
    Ok(())
}

/// Minimal prompt-driven launcher used when no subcommand is given.
fn interactive() -> Result<ExitCode> {
    println!("longscribe");
    println!("==========");

    let source = PathBuf::from(prompt("Path to media file: ")?);
    if !source.exists() {
        eprintln!("media file not found: {}", source.display());
        return Ok(ExitCode::FAILURE);
    }

    let model = prompt("Path to whisper model: ")?;

    let segment_seconds = {
        let raw = prompt("Segment length in seconds (default 1800): ")?;
        if raw.is_empty() {
            1800.0
        } else {
            raw.parse().context("invalid segment length")?
        }
    };

    let resume = prompt("Resume from existing progress? (Y/n): ")?.to_lowercase() != "n";

    transcribe(TranscribeArgs {
        source,
        output: PathBuf::from("transcripts"),
        model,
        segment_seconds,
        language: None,
        max_retries: 0,
        no_resume: !resume,
    })
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().trim_matches('"').to_string())
}
