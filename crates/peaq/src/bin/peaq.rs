//! `peaq [--advanced] [--playback-level DB] [-v] REFFILE TESTFILE`
//!
//! Reads two 48 kHz WAV files, runs them through the PEAQ pipeline, and
//! prints the Objective Difference Grade.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use peaq::Algo;
use tracing_subscriber::EnvFilter;

const EXPECTED_SAMPLE_RATE: u32 = 48_000;

#[derive(Parser, Debug)]
#[command(version, about = "Objective Difference Grade (ITU-R BS.1387-1 / PEAQ) audio quality measurement")]
struct Args {
    /// Use the advanced-mode analysis (5 MOVs) instead of basic mode (11 MOVs).
    #[arg(long)]
    advanced: bool,

    /// Calibrated playback level in dB SPL for a full-scale sine wave.
    #[arg(long, default_value_t = 92.0)]
    playback_level: f64,

    /// Print the distortion index and per-MOV breakdown alongside the ODG.
    #[arg(short, long)]
    verbose: bool,

    /// Reference (undistorted) WAV file.
    reference: PathBuf,

    /// Test (distorted) WAV file.
    test: PathBuf,
}

/// Exit code for configuration/environment failures (§6): bad sample rate,
/// mismatched channel counts, an out-of-range playback level, an unreadable
/// file. Argument-parsing usage errors are handled by `clap` itself before
/// `run` is ever called.
const EXIT_ENVIRONMENT_ERROR: u8 = 2;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("RUST_LOG"))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_ENVIRONMENT_ERROR)
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let (reference, ref_channels) = read_wav(&args.reference)?;
    let (test, test_channels) = read_wav(&args.test)?;

    if ref_channels != test_channels {
        bail!("reference has {ref_channels} channel(s) but test has {test_channels}");
    }

    let mut algo = if args.advanced {
        Algo::new_advanced()
    } else {
        Algo::new_basic()
    };
    algo.set_channels(ref_channels)
        .context("invalid channel count")?;
    algo.set_playback_level(args.playback_level)
        .context("invalid playback level")?;

    let frames = reference.len() / ref_channels as usize;
    algo.process_block(&reference, &test, frames)
        .context("reference and test blocks must have matching lengths")?;
    algo.flush();

    if args.verbose {
        let di = algo.calculate_di(true);
        println!("DI:  {di:.6}");
    }
    let odg = algo.calculate_odg(args.verbose);
    println!("ODG: {odg:.6}");

    Ok(())
}

/// Reads a WAV file into interleaved `f32` samples, validating the sample
/// rate against the 48 kHz the model requires.
fn read_wav(path: &PathBuf) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();
    if spec.sample_rate != EXPECTED_SAMPLE_RATE {
        bail!(
            "{} is {} Hz, expected {EXPECTED_SAMPLE_RATE} Hz",
            path.display(),
            spec.sample_rate
        );
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .with_context(|| format!("failed to read samples from {}", path.display()))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .with_context(|| format!("failed to read samples from {}", path.display()))?
        }
    };

    Ok((samples, spec.channels as u32))
}
