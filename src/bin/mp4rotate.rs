use anyhow::Context;
use clap::{ArgAction, Parser};
use mp4rotate::{
    batch::{BatchConfig, EXIT_FATAL, run_batch},
    engine::{EncodeEngine, EncodeSettings, EngineOutput, Ffmpeg, FilterSpec},
    error::{Error, Result as RotateResult},
    job::Outcome,
    tkhd::PatchOptions,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Rotate MP4/MOV videos, losslessly when possible")]
struct Args {
    /// Video file or directory of videos
    path: PathBuf,

    /// Clockwise rotation in degrees (0, 90, 180, 270; other angles need ffmpeg)
    #[arg(short, long, allow_negative_numbers = true)]
    angle: i32,

    /// Output directory (default: "Rotated" next to the input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Worker threads (0 = one per CPU)
    #[arg(short, long, default_value_t = 0)]
    jobs: usize,

    /// Never re-encode; only patch the container matrix or copy
    #[arg(long, action = ArgAction::SetTrue)]
    no_engine: bool,

    /// ffmpeg executable
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// x264 constant rate factor for re-encodes
    #[arg(long, default_value_t = 23)]
    crf: u8,

    /// x264 preset for re-encodes
    #[arg(long, default_value = "medium")]
    preset: String,

    /// Per-file re-encode timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// Also swap tkhd width/height when the orientation changes
    #[arg(long, action = ArgAction::SetTrue)]
    swap_dimensions: bool,

    /// Only report which backend each file would use
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,

    /// Emit a JSON report instead of one line per file
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

/// Engine stand-in for `--no-engine`.
struct Disabled;

impl EncodeEngine for Disabled {
    fn is_available(&self) -> bool {
        false
    }

    fn reencode(
        &self,
        _input: &Path,
        _filter: &FilterSpec,
        _output: &Path,
    ) -> RotateResult<EngineOutput> {
        Err(Error::ExternalEngineFailure("encode engine disabled".into()))
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = match run(Args::parse()) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            EXIT_FATAL
        }
    };
    std::process::exit(code);
}

fn run(args: Args) -> anyhow::Result<i32> {
    let cfg = BatchConfig {
        degrees: args.angle,
        output_dir: args.output_dir,
        jobs: args.jobs,
        dry_run: args.dry_run,
        patch: PatchOptions { swap_dimensions: args.swap_dimensions },
    };

    let engine: Box<dyn EncodeEngine> = if args.no_engine {
        Box::new(Disabled)
    } else {
        Box::new(Ffmpeg::new(EncodeSettings {
            program: args.ffmpeg,
            crf: args.crf,
            preset: args.preset,
            timeout: Duration::from_secs(args.timeout),
            ..EncodeSettings::default()
        }))
    };

    let report = run_batch(&args.path, &cfg, engine.as_ref())
        .with_context(|| format!("cannot rotate {}", args.path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for job in &report.jobs {
            let status = match &job.outcome {
                Outcome::Rotated => "rotated".to_string(),
                Outcome::Copied { warning } => format!("copied ({warning})"),
                Outcome::Planned => "planned".to_string(),
                Outcome::Failed { error, reason } => format!("FAILED {error}: {reason}"),
            };
            println!(
                "{:<16} {} -> {}  {}",
                job.backend.to_string(),
                job.input.display(),
                job.output.display(),
                status
            );
        }
        println!(
            "{} of {} rotated, {} failed",
            report.rotated(),
            report.jobs.len(),
            report.failed()
        );
    }

    Ok(report.exit_code())
}
