//! File discovery and the per-file worker pool.

use crate::engine::EncodeEngine;
use crate::job::{JobReport, Outcome, PROVISIONAL_PREFIX, RotationJob};
use crate::tkhd::PatchOptions;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const OUTPUT_DIR_NAME: &str = "Rotated";
pub const OUTPUT_PREFIX: &str = "rotated_";
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "webm", "avi", "mkv", "flv", "wmv"];

/// Every file rotated.
pub const EXIT_OK: i32 = 0;
/// At least one file failed or was copied unrotated.
pub const EXIT_PARTIAL: i32 = 1;
/// Nothing could be attempted.
pub const EXIT_FATAL: i32 = 2;

#[derive(thiserror::Error, Debug)]
pub enum SetupError {
    #[error("path does not exist: {0}")]
    Missing(PathBuf),
    #[error("not a supported video file: {0}")]
    Unsupported(PathBuf),
    #[error("no supported video files found in {0}")]
    Empty(PathBuf),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Clockwise rotation applied to every file
    pub degrees: i32,
    /// Defaults to `Rotated/` next to the input
    pub output_dir: Option<PathBuf>,
    /// Worker threads; 0 means one per CPU
    pub jobs: usize,
    pub dry_run: bool,
    pub patch: PatchOptions,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            degrees: 90,
            output_dir: None,
            jobs: 0,
            dry_run: false,
            patch: PatchOptions::default(),
        }
    }
}

pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| VIDEO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// `rotated_<name>` inside `output_dir`; the extension is kept.
pub fn output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let name = input.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    output_dir.join(format!("{OUTPUT_PREFIX}{name}"))
}

/// Inputs and where their outputs go.
#[derive(Debug, Clone)]
pub struct Plan {
    pub output_dir: PathBuf,
    pub jobs: Vec<RotationJob>,
}

/// A single file, or the video files directly inside a directory.
pub fn discover(root: &Path, degrees: i32, output_dir: Option<&Path>) -> Result<Plan, SetupError> {
    if !root.exists() {
        return Err(SetupError::Missing(root.to_path_buf()));
    }

    let (base, inputs) = if root.is_file() {
        if !is_video_file(root) {
            return Err(SetupError::Unsupported(root.to_path_buf()));
        }
        let parent = root.parent().unwrap_or(Path::new(".")).to_path_buf();
        (parent, vec![root.to_path_buf()])
    } else {
        let mut inputs = Vec::new();
        for entry in fs::read_dir(root)? {
            let path = entry?.path();
            let provisional = path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with(PROVISIONAL_PREFIX));
            if path.is_file() && is_video_file(&path) && !provisional {
                inputs.push(path);
            }
        }
        inputs.sort();
        (root.to_path_buf(), inputs)
    };

    if inputs.is_empty() {
        return Err(SetupError::Empty(root.to_path_buf()));
    }
    let output_dir = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| base.join(OUTPUT_DIR_NAME));

    let jobs = inputs
        .into_iter()
        .map(|input| {
            let output = output_path(&output_dir, &input);
            RotationJob::new(input, output, degrees)
        })
        .collect();
    Ok(Plan { output_dir, jobs })
}

#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub engine_available: bool,
    pub output_dir: PathBuf,
    pub jobs: Vec<JobReport>,
}

impl BatchReport {
    pub fn rotated(&self) -> usize {
        self.jobs.iter().filter(|j| matches!(j.outcome, Outcome::Rotated)).count()
    }

    pub fn failed(&self) -> usize {
        self.jobs.iter().filter(|j| j.is_failure()).count()
    }

    pub fn exit_code(&self) -> i32 {
        let complete = self
            .jobs
            .iter()
            .all(|j| matches!(j.outcome, Outcome::Rotated | Outcome::Planned));
        if complete { EXIT_OK } else { EXIT_PARTIAL }
    }
}

/// Rotate everything `root` names. Individual file failures end up in the
/// report; only setup problems return an error.
pub fn run_batch(
    root: &Path,
    cfg: &BatchConfig,
    engine: &dyn EncodeEngine,
) -> Result<BatchReport, SetupError> {
    let plan = discover(root, cfg.degrees, cfg.output_dir.as_deref())?;

    let engine_available = engine.is_available();
    info!(
        engine_available,
        files = plan.jobs.len(),
        output_dir = %plan.output_dir.display(),
        "starting batch"
    );

    if !cfg.dry_run {
        fs::create_dir_all(&plan.output_dir)?;
    }

    let threads = if cfg.jobs == 0 { num_cpus::get() } else { cfg.jobs };
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    let jobs: Vec<JobReport> = pool.install(|| {
        plan.jobs
            .par_iter()
            .map(|job| job.run(engine, engine_available, cfg.patch, cfg.dry_run))
            .collect()
    });

    let report = BatchReport { engine_available, output_dir: plan.output_dir, jobs };
    info!(
        rotated = report.rotated(),
        failed = report.failed(),
        total = report.jobs.len(),
        "batch finished"
    );
    Ok(report)
}
