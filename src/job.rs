//! One file's way through `ProbeEngine -> SelectBackend -> Execute -> {Done, Failed}`.
//!
//! The engine probe happens once per batch; its flag is handed to every job.

use crate::engine::{EncodeEngine, FilterSpec};
use crate::error::{Error, Result};
use crate::rotation::RotationAngle;
use crate::strategy::{Backend, ContainerFamily, select_backend};
use crate::tkhd::{PatchOptions, PatchReport, patch_rotation};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, error, info, warn};

/// Prefix of provisional files; never valid output.
pub const PROVISIONAL_PREFIX: &str = ".rotating-";

#[derive(Debug, Clone)]
pub struct RotationJob {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Requested clockwise rotation
    pub degrees: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Rotated,
    /// Copied without rotation
    Copied { warning: String },
    /// Dry run; nothing was written
    Planned,
    Failed { error: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub degrees: i32,
    pub backend: Backend,
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<PatchReport>,
}

impl JobReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }
}

impl RotationJob {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, degrees: i32) -> Self {
        Self { input: input.into(), output: output.into(), degrees }
    }

    pub fn select(&self, engine_available: bool) -> Backend {
        select_backend(engine_available, ContainerFamily::of(&self.input), self.degrees)
    }

    /// Select a backend and execute it; never panics on a bad file.
    pub fn run(
        &self,
        engine: &dyn EncodeEngine,
        engine_available: bool,
        opts: PatchOptions,
        dry_run: bool,
    ) -> JobReport {
        let backend = self.select(engine_available);
        debug!(input = %self.input.display(), %backend, "selected backend");

        let mut report = JobReport {
            input: self.input.clone(),
            output: self.output.clone(),
            degrees: self.degrees,
            backend,
            outcome: Outcome::Planned,
            patch: None,
        };
        if dry_run {
            return report;
        }

        match self.execute(backend, engine, opts) {
            Ok(patch) => {
                report.patch = patch;
                // a 0° copy already has the requested orientation
                report.outcome = if backend.rotates() || self.degrees.rem_euclid(360) == 0 {
                    info!(
                        input = %self.input.display(),
                        output = %self.output.display(),
                        %backend,
                        "rotated"
                    );
                    Outcome::Rotated
                } else {
                    let warning = format!(
                        "no rotation backend for {} at {} degrees; copied unrotated",
                        self.input.display(),
                        self.degrees
                    );
                    warn!("{warning}");
                    Outcome::Copied { warning }
                };
            }
            Err(e) => {
                error!(input = %self.input.display(), %backend, error = %e, "rotation failed");
                report.outcome = Outcome::Failed { error: e.kind(), reason: e.to_string() };
            }
        }
        report
    }

    /// Run `backend`. Output appears at `self.output` only on success; the
    /// provisional file is removed on every error path.
    pub fn execute(
        &self,
        backend: Backend,
        engine: &dyn EncodeEngine,
        opts: PatchOptions,
    ) -> Result<Option<PatchReport>> {
        match backend {
            Backend::ContainerPatch => {
                let angle = RotationAngle::from_degrees(self.degrees)?;
                let mut buf = fs::read(&self.input)?;
                let patch = patch_rotation(&mut buf, angle, opts)?;
                let provisional = self.provisional()?;
                fs::write(&provisional, &buf)?;
                self.commit(provisional)?;
                Ok(Some(patch))
            }
            Backend::PixelTranspose => {
                let provisional = self.provisional()?;
                let filter = FilterSpec::for_degrees(self.degrees);
                engine.reencode(&self.input, &filter, &provisional)?;
                self.commit(provisional)?;
                Ok(None)
            }
            Backend::PassthroughCopy => {
                let provisional = self.provisional()?;
                fs::copy(&self.input, &provisional)?;
                self.commit(provisional)?;
                Ok(None)
            }
        }
    }

    fn provisional(&self) -> Result<TempPath> {
        if self.input == self.output {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "output path is the input path",
            )));
        }
        let dir = self
            .output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(dir)?;
        let suffix = self
            .output
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let file = tempfile::Builder::new()
            .prefix(PROVISIONAL_PREFIX)
            .suffix(&suffix)
            .tempfile_in(dir)?;
        Ok(file.into_temp_path())
    }

    fn commit(&self, provisional: TempPath) -> Result<()> {
        provisional.persist(&self.output).map_err(|e| Error::Io(e.error))
    }
}
