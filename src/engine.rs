//! External re-encode engine used for pixel-level rotation.

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Video filter that realizes a rotation when re-encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSpec {
    /// No rotation; streams are copied untouched.
    Copy,
    /// An ffmpeg `-vf` filter graph.
    Video(String),
}

impl FilterSpec {
    /// Clockwise rotation by `degrees`.
    pub fn for_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            0 => FilterSpec::Copy,
            90 => FilterSpec::Video("transpose=clock".into()),
            180 => FilterSpec::Video("hflip,vflip".into()),
            270 => FilterSpec::Video("transpose=cclock".into()),
            other => {
                let rad = other as f64 * std::f64::consts::PI / 180.0;
                FilterSpec::Video(format!("rotate={rad:.6}:ow=rotw({rad:.6}):oh=roth({rad:.6})"))
            }
        }
    }
}

/// Output of a successful re-encode.
#[derive(Debug, Clone, Default)]
pub struct EngineOutput {
    pub diagnostics: String,
}

/// A tool that can rewrite a video's pixels.
pub trait EncodeEngine: Send + Sync {
    /// Capability probe; must not touch any media file.
    fn is_available(&self) -> bool;

    fn reencode(&self, input: &Path, filter: &FilterSpec, output: &Path) -> Result<EngineOutput>;
}

/// Encoder parameters for the ffmpeg engine.
#[derive(Debug, Clone)]
pub struct EncodeSettings {
    pub program: PathBuf,
    pub video_codec: String,
    pub crf: u8,
    pub preset: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// Per-file wall clock limit
    pub timeout: Duration,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            video_codec: "libx264".into(),
            crf: 23,
            preset: "medium".into(),
            audio_codec: "aac".into(),
            audio_bitrate: "192k".into(),
            timeout: Duration::from_secs(120),
        }
    }
}

pub struct Ffmpeg {
    settings: EncodeSettings,
}

impl Ffmpeg {
    pub fn new(settings: EncodeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EncodeSettings {
        &self.settings
    }

    /// Command line (without the program) for one re-encode.
    pub fn args(&self, input: &Path, filter: &FilterSpec, output: &Path) -> Vec<OsString> {
        let s = &self.settings;
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(input.into());
        match filter {
            FilterSpec::Copy => args.extend(["-c", "copy"].map(OsString::from)),
            FilterSpec::Video(graph) => {
                args.extend(
                    ["-vf", graph.as_str(), "-c:v", s.video_codec.as_str()].map(OsString::from),
                );
                args.extend([
                    "-crf".into(),
                    s.crf.to_string().into(),
                    "-preset".into(),
                    OsString::from(&s.preset),
                ]);
                args.extend(
                    ["-c:a", s.audio_codec.as_str(), "-b:a", s.audio_bitrate.as_str()]
                        .map(OsString::from),
                );
            }
        }
        args.push(output.into());
        args
    }
}

impl EncodeEngine for Ffmpeg {
    fn is_available(&self) -> bool {
        let status = Command::new(&self.settings.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(s) => s.success(),
            Err(e) => {
                debug!(
                    program = %self.settings.program.display(),
                    error = %e,
                    "encode engine probe failed"
                );
                false
            }
        }
    }

    fn reencode(&self, input: &Path, filter: &FilterSpec, output: &Path) -> Result<EngineOutput> {
        let args = self.args(input, filter, output);
        debug!(program = %self.settings.program.display(), ?args, "spawning encode engine");

        let mut command = Command::new(&self.settings.program);
        command.args(&args).stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::piped());
        // own process group, so a timeout also reaches children of wrapper scripts
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);
        let mut child = command.spawn().map_err(|e| {
            Error::ExternalEngineFailure(format!("spawn {}: {e}", self.settings.program.display()))
        })?;

        // drain stderr so a chatty child cannot block on a full pipe
        let stderr = child.stderr.take();
        let reader = std::thread::spawn(move || {
            let mut text = String::new();
            if let Some(mut pipe) = stderr {
                let _ = pipe.read_to_string(&mut text);
            }
            text
        });

        let deadline = Instant::now() + self.settings.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    terminate(&mut child);
                    return Err(e.into());
                }
            }
            if Instant::now() >= deadline {
                terminate(&mut child);
                // not joined: a surviving grandchild may still hold the pipe
                drop(reader);
                return Err(Error::ExternalEngineFailure(format!(
                    "timed out after {}s",
                    self.settings.timeout.as_secs()
                )));
            }
            std::thread::sleep(Duration::from_millis(50));
        };

        let diagnostics = reader.join().unwrap_or_default();
        if !status.success() {
            return Err(Error::ExternalEngineFailure(format!("{status}: {}", diagnostics.trim())));
        }
        if !diagnostics.trim().is_empty() {
            warn!(input = %input.display(), "{}", diagnostics.trim());
        }
        Ok(EngineOutput { diagnostics })
    }
}

/// Kill the engine's process group (the child alone off unix) and reap it.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        let pgid = nix::unistd::Pid::from_raw(child.id() as i32);
        if let Err(e) = killpg(pgid, Signal::SIGKILL) {
            debug!(pid = child.id(), error = %e, "killpg failed");
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}
