//! ffmpeg/ffprobe collaborators.
//!
//! Probing and extraction delegate to the ffmpeg CLI tools rather than linking a
//! demuxing stack: the contract is narrow (duration in, PCM blob out) and ffmpeg
//! already handles every container we care about.
//!
//! Both collaborators impose a bounded timeout per subprocess call. Expiry kills
//! the child and surfaces as an ordinary error, which the pipeline treats as a
//! segment failure (non-fatal) for extraction and a fatal planning error for
//! probing.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::backend::{AudioExtractor, MediaProber};
use crate::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default cap on a single ffmpeg/ffprobe invocation.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Captured output of a finished subprocess.
#[derive(Debug)]
struct CommandOutput {
    success: bool,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// Run a command to completion with a deadline, capturing stdout/stderr.
///
/// Pipes are drained on background threads so a chatty child can't deadlock
/// against a full pipe buffer while we poll for exit.
fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn()?;

    let mut stdout_pipe = child.stdout.take();
    let stdout_handle = thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(pipe) = &mut stdout_pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    });

    let mut stderr_pipe = child.stderr.take();
    let stderr_handle = thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(pipe) = &mut stderr_pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::msg(format!(
                "subprocess exceeded {}s timeout",
                timeout.as_secs()
            )));
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(CommandOutput {
        success: status.success(),
        stdout: stdout_handle.join().unwrap_or_default(),
        stderr: stderr_handle.join().unwrap_or_default(),
    })
}

/// Determines source duration via `ffprobe`, with an `ffmpeg -i` fallback for
/// containers whose format section ffprobe can't read.
pub struct FfmpegProber {
    timeout: Duration,
}

impl Default for FfmpegProber {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl FfmpegProber {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn probe_ffprobe(&self, path: &Path) -> Result<f64> {
        let mut cmd = Command::new("ffprobe");
        cmd.arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(path);

        let output = run_with_timeout(cmd, self.timeout)?;
        if !output.success {
            return Err(Error::msg(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        text.trim()
            .parse::<f64>()
            .map_err(|err| Error::msg(format!("unparseable ffprobe duration '{}': {err}", text.trim())))
    }

    fn probe_ffmpeg_banner(&self, path: &Path) -> Result<f64> {
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-i").arg(path).arg("-f").arg("null").arg("-");

        // ffmpeg prints the stream banner (including the Duration line) to stderr.
        let output = run_with_timeout(cmd, self.timeout)?;
        let banner = String::from_utf8_lossy(&output.stderr);
        parse_duration_banner(&banner)
            .ok_or_else(|| Error::msg("no Duration line in ffmpeg output"))
    }
}

impl MediaProber for FfmpegProber {
    fn probe(&self, path: &Path) -> Result<f64> {
        let duration = self
            .probe_ffprobe(path)
            .or_else(|err| {
                debug!(error = %err, "ffprobe failed, falling back to ffmpeg banner parse");
                self.probe_ffmpeg_banner(path)
            })
            .map_err(|err| Error::UnreadableMedia {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;

        debug!(path = %path.display(), duration, "probed media duration");
        Ok(duration)
    }
}

/// Parse `Duration: HH:MM:SS.cc` out of an ffmpeg stream banner.
fn parse_duration_banner(banner: &str) -> Option<f64> {
    let line = banner.lines().find(|l| l.contains("Duration:"))?;
    let after = line.split("Duration:").nth(1)?;
    let field = after.split(',').next()?.trim();

    let mut parts = field.split(':');
    let hours: f64 = parts.next()?.trim().parse().ok()?;
    let minutes: f64 = parts.next()?.trim().parse().ok()?;
    let seconds: f64 = parts.next()?.trim().parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Extracts one time window as mono 16kHz 16-bit PCM WAV via `ffmpeg`.
pub struct FfmpegExtractor {
    timeout: Duration,
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl FfmpegExtractor {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl AudioExtractor for FfmpegExtractor {
    fn extract(&self, path: &Path, start_seconds: f64, duration_seconds: f64) -> Result<Vec<u8>> {
        // The temp file guard removes the extracted artifact on every exit
        // path, including timeouts and ffmpeg failures.
        let tmp = tempfile::Builder::new()
            .prefix("longscribe_segment_")
            .suffix(".wav")
            .tempfile()
            .map_err(|err| Error::ExtractionFailed {
                message: format!("could not create temp file: {err}"),
            })?;
        let tmp_path = tmp.path().to_path_buf();

        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-ss")
            .arg(start_seconds.to_string())
            .arg("-t")
            .arg(duration_seconds.to_string())
            .arg("-i")
            .arg(path)
            .arg("-vn")
            .arg("-ac")
            .arg("1")
            .arg("-ar")
            .arg("16000")
            .arg("-acodec")
            .arg("pcm_s16le")
            .arg("-y")
            .arg(&tmp_path);

        let output = run_with_timeout(cmd, self.timeout).map_err(|err| Error::ExtractionFailed {
            message: err.to_string(),
        })?;
        if !output.success {
            return Err(Error::ExtractionFailed {
                message: String::from_utf8_lossy(&output.stderr)
                    .lines()
                    .last()
                    .unwrap_or("ffmpeg exited with an error")
                    .to_string(),
            });
        }

        let bytes = fs::read(&tmp_path).map_err(|err| Error::ExtractionFailed {
            message: format!("extracted audio missing: {err}"),
        })?;
        if bytes.is_empty() {
            return Err(Error::ExtractionFailed {
                message: "ffmpeg produced an empty file".to_string(),
            });
        }

        debug!(
            start_seconds,
            duration_seconds,
            bytes = bytes.len(),
            "extracted segment audio"
        );
        Ok(bytes)
    }
}
