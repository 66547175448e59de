// fforge (ffmpeg format conversion service)
// Copyright (C) 2025

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOrigin {
    Upload,
    Download,
}

/// An input file that passed all validation gates, either found in the
/// uploads directory or produced by the bounded fetcher.
pub struct AcquiredFile {
    pub path: PathBuf,
    pub base_name: String,
    pub extension: String,
    pub origin: FileOrigin,
}

pub struct ConversionJob {
    pub input: AcquiredFile,
    pub target: String,
    pub output: PathBuf,
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("ffmpeg exited with status {status}")]
    Failed { status: String, log: String },
    #[error("Conversion timed out after {0} seconds.")]
    TimedOut(u64),
    #[error("Failed to execute ffmpeg: {0}")]
    Spawn(std::io::Error),
}

/// Collision-free output name: input stem, request timestamp, target
/// extension. The target format is sanitized to [a-z0-9] before it gets here.
pub fn output_file_name(input_base: &str, target: &str) -> String {
    let stem = Path::new(input_base)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(input_base);
    format!("{}_{}.{}", stem, chrono::Utc::now().timestamp(), target)
}

async fn remove_partial(output: &Path) {
    if output.exists() {
        let _ = tokio::fs::remove_file(output).await;
    }
}

/// Runs ffmpeg against the job's input with the given encoder profile. The
/// process is killed at the timeout and any partial output is removed, so a
/// failed conversion never leaves an artifact in the converted directory.
/// On success the captured stderr is returned for the response logs.
pub async fn run(
    job: &ConversionJob,
    ffmpeg_path: &Path,
    profile_args: &[String],
    timeout: Duration,
) -> Result<String, ConvertError> {
    let mut cmd = Command::new(ffmpeg_path);
    cmd.arg("-i")
        .arg(&job.input.path)
        .arg("-y")
        .args(profile_args)
        .arg(&job.output)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(ConvertError::Spawn)?;

    // Drain stderr concurrently so a chatty ffmpeg can't fill the pipe and
    // stall while we wait on it.
    let stderr = child.stderr.take();
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        if let Some(mut pipe) = stderr {
            let _ = pipe.read_to_string(&mut buf).await;
        }
        buf
    });

    let deadline = tokio::time::Instant::now() + timeout;
    let status = loop {
        tokio::select! {
            result = child.wait() => {
                match result {
                    Ok(status) => break status,
                    Err(e) => {
                        stderr_task.abort();
                        remove_partial(&job.output).await;
                        return Err(ConvertError::Spawn(e));
                    }
                }
            }
            _ = sleep(Duration::from_millis(500)) => {
                if tokio::time::Instant::now() >= deadline {
                    let _ = child.kill().await;
                    stderr_task.abort();
                    remove_partial(&job.output).await;
                    return Err(ConvertError::TimedOut(timeout.as_secs()));
                }
            }
        }
    };

    let diagnostics = stderr_task.await.unwrap_or_default();

    if status.success() {
        Ok(diagnostics)
    } else {
        remove_partial(&job.output).await;
        Err(ConvertError::Failed {
            status: status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "killed by signal".to_string()),
            log: diagnostics,
        })
    }
}

/// Container duration in seconds via ffprobe. Best effort; used only for
/// response logs.
pub async fn probe_duration(input: &Path, ffprobe_path: &Path) -> Option<f64> {
    let output = Command::new(ffprobe_path)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout).trim().parse::<f64>().ok()
}
