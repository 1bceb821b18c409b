use colored::*;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::runtime::Runtime;

use super::Capture;
use crate::error::CaptureError;
use crate::utils::escape_chars;

const CAPTURE_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_SCREENSHOT_TRIES: u32 = 2;
/// RTSP socket I/O timeout handed to ffmpeg, in microseconds.
const SOCKET_TIMEOUT_US: &str = "3000000";
/// First ffmpeg major release where the RTSP `-timeout` option is the socket
/// timeout. Older builds read it as a listen timeout and call it `-stimeout`.
const SOCKET_TIMEOUT_RENAMED_IN: u32 = 5;

/// Grabs one frame with an `ffmpeg` child process.
///
/// Children are supervised on a small shared runtime so a hung stream is
/// killed at the deadline instead of pinning the worker forever.
pub struct FfmpegCapture {
    pics_dir: PathBuf,
    program: String,
    timeout: Duration,
    max_tries: u32,
    timeout_flag: &'static str,
    runtime: Runtime,
}

impl FfmpegCapture {
    pub fn new(pics_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("capture-supervisor")
            .enable_all()
            .build()?;

        let program = "ffmpeg".to_string();
        Ok(Self {
            pics_dir: pics_dir.into(),
            timeout_flag: socket_timeout_flag(installed_major_version(&program)),
            program,
            timeout: CAPTURE_TIMEOUT,
            max_tries: MAX_SCREENSHOT_TRIES,
            runtime,
        })
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self.timeout_flag = socket_timeout_flag(installed_major_version(&self.program));
        self
    }

    /// `<pics>/<url without scheme, escaped>.jpg`
    pub fn screenshot_path(&self, url: &str) -> PathBuf {
        let name = escape_chars(url.trim_start_matches("rtsp://"));
        self.pics_dir.join(format!("{}.jpg", name))
    }

    fn capture_once(&self, url: &str, path: &Path) -> Result<(), CaptureError> {
        self.runtime.block_on(async {
            let child = Command::new(&self.program)
                .args([
                    "-loglevel", "error",
                    "-rtsp_transport", "tcp",
                    "-rtsp_flags", "prefer_tcp",
                    self.timeout_flag, SOCKET_TIMEOUT_US,
                    "-i", url,
                    "-frames:v", "1",
                    "-y",
                ])
                .arg(path)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(CaptureError::Spawn)?;

            match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
                Ok(Ok(output)) => {
                    if !output.status.success() {
                        let stderr = String::from_utf8_lossy(&output.stderr);
                        return Err(CaptureError::Failed(stderr.trim().to_string()));
                    }
                    match tokio::fs::metadata(path).await {
                        Ok(meta) if meta.len() > 0 => Ok(()),
                        _ => Err(CaptureError::NoFrame),
                    }
                }
                Ok(Err(e)) => Err(CaptureError::Io(e)),
                // Dropping the child on timeout kills it.
                Err(_) => Err(CaptureError::Timeout(self.timeout.as_secs())),
            }
        })
    }
}

/// Major version from the first line of `ffmpeg -version`, e.g.
/// `ffmpeg version 4.4.2-0ubuntu0.22.04.1` or `ffmpeg version n5.1.2`.
/// Git snapshots (`N-109000-g...`) have none.
fn parse_major_version(version_output: &str) -> Option<u32> {
    let version = version_output
        .lines()
        .next()?
        .split_whitespace()
        .skip_while(|word| *word != "version")
        .nth(1)?;
    let digits: String = version
        .trim_start_matches('n')
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn installed_major_version(program: &str) -> Option<u32> {
    let output = match std::process::Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(%program, error = %e, "Unable to read ffmpeg version");
            return None;
        }
    };
    let major = parse_major_version(&String::from_utf8_lossy(&output.stdout));
    tracing::debug!(%program, ?major, "Detected ffmpeg version");
    major
}

/// Unknown versions get the current option name.
fn socket_timeout_flag(major: Option<u32>) -> &'static str {
    match major {
        Some(major) if major < SOCKET_TIMEOUT_RENAMED_IN => "-stimeout",
        _ => "-timeout",
    }
}

impl Capture for FfmpegCapture {
    fn capture(&self, url: &str) -> Result<PathBuf, CaptureError> {
        let path = self.screenshot_path(url);
        let mut tries = 0;
        loop {
            tries += 1;
            match self.capture_once(url, &path) {
                Ok(()) => {
                    println!("{} {}", "[+] Captured screenshot for".bold(), url.cyan().underline());
                    tracing::debug!("Captured screenshot for {}", url);
                    return Ok(path);
                }
                Err(e @ CaptureError::Spawn(_)) => return Err(e),
                Err(e) if tries >= self.max_tries => {
                    println!(
                        "{}",
                        format!(
                            "[!] Missed screenshot of {} - if you see this a lot, consider reducing the number of screenshot threads",
                            url
                        )
                        .red()
                        .italic()
                    );
                    tracing::debug!(%url, error = %e, "Missed screenshot");
                    return Err(e);
                }
                Err(e) => {
                    tracing::debug!(%url, error = %e, "Screenshot attempt failed");
                    println!("{}", format!("[*] Retry to get a screenshot of {}", url).yellow());
                }
            }
        }
    }
}
