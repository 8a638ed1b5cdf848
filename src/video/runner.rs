//! FFmpeg process spawning for single-frame extraction.
//!
//! Spawns FFmpeg as a child process, collects the encoded frame from stdout and
//! a bounded tail of stderr on reader threads, then waits for exit.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

#[cfg(windows)]
use std::os::windows::process::CommandExt;

use parking_lot::Mutex;

use crate::error::PreviewError;

/// Keep only the last N bytes of stderr to avoid unbounded memory growth.
const MAX_STDERR_BYTES: usize = 64 * 1024;

/// Runs the external transcoder with the given arguments and returns stdout.
/// Blocking; called from the blocking pool.
pub trait FrameExtractor: Send + Sync {
    fn extract(&self, args: &[String]) -> Result<Vec<u8>, PreviewError>;
}

#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    ffmpeg_path: PathBuf,
}

impl FfmpegRunner {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }
}

fn collect_stderr<R: Read + Send + 'static>(
    reader: R,
    buffer: Arc<Mutex<Vec<u8>>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut stream_reader = BufReader::new(reader);
        let mut line_buf = Vec::with_capacity(256);
        while stream_reader.read_until(b'\n', &mut line_buf).unwrap_or(0) > 0 {
            let mut guard = buffer.lock();
            guard.extend_from_slice(&line_buf);
            if guard.len() > MAX_STDERR_BYTES {
                let excess = guard.len() - MAX_STDERR_BYTES;
                guard.drain(..excess);
            }
            drop(guard);
            line_buf.clear();
        }
    })
}

fn collect_stdout<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut out = Vec::new();
        let _ = reader.read_to_end(&mut out);
        out
    })
}

impl FrameExtractor for FfmpegRunner {
    fn extract(&self, args: &[String]) -> Result<Vec<u8>, PreviewError> {
        let input_arg = args
            .iter()
            .position(|a| a == "-i")
            .and_then(|i| args.get(i + 1));
        log::debug!(
            target: "media_preview::video::runner",
            "Spawning FFmpeg: path={}, input={:?}",
            self.ffmpeg_path.display(),
            input_arg
        );

        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(windows)]
        cmd.creation_flags(0x08000000); // CREATE_NO_WINDOW
        let mut child = cmd
            .spawn()
            .map_err(|e| format!("Failed to spawn FFmpeg: {}", e))?;

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(out), Some(err)) => (out, err),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PreviewError::from("Failed to capture FFmpeg output"));
            }
        };

        let stderr_buffer = Arc::new(Mutex::new(Vec::new()));
        let stdout_handle = collect_stdout(stdout);
        let stderr_handle = collect_stderr(stderr, Arc::clone(&stderr_buffer));

        let frame = stdout_handle.join().unwrap_or_default();
        let _ = stderr_handle.join();
        let status = child.wait()?;

        let stderr_str = String::from_utf8_lossy(&stderr_buffer.lock()).to_string();
        if !status.success() {
            let code = status.code().unwrap_or(-1);
            return Err(PreviewError::FfmpegFailed {
                code,
                stderr: stderr_str,
            });
        }
        if frame.is_empty() {
            return Err(PreviewError::ffmpeg_failed(
                0,
                format!("FFmpeg produced no output\n{}", stderr_str),
            ));
        }
        Ok(frame)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-ffmpeg");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    #[serial_test::serial(process_spawn)]
    fn returns_stdout_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FfmpegRunner::new(script(dir.path(), "printf 'RIFFwebp'"));
        let out = runner.extract(&["-i".into(), "x".into()]).unwrap();
        assert_eq!(out, b"RIFFwebp");
    }

    #[test]
    #[serial_test::serial(process_spawn)]
    fn non_zero_exit_keeps_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FfmpegRunner::new(script(
            dir.path(),
            "echo 'No such filter: thumbnail_cuda' >&2; exit 1",
        ));
        match runner.extract(&[]).unwrap_err() {
            PreviewError::FfmpegFailed { code, stderr } => {
                assert_eq!(code, 1);
                assert!(stderr.contains("thumbnail_cuda"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    #[serial_test::serial(process_spawn)]
    fn empty_output_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FfmpegRunner::new(script(dir.path(), "exit 0"));
        assert!(matches!(
            runner.extract(&[]),
            Err(PreviewError::FfmpegFailed { code: 0, .. })
        ));
    }

    #[test]
    #[serial_test::serial(process_spawn)]
    fn missing_binary_is_spawn_failure() {
        let runner = FfmpegRunner::new("/nonexistent/ffmpeg");
        assert!(matches!(
            runner.extract(&[]),
            Err(PreviewError::FfmpegFailed { code: -1, .. })
        ));
    }
}
