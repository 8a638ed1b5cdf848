//! Locates the FFmpeg binary once at service start.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::PreviewError;

fn find_in_path() -> Option<PathBuf> {
    let lookup = if cfg!(windows) { "where" } else { "which" };
    let output = Command::new(lookup).arg("ffmpeg").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout.lines().next()?.trim();
    if first.is_empty() {
        None
    } else {
        Some(PathBuf::from(first))
    }
}

const FFMPEG_EXE: &str = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };

/// FFmpeg shipped next to the running binary, as the sidecar bundle lays it out.
fn bundled_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(bundled_in(exe.parent()?))
}

fn bundled_in(dir: &Path) -> PathBuf {
    dir.join(FFMPEG_EXE)
}

/// Install locations checked before falling back to a PATH lookup.
fn install_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = bundled_path().into_iter().collect();
    let system: &[&str] = if cfg!(target_os = "macos") {
        &["/opt/homebrew/bin", "/usr/local/bin"]
    } else if cfg!(windows) {
        &["C:\\ffmpeg\\bin", "C:\\Program Files\\ffmpeg\\bin"]
    } else {
        &["/usr/bin", "/usr/local/bin", "/opt/media-preview/bin"]
    };
    paths.extend(system.iter().map(|dir| Path::new(dir).join(FFMPEG_EXE)));
    paths
}

/// Resolution order: explicit path, `FFMPEG_PATH`, a bundled binary next to the
/// executable, system install locations, PATH lookup.
/// Candidates that do not exist are skipped.
pub fn resolve_ffmpeg_path(explicit: Option<&Path>) -> Result<PathBuf, PreviewError> {
    if let Some(p) = explicit {
        if p.exists() {
            log::debug!(
                target: "media_preview::video::discovery",
                "FFmpeg path from settings: {}",
                p.display()
            );
            return Ok(p.to_path_buf());
        }
        log::warn!(
            target: "media_preview::video::discovery",
            "Configured FFmpeg path does not exist: {}",
            p.display()
        );
    }

    if let Some(p) = std::env::var_os("FFMPEG_PATH").map(PathBuf::from) {
        if p.exists() {
            log::debug!(
                target: "media_preview::video::discovery",
                "FFmpeg path from FFMPEG_PATH env: {}",
                p.display()
            );
            return Ok(p);
        }
    }

    for path in install_paths() {
        if path.exists() {
            log::debug!(
                target: "media_preview::video::discovery",
                "FFmpeg found at install location: {}",
                path.display()
            );
            return Ok(path);
        }
    }

    if let Some(p) = find_in_path().filter(|p| p.exists()) {
        log::debug!(
            target: "media_preview::video::discovery",
            "FFmpeg found in PATH: {}",
            p.display()
        );
        return Ok(p);
    }

    log::error!(
        target: "media_preview::video::discovery",
        "FFmpeg not found in settings, FFMPEG_PATH, PATH or common locations"
    );
    Err(PreviewError::FfmpegNotFound(
        "FFmpeg not found. Install FFmpeg or set FFMPEG_PATH:\n  - macOS: brew install ffmpeg\n  - Linux: sudo apt install ffmpeg\n  - Windows: Download from https://ffmpeg.org/download.html"
            .to_string(),
    ))
}
