//! Service-wide preview settings.
//!
//! All fields are optional so a partial JSON document or an empty environment
//! is valid; the `effective_*` accessors supply defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::PreviewError;

pub const DEFAULT_VIDEO_CONCURRENCY: usize = 3;
pub const DEFAULT_VIDEO_SEEK_SECONDS: u32 = 5;
pub const DEFAULT_VIDEO_QUALITY: u32 = 90;
pub const DEFAULT_DIAGNOSTIC_TAIL_LINES: usize = 10;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSettings {
    pub enable_thumbnails: Option<bool>,
    pub resize_preview: Option<bool>,
    pub video_concurrency: Option<usize>,
    pub ffmpeg_path: Option<PathBuf>,
    pub video_seek_seconds: Option<u32>,
    pub video_quality: Option<u32>,
    pub diagnostic_tail_lines: Option<usize>,
}

impl PreviewSettings {
    pub fn from_json(json: &str) -> Result<Self, PreviewError> {
        serde_json::from_str(json)
            .map_err(|e| PreviewError::InvalidRequest(format!("invalid settings: {}", e)))
    }

    /// Applies `PREVIEW_ENABLE_THUMBNAILS`, `PREVIEW_RESIZE`,
    /// `PREVIEW_VIDEO_CONCURRENCY` and `FFMPEG_PATH` on top of `self`.
    /// Unparseable values are ignored with a warning.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("PREVIEW_ENABLE_THUMBNAILS") {
            match parse_flag(&v) {
                Some(b) => self.enable_thumbnails = Some(b),
                None => warn_ignored("PREVIEW_ENABLE_THUMBNAILS", &v),
            }
        }
        if let Some(v) = lookup("PREVIEW_RESIZE") {
            match parse_flag(&v) {
                Some(b) => self.resize_preview = Some(b),
                None => warn_ignored("PREVIEW_RESIZE", &v),
            }
        }
        if let Some(v) = lookup("PREVIEW_VIDEO_CONCURRENCY") {
            match v.trim().parse::<usize>() {
                Ok(n) => self.video_concurrency = Some(n),
                Err(_) => warn_ignored("PREVIEW_VIDEO_CONCURRENCY", &v),
            }
        }
        if let Some(v) = lookup("FFMPEG_PATH").filter(|v| !v.trim().is_empty()) {
            self.ffmpeg_path = Some(PathBuf::from(v));
        }
        self
    }

    pub fn effective_enable_thumbnails(&self) -> bool {
        self.enable_thumbnails.unwrap_or(true)
    }

    pub fn effective_resize_preview(&self) -> bool {
        self.resize_preview.unwrap_or(true)
    }

    pub fn effective_video_concurrency(&self) -> usize {
        self.video_concurrency
            .unwrap_or(DEFAULT_VIDEO_CONCURRENCY)
            .max(1)
    }

    pub fn effective_video_seek_seconds(&self) -> u32 {
        self.video_seek_seconds.unwrap_or(DEFAULT_VIDEO_SEEK_SECONDS)
    }

    pub fn effective_video_quality(&self) -> u32 {
        self.video_quality.unwrap_or(DEFAULT_VIDEO_QUALITY).min(100)
    }

    pub fn effective_diagnostic_tail_lines(&self) -> usize {
        self.diagnostic_tail_lines
            .unwrap_or(DEFAULT_DIAGNOSTIC_TAIL_LINES)
            .max(1)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn warn_ignored(name: &str, value: &str) {
    log::warn!(
        target: "media_preview::settings",
        "Ignoring {}={:?}: not a valid value",
        name,
        value
    );
}
