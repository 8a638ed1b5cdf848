//! Preview error type. Implements Display, a status mapping, and Serialize for sidecar clients.

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("permission denied")]
    PermissionDenied,

    #[error("can't create preview for {0} type")]
    UnsupportedMediaKind(String),

    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("transform failed: {0}")]
    TransformFailed(String),

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    FfmpegNotFound(String),

    #[error("FFmpeg failed (code {code}): {stderr}")]
    FfmpegFailed { code: i32, stderr: String },

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl PreviewError {
    pub fn ffmpeg_failed(code: i32, stderr: impl Into<String>) -> Self {
        Self::FfmpegFailed {
            code,
            stderr: stderr.into(),
        }
    }

    /// Default error-to-status policy for the HTTP surface.
    pub fn status_code(&self) -> u16 {
        match self {
            PreviewError::InvalidRequest(_) => 400,
            PreviewError::PermissionDenied => 202,
            PreviewError::UnsupportedMediaKind(_) => 501,
            PreviewError::UnsupportedFormat(_) => 415,
            PreviewError::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => 404,
                std::io::ErrorKind::PermissionDenied => 403,
                _ => 500,
            },
            _ => 500,
        }
    }

    /// Short summary plus full detail, for logs and sidecar responses.
    pub fn payload(&self) -> ErrorPayload {
        match self {
            PreviewError::FfmpegFailed { code, stderr } => parse_ffmpeg_error(stderr, Some(*code)),
            other => {
                let text = other.to_string();
                ErrorPayload {
                    summary: text.clone(),
                    detail: text,
                }
            }
        }
    }
}

impl Serialize for PreviewError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.payload().serialize(serializer)
    }
}

impl From<String> for PreviewError {
    fn from(s: String) -> Self {
        PreviewError::FfmpegFailed {
            code: -1,
            stderr: s,
        }
    }
}

impl From<&str> for PreviewError {
    fn from(s: &str) -> Self {
        s.to_string().into()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub summary: String,
    pub detail: String,
}

const ELLIPSIS: &str = "…";

/// Maps an FFmpeg exit code to a short summary. Stderr is kept as detail.
///
/// Exit codes are from ffmpeg.c: 1 (general), 69 (rate exceeded),
/// 123 (hard exit), 255 (signal). -1 is used for spawn failure.
pub fn parse_ffmpeg_error(stderr: &str, exit_code: Option<i32>) -> ErrorPayload {
    let summary = match exit_code {
        Some(-1) => "FFmpeg not found or failed to start.".to_string(),
        Some(1) => "FFmpeg failed.".to_string(),
        Some(69) => "Frame extraction rate limit exceeded.".to_string(),
        Some(123) | Some(255) => "Frame extraction was stopped.".to_string(),
        Some(code) => format!("FFmpeg failed (exit code {}).", code),
        None => first_line_truncated(stderr, 120),
    };
    ErrorPayload {
        summary,
        detail: stderr.trim().to_string(),
    }
}

fn first_line_truncated(stderr: &str, max_len: usize) -> String {
    let first = stderr
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    if first.len() <= max_len {
        return first.to_string();
    }
    let mut cut = max_len.saturating_sub(ELLIPSIS.len());
    while !first.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &first[..cut], ELLIPSIS)
}
