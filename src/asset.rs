//! Asset descriptors: the single file a preview is requested for.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::PreviewError;

/// Media kind of an asset. Only images and videos can be previewed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Unsupported(String),
}

impl MediaKind {
    pub fn name(&self) -> &str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Unsupported(name) => name,
        }
    }
}

/// Extension (lower-case, no dot) → (MIME type, media kind name).
const KNOWN_TYPES: &[(&str, &str, &str)] = &[
    ("jpg", "image/jpeg", "image"),
    ("jpeg", "image/jpeg", "image"),
    ("png", "image/png", "image"),
    ("gif", "image/gif", "image"),
    ("bmp", "image/bmp", "image"),
    ("tif", "image/tiff", "image"),
    ("tiff", "image/tiff", "image"),
    ("webp", "image/webp", "image"),
    ("svg", "image/svg+xml", "image"),
    ("avif", "image/avif", "image"),
    ("heic", "image/heic", "image"),
    ("ico", "image/x-icon", "image"),
    ("mp4", "video/mp4", "video"),
    ("m4v", "video/x-m4v", "video"),
    ("mkv", "video/x-matroska", "video"),
    ("webm", "video/webm", "video"),
    ("mov", "video/quicktime", "video"),
    ("avi", "video/x-msvideo", "video"),
    ("wmv", "video/x-ms-wmv", "video"),
    ("flv", "video/x-flv", "video"),
    ("mpg", "video/mpeg", "video"),
    ("mpeg", "video/mpeg", "video"),
    ("3gp", "video/3gpp", "video"),
    ("ts", "video/mp2t", "video"),
    ("ogv", "video/ogg", "video"),
    ("mp3", "audio/mpeg", "audio"),
    ("flac", "audio/flac", "audio"),
    ("wav", "audio/wav", "audio"),
    ("ogg", "audio/ogg", "audio"),
    ("pdf", "application/pdf", "pdf"),
    ("txt", "text/plain; charset=utf-8", "text"),
    ("md", "text/markdown; charset=utf-8", "text"),
    ("json", "application/json", "text"),
];

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

fn lookup(extension: &str) -> Option<(&'static str, &'static str)> {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    KNOWN_TYPES
        .iter()
        .find(|(e, _, _)| *e == ext)
        .map(|(_, mime, kind)| (*mime, *kind))
}

/// Classifies a file extension (with or without leading dot).
pub fn media_kind_for_extension(extension: &str) -> MediaKind {
    match lookup(extension) {
        Some((_, "image")) => MediaKind::Image,
        Some((_, "video")) => MediaKind::Video,
        Some((_, other)) => MediaKind::Unsupported(other.to_string()),
        None => MediaKind::Unsupported("blob".to_string()),
    }
}

/// MIME type for a file extension; `application/octet-stream` when unknown.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    lookup(extension)
        .map(|(mime, _)| mime)
        .unwrap_or(FALLBACK_CONTENT_TYPE)
}

/// One file to preview. Immutable for the duration of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// Path as the user sees it (e.g. `/photos/a.jpg`).
    pub path: String,
    /// Canonical on-disk path; part of the cache key.
    pub real_path: PathBuf,
    pub modified: SystemTime,
    pub kind: MediaKind,
    pub size: u64,
    /// Extension including the leading dot, or empty.
    pub extension: String,
}

impl AssetDescriptor {
    pub fn new(
        path: impl Into<String>,
        real_path: impl Into<PathBuf>,
        modified: SystemTime,
        kind: MediaKind,
        size: u64,
    ) -> Self {
        let path = path.into();
        let extension = extension_of(&path);
        Self {
            path,
            real_path: real_path.into(),
            modified,
            kind,
            size,
            extension,
        }
    }

    /// Builds a descriptor from filesystem metadata, classifying by extension.
    pub fn from_path(path: impl Into<String>, real_path: &Path) -> Result<Self, PreviewError> {
        let meta = fs::metadata(real_path)?;
        if meta.is_dir() {
            return Err(PreviewError::UnsupportedMediaKind("directory".to_string()));
        }
        let path = path.into();
        let kind = media_kind_for_extension(&extension_of(&path));
        Ok(Self::new(path, real_path, meta.modified()?, kind, meta.len()))
    }

    /// Base name of the identity path.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn content_type(&self) -> &'static str {
        content_type_for_extension(&self.extension)
    }

    /// Modification time in whole seconds since the Unix epoch, floored.
    pub fn modified_unix(&self) -> i64 {
        unix_seconds(self.modified)
    }
}

pub(crate) fn unix_seconds(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => {
            let d = e.duration();
            let whole = d.as_secs() as i64;
            if d.subsec_nanos() > 0 {
                -whole - 1
            } else {
                -whole
            }
        }
    }
}

fn extension_of(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(idx) => name[idx..].to_string(),
        None => String::new(),
    }
}

/// Capabilities of the requesting principal. Only `download` gates previews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    #[serde(default)]
    pub download: bool,
    #[serde(default)]
    pub modify: bool,
}

impl Permissions {
    pub fn downloader() -> Self {
        Self {
            download: true,
            modify: false,
        }
    }
}
