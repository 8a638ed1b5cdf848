//! Image format detection and resizing.
//!
//! [`ImageTransform`] is the seam the dispatcher resizes through; [`RasterTransform`]
//! is the default implementation on top of the `image` crate.

mod raster;

use std::io::{Read, Write};

use crate::error::PreviewError;
use crate::size::PreviewSize;

pub use raster::RasterTransform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Tiff,
    Bmp,
    Webp,
}

impl ImageFormat {
    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Webp => "image/webp",
        }
    }

    /// Format of encoded bytes by their magic number.
    pub fn sniff(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes)
            .ok()
            .and_then(raster::from_codec_format)
    }

    /// Formats that may carry animation. Resizing them would keep one frame.
    pub fn is_animated(self) -> bool {
        matches!(self, ImageFormat::Gif)
    }
}

/// Extension to format, with or without the leading dot, case-insensitive.
pub fn format_from_extension(extension: &str) -> Result<ImageFormat, PreviewError> {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "png" => Ok(ImageFormat::Png),
        "gif" => Ok(ImageFormat::Gif),
        "tif" | "tiff" => Ok(ImageFormat::Tiff),
        "bmp" => Ok(ImageFormat::Bmp),
        "webp" => Ok(ImageFormat::Webp),
        _ => Err(PreviewError::UnsupportedFormat(extension.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Scale down to fit inside the bounds, keeping aspect ratio.
    Fit,
    /// Scale and crop to exactly the bounds.
    Fill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Quality {
    Low,
    Medium,
    High,
}

impl Quality {
    pub fn jpeg_quality(self) -> u8 {
        match self {
            Quality::Low => 60,
            Quality::Medium => 80,
            Quality::High => 90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    pub width: u32,
    pub height: u32,
    pub mode: ResizeMode,
    pub quality: Quality,
    /// `None` keeps the source format.
    pub format: Option<ImageFormat>,
}

impl TransformOptions {
    pub fn for_size(size: PreviewSize) -> Self {
        match size {
            PreviewSize::Big => Self {
                width: 1080,
                height: 1080,
                mode: ResizeMode::Fit,
                quality: Quality::Medium,
                format: None,
            },
            PreviewSize::Thumb => Self {
                width: 256,
                height: 256,
                mode: ResizeMode::Fill,
                quality: Quality::Low,
                format: Some(ImageFormat::Jpeg),
            },
        }
    }

    /// Content type of the produced bytes given the source format.
    pub fn output_mime(&self, source: ImageFormat) -> &'static str {
        self.format.unwrap_or(source).mime()
    }
}

/// Format detector and resizer. `resize` is blocking; callers run it off the
/// async executor. It returns the format actually written to `output`.
pub trait ImageTransform: Send + Sync {
    fn format_from_extension(&self, extension: &str) -> Result<ImageFormat, PreviewError> {
        format_from_extension(extension)
    }

    fn resize(
        &self,
        input: &mut dyn Read,
        width: u32,
        height: u32,
        output: &mut dyn Write,
        options: &TransformOptions,
    ) -> Result<ImageFormat, PreviewError>;
}
