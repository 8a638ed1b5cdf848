use std::io::{Cursor, Read, Write};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use super::{ImageFormat, ImageTransform, Quality, ResizeMode, TransformOptions};
use crate::error::PreviewError;

/// Resizer backed by the `image` crate. Decodes by content, not extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterTransform;

impl RasterTransform {
    pub fn new() -> Self {
        Self
    }
}

fn filter_for(quality: Quality) -> FilterType {
    match quality {
        Quality::Low => FilterType::Nearest,
        Quality::Medium => FilterType::Triangle,
        Quality::High => FilterType::Lanczos3,
    }
}

fn to_codec_format(format: ImageFormat) -> image::ImageFormat {
    match format {
        ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        ImageFormat::Png => image::ImageFormat::Png,
        ImageFormat::Gif => image::ImageFormat::Gif,
        ImageFormat::Tiff => image::ImageFormat::Tiff,
        ImageFormat::Bmp => image::ImageFormat::Bmp,
        ImageFormat::Webp => image::ImageFormat::WebP,
    }
}

pub(super) fn from_codec_format(format: image::ImageFormat) -> Option<ImageFormat> {
    match format {
        image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
        image::ImageFormat::Png => Some(ImageFormat::Png),
        image::ImageFormat::Gif => Some(ImageFormat::Gif),
        image::ImageFormat::Tiff => Some(ImageFormat::Tiff),
        image::ImageFormat::Bmp => Some(ImageFormat::Bmp),
        image::ImageFormat::WebP => Some(ImageFormat::Webp),
        _ => None,
    }
}

fn transform_err(e: impl std::fmt::Display) -> PreviewError {
    PreviewError::TransformFailed(e.to_string())
}

fn scale(img: DynamicImage, width: u32, height: u32, options: &TransformOptions) -> DynamicImage {
    let filter = filter_for(options.quality);
    match options.mode {
        ResizeMode::Fit => {
            let (w, h) = img.dimensions();
            if w <= width && h <= height {
                img
            } else {
                img.resize(width, height, filter)
            }
        }
        ResizeMode::Fill => img.resize_to_fill(width, height, filter),
    }
}

fn encode(
    img: &DynamicImage,
    format: ImageFormat,
    quality: Quality,
) -> Result<Vec<u8>, PreviewError> {
    let mut buf = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let rgb = img.to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, quality.jpeg_quality())
                .encode_image(&rgb)
                .map_err(transform_err)?;
        }
        other => {
            let mut cursor = Cursor::new(&mut buf);
            img.write_to(&mut cursor, to_codec_format(other))
                .map_err(transform_err)?;
        }
    }
    Ok(buf)
}

impl ImageTransform for RasterTransform {
    fn resize(
        &self,
        input: &mut dyn Read,
        width: u32,
        height: u32,
        output: &mut dyn Write,
        options: &TransformOptions,
    ) -> Result<ImageFormat, PreviewError> {
        if width == 0 || height == 0 {
            return Err(PreviewError::TransformFailed(
                "target dimensions must be non-zero".to_string(),
            ));
        }
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;

        let codec_format = image::guess_format(&data).map_err(transform_err)?;
        let source = from_codec_format(codec_format).ok_or_else(|| {
            PreviewError::UnsupportedFormat(format!("{:?}", codec_format).to_lowercase())
        })?;
        let decoded =
            image::load_from_memory_with_format(&data, codec_format).map_err(transform_err)?;

        let resized = scale(decoded, width, height, options);
        let written = options.format.unwrap_or(source);
        let bytes = encode(&resized, written, options.quality)?;
        output.write_all(&bytes)?;
        Ok(written)
    }
}
