//! FFmpeg argument profiles for the three frame-extraction tiers.

use std::fmt;
use std::path::Path;

use crate::size::PreviewSize;

/// One tier of the degrading fallback chain, in attempt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackTier {
    /// CUDA decode and scale.
    Gpu,
    /// Same filter graph on the CPU.
    Software,
    /// Permissive square thumbnail: no seek, every frame decoded.
    Generous,
}

impl FallbackTier {
    pub const ORDER: [FallbackTier; 3] = [
        FallbackTier::Gpu,
        FallbackTier::Software,
        FallbackTier::Generous,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FallbackTier::Gpu => "gpu",
            FallbackTier::Software => "software",
            FallbackTier::Generous => "generous",
        }
    }
}

impl fmt::Display for FallbackTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target frame bounds for a size class.
pub fn frame_dimensions(size: PreviewSize) -> (u32, u32) {
    match size {
        PreviewSize::Thumb => (256, 256),
        PreviewSize::Big => (1280, 720),
    }
}

const GENEROUS_FILTER: &str = r"thumbnail,crop=w='min(iw\,ih)':h='min(iw\,ih)',scale=256:256";

pub fn filter_graph(tier: FallbackTier, size: PreviewSize) -> String {
    let (width, height) = frame_dimensions(size);
    match (tier, size) {
        (FallbackTier::Gpu, PreviewSize::Thumb) => format!(
            "thumbnail_cuda=n=300,scale_cuda={}:{},hwdownload,format=nv12",
            width, height
        ),
        (FallbackTier::Gpu, PreviewSize::Big) => format!(
            "thumbnail_cuda=n=300,scale_cuda={}:{}:force_original_aspect_ratio=decrease,hwdownload,format=nv12",
            width, height
        ),
        (FallbackTier::Software, PreviewSize::Thumb) => format!(
            r"thumbnail=n=300,crop=w='min(iw\,ih)':h='min(iw\,ih)',scale={}:{}",
            width, height
        ),
        (FallbackTier::Software, PreviewSize::Big) => format!(
            r"thumbnail=n=300,scale='min({}\,iw)':'min({}\,ih)'",
            width, height
        ),
        (FallbackTier::Generous, _) => GENEROUS_FILTER.to_string(),
    }
}

/// Builds the full argument list for one tier. Output is a single WebP frame on stdout.
pub fn build_frame_args(
    tier: FallbackTier,
    size: PreviewSize,
    input: &Path,
    seek_seconds: u32,
    quality: u32,
) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".into()];
    if tier == FallbackTier::Gpu {
        args.extend(
            ["-hwaccel", "cuda", "-hwaccel_output_format", "cuda"]
                .iter()
                .map(|s| s.to_string()),
        );
    }
    if tier != FallbackTier::Generous {
        args.extend([
            "-skip_frame".into(),
            "nokey".into(),
            "-ss".into(),
            seek_seconds.to_string(),
        ]);
    }
    args.extend([
        "-i".into(),
        input.to_string_lossy().to_string(),
        "-vf".into(),
        filter_graph(tier, size),
        "-quality".into(),
        quality.to_string(),
        "-frames:v".into(),
        "1".into(),
        "-c:v".into(),
        "webp".into(),
        "-f".into(),
        "webp".into(),
        "-".into(),
    ]);
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn gpu_tier_uses_cuda_and_keyframe_seek() {
        let args = build_frame_args(
            FallbackTier::Gpu,
            PreviewSize::Thumb,
            Path::new("/v/a.mp4"),
            5,
            90,
        );
        assert_eq!(value_after(&args, "-hwaccel"), Some("cuda"));
        assert_eq!(value_after(&args, "-skip_frame"), Some("nokey"));
        assert_eq!(value_after(&args, "-ss"), Some("5"));
        assert_eq!(value_after(&args, "-i"), Some("/v/a.mp4"));
        assert!(value_after(&args, "-vf").unwrap().starts_with("thumbnail_cuda"));
        assert_eq!(args.last().map(String::as_str), Some("-"));
    }

    #[test]
    fn software_tier_has_no_hwaccel() {
        let args = build_frame_args(
            FallbackTier::Software,
            PreviewSize::Big,
            Path::new("in.mkv"),
            5,
            90,
        );
        assert!(!args.iter().any(|a| a == "-hwaccel"));
        assert_eq!(
            value_after(&args, "-vf"),
            Some(r"thumbnail=n=300,scale='min(1280\,iw)':'min(720\,ih)'")
        );
    }

    #[test]
    fn generous_tier_drops_seek_and_keyframe_restriction() {
        for size in [PreviewSize::Thumb, PreviewSize::Big] {
            let args =
                build_frame_args(FallbackTier::Generous, size, Path::new("in.mkv"), 5, 90);
            assert!(!args.iter().any(|a| a == "-ss" || a == "-skip_frame"));
            assert_eq!(value_after(&args, "-vf"), Some(GENEROUS_FILTER));
            assert_eq!(value_after(&args, "-c:v"), Some("webp"));
            assert_eq!(value_after(&args, "-frames:v"), Some("1"));
        }
    }

    #[test]
    fn thumb_filters_crop_to_square() {
        let graph = filter_graph(FallbackTier::Software, PreviewSize::Thumb);
        assert!(graph.contains("crop=w='min(iw\\,ih)'"));
        assert!(graph.ends_with("scale=256:256"));
    }
}
