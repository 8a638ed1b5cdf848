pub mod asset;
pub mod cache;
pub mod dispatch;
pub mod error;
pub mod raw;
pub mod response;
pub mod settings;
pub mod size;
pub mod transform;
pub mod video;

pub use asset::{AssetDescriptor, MediaKind, Permissions};
pub use cache::{CacheError, CacheKey, CacheStore, MemoryCache};
pub use dispatch::{Preview, PreviewService, RenderedPreview};
pub use error::PreviewError;
pub use raw::{RawAsset, serve_raw};
pub use response::{PreviewResponse, RequestContext, ResponseBody, respond};
pub use settings::PreviewSettings;
pub use size::PreviewSize;

use std::sync::Arc;

/// Executable name used when discovery finds nothing; the OS resolves it at spawn time.
const FALLBACK_FFMPEG: &str = "ffmpeg";

/// Builds a service with the `image`-crate resizer and a discovered FFmpeg.
///
/// A missing FFmpeg does not fail construction. Image previews and raw
/// passthrough keep working; video requests fail individually when the
/// transcoder cannot be spawned.
pub fn default_service(
    settings: PreviewSettings,
    cache: Arc<dyn CacheStore>,
) -> Result<PreviewService, PreviewError> {
    let runner = match video::discovery::resolve_ffmpeg_path(settings.ffmpeg_path.as_deref()) {
        Ok(path) => video::FfmpegRunner::new(path),
        Err(e) => {
            log::warn!(
                target: "media_preview",
                "{}; video previews will try `{}` from PATH",
                e,
                FALLBACK_FFMPEG
            );
            video::FfmpegRunner::new(FALLBACK_FFMPEG)
        }
    };
    log::info!(
        target: "media_preview",
        "Using FFmpeg at {} with {} concurrent video previews",
        runner.ffmpeg_path().display(),
        settings.effective_video_concurrency()
    );
    let video = video::VideoPreviewer::new(Arc::new(runner), &settings);
    Ok(PreviewService::new(
        cache,
        Arc::new(transform::RasterTransform::new()),
        video,
        settings,
    ))
}
