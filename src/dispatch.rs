//! Preview entry point: policy gates, cache-aside lookup, and routing to the
//! image, video or raw path.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use std::time::SystemTime;

use crate::asset::{AssetDescriptor, MediaKind, Permissions};
use crate::cache::{CacheKey, CacheStore};
use crate::error::PreviewError;
use crate::raw::{RawAsset, serve_raw};
use crate::settings::PreviewSettings;
use crate::size::PreviewSize;
use crate::transform::{ImageFormat, ImageTransform, TransformOptions};
use crate::video::{VIDEO_PREVIEW_CONTENT_TYPE, VideoPreviewer};

/// Encoded preview bytes plus what the response needs to serve them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPreview {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub name: String,
    pub modified: SystemTime,
    pub from_cache: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    Rendered(RenderedPreview),
    Original(RawAsset),
}

/// Shared service; construct once and pass by reference or `Arc`.
pub struct PreviewService {
    cache: Arc<dyn CacheStore>,
    images: Arc<dyn ImageTransform>,
    video: VideoPreviewer,
    settings: PreviewSettings,
}

impl PreviewService {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        images: Arc<dyn ImageTransform>,
        video: VideoPreviewer,
        settings: PreviewSettings,
    ) -> Self {
        Self {
            cache,
            images,
            video,
            settings,
        }
    }

    pub fn settings(&self) -> &PreviewSettings {
        &self.settings
    }

    /// Permission is checked before the size token so a refused principal
    /// always gets [`PreviewError::PermissionDenied`].
    pub async fn generate_preview(
        &self,
        permissions: &Permissions,
        asset: &AssetDescriptor,
        size_token: &str,
    ) -> Result<Preview, PreviewError> {
        if !permissions.download {
            return Err(PreviewError::PermissionDenied);
        }
        let size: PreviewSize = size_token.parse()?;
        log::debug!(
            target: "media_preview::dispatch",
            "{} preview of {} ({})",
            size,
            asset.path,
            asset.kind.name()
        );

        match &asset.kind {
            MediaKind::Image => self.image_preview(asset, size).await,
            MediaKind::Video => self.video_preview(asset, size).await,
            MediaKind::Unsupported(_) => Err(PreviewError::UnsupportedMediaKind(
                asset.kind.name().to_string(),
            )),
        }
    }

    async fn image_preview(
        &self,
        asset: &AssetDescriptor,
        size: PreviewSize,
    ) -> Result<Preview, PreviewError> {
        let enabled = match size {
            PreviewSize::Big => self.settings.effective_resize_preview(),
            PreviewSize::Thumb => self.settings.effective_enable_thumbnails(),
        };
        if !enabled {
            return Ok(Preview::Original(serve_raw(asset)));
        }

        let format = match self.images.format_from_extension(&asset.extension) {
            Ok(format) if format.is_animated() => return Ok(Preview::Original(serve_raw(asset))),
            Ok(format) => format,
            Err(PreviewError::UnsupportedFormat(_)) => {
                return Ok(Preview::Original(serve_raw(asset)));
            }
            Err(e) => return Err(e),
        };

        let options = TransformOptions::for_size(size);
        let key = CacheKey::derive(asset, size);

        if let Some(bytes) = self.load_cached(&key).await? {
            let content_type = ImageFormat::sniff(&bytes)
                .map(ImageFormat::mime)
                .unwrap_or_else(|| options.output_mime(format));
            return Ok(rendered(asset, bytes, content_type, true));
        }

        let (bytes, written) = self.resize_image(asset, options).await?;
        if written != options.format.unwrap_or(format) {
            log::debug!(
                target: "media_preview::dispatch",
                "{} is {:?} despite its extension",
                asset.path,
                written
            );
        }
        store_in_background(Arc::clone(&self.cache), key, bytes.clone());
        Ok(rendered(asset, bytes, written.mime(), false))
    }

    async fn video_preview(
        &self,
        asset: &AssetDescriptor,
        size: PreviewSize,
    ) -> Result<Preview, PreviewError> {
        let key = CacheKey::derive(asset, size);
        if let Some(bytes) = self.load_cached(&key).await? {
            return Ok(rendered(asset, bytes, VIDEO_PREVIEW_CONTENT_TYPE, true));
        }

        let cache = Arc::clone(&self.cache);
        let runtime = tokio::runtime::Handle::current();
        let outcome = self
            .video
            .generate(asset.real_path.clone(), size, move |bytes| {
                let _ = runtime.spawn(store_task(cache, key, bytes.to_vec()));
            })
            .await?;

        Ok(rendered(
            asset,
            outcome.bytes,
            VIDEO_PREVIEW_CONTENT_TYPE,
            false,
        ))
    }

    /// A load failure stops the request: without knowing cache state we do not
    /// start generation.
    async fn load_cached(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, PreviewError> {
        match self.cache.load(key.as_str()).await {
            Ok(Some(bytes)) => {
                log::debug!(target: "media_preview::dispatch", "cache hit {}", key);
                Ok(Some(bytes))
            }
            Ok(None) => {
                log::debug!(target: "media_preview::dispatch", "cache miss {}", key);
                Ok(None)
            }
            Err(e) => Err(PreviewError::CacheUnavailable(e.to_string())),
        }
    }

    async fn resize_image(
        &self,
        asset: &AssetDescriptor,
        options: TransformOptions,
    ) -> Result<(Vec<u8>, ImageFormat), PreviewError> {
        let images = Arc::clone(&self.images);
        let path = asset.real_path.clone();
        let result = tokio::task::spawn_blocking(move || -> Result<_, PreviewError> {
            let file = File::open(&path)?;
            let mut reader = BufReader::new(file);
            let mut out = Vec::new();
            let written = images
                .resize(&mut reader, options.width, options.height, &mut out, &options)
                .map_err(|e| match e {
                    PreviewError::TransformFailed(_) => e,
                    other => PreviewError::TransformFailed(other.to_string()),
                })?;
            Ok((out, written))
        })
        .await;

        match result {
            Ok(bytes) => bytes,
            Err(join_err) => Err(PreviewError::TransformFailed(join_err.to_string())),
        }
    }
}

fn rendered(
    asset: &AssetDescriptor,
    bytes: Vec<u8>,
    content_type: &'static str,
    from_cache: bool,
) -> Preview {
    Preview::Rendered(RenderedPreview {
        bytes,
        content_type,
        name: asset.name().to_string(),
        modified: asset.modified,
        from_cache,
    })
}

/// Detached write with its own lifetime; failure is logged, never returned.
fn store_in_background(cache: Arc<dyn CacheStore>, key: CacheKey, bytes: Vec<u8>) {
    tokio::spawn(store_task(cache, key, bytes));
}

async fn store_task(cache: Arc<dyn CacheStore>, key: CacheKey, bytes: Vec<u8>) {
    if let Err(e) = cache.store(key.as_str(), bytes).await {
        log::warn!(
            target: "media_preview::dispatch",
            "failed to cache resized image {}: {}",
            key,
            e
        );
    }
}
