#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use media_preview_core::error::PreviewError;
use media_preview_core::transform::{ImageFormat, ImageTransform, TransformOptions};
use media_preview_core::video::{FallbackTier, FrameExtractor, VideoPreviewer};
use media_preview_core::{AssetDescriptor, CacheError, CacheStore, PreviewService, PreviewSettings};

/// Tier a frame-extraction argument list was built for.
pub fn tier_of(args: &[String]) -> FallbackTier {
    if args.iter().any(|a| a == "-hwaccel") {
        FallbackTier::Gpu
    } else if args.iter().any(|a| a == "-skip_frame") {
        FallbackTier::Software
    } else {
        FallbackTier::Generous
    }
}

/// Transcoder stand-in that answers per tier and records every call.
pub struct ScriptedExtractor {
    responses: HashMap<FallbackTier, Result<Vec<u8>, String>>,
    delay: Duration,
    calls: Mutex<Vec<FallbackTier>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedExtractor {
    /// Every tier succeeds with `frame`.
    pub fn succeeding(frame: &[u8]) -> Self {
        Self::new(FallbackTier::ORDER.map(|tier| (tier, Ok::<_, String>(frame.to_vec()))))
    }

    /// Every tier fails with `stderr`.
    pub fn failing(stderr: &str) -> Self {
        Self::new(
            FallbackTier::ORDER.map(|tier| (tier, Err::<Vec<u8>, _>(stderr.to_string()))),
        )
    }

    pub fn new(
        responses: impl IntoIterator<Item = (FallbackTier, Result<Vec<u8>, String>)>,
    ) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<FallbackTier> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl FrameExtractor for ScriptedExtractor {
    fn extract(&self, args: &[String]) -> Result<Vec<u8>, PreviewError> {
        let tier = tier_of(args);
        self.calls.lock().push(tier);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.responses.get(&tier) {
            Some(Ok(bytes)) => Ok(bytes.clone()),
            Some(Err(stderr)) => Err(PreviewError::ffmpeg_failed(1, stderr.clone())),
            None => Err(PreviewError::ffmpeg_failed(1, "no scripted response")),
        }
    }
}

/// In-memory cache that counts operations and can be told to fail.
#[derive(Default)]
pub struct RecordingCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    stores: AtomicUsize,
    loads: AtomicUsize,
    fail_store: AtomicBool,
    fail_load: AtomicBool,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_stores() -> Self {
        let cache = Self::default();
        cache.fail_store.store(true, Ordering::SeqCst);
        cache
    }

    pub fn failing_loads() -> Self {
        let cache = Self::default();
        cache.fail_load.store(true, Ordering::SeqCst);
        cache
    }

    pub fn insert(&self, key: &str, value: &[u8]) {
        self.entries.lock().insert(key.to_string(), value.to_vec());
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Polls until at least `n` stores were attempted or two seconds pass.
    pub async fn wait_for_stores(&self, n: usize) -> usize {
        for _ in 0..200 {
            if self.store_count() >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.store_count()
    }
}

#[async_trait]
impl CacheStore for RecordingCache {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(CacheError("disk full".to_string()));
        }
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(CacheError("connection refused".to_string()));
        }
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Image resizer that ignores its input and writes a fixed payload. Reports
/// the forced output format, or PNG when the source format is kept.
pub struct CountingTransform {
    output: Vec<u8>,
    calls: AtomicUsize,
}

impl CountingTransform {
    pub fn new(output: &[u8]) -> Self {
        Self {
            output: output.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageTransform for CountingTransform {
    fn resize(
        &self,
        input: &mut dyn Read,
        _width: u32,
        _height: u32,
        output: &mut dyn Write,
        options: &TransformOptions,
    ) -> Result<ImageFormat, PreviewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut sink = Vec::new();
        input.read_to_end(&mut sink)?;
        output.write_all(&self.output)?;
        Ok(options.format.unwrap_or(ImageFormat::Png))
    }
}

pub fn service(
    cache: Arc<dyn CacheStore>,
    images: Arc<dyn ImageTransform>,
    extractor: Arc<dyn FrameExtractor>,
    settings: PreviewSettings,
) -> PreviewService {
    let video = VideoPreviewer::new(extractor, &settings);
    PreviewService::new(cache, images, video, settings)
}

/// Temporary directory of asset files; removed on drop.
pub struct AssetDir {
    dir: tempfile::TempDir,
}

impl AssetDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, bytes).expect("write asset");
        path
    }

    /// Writes `name` and describes it under the identity path `/<name>`.
    pub fn asset(&self, name: &str, bytes: &[u8]) -> AssetDescriptor {
        let path = self.write(name, bytes);
        describe(name, &path)
    }
}

pub fn describe(name: &str, path: &Path) -> AssetDescriptor {
    AssetDescriptor::from_path(format!("/{}", name), path).expect("describe asset")
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encoded(width, height, image::ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encoded(width, height, image::ImageFormat::Jpeg)
}

fn encoded(width: u32, height: u32, format: image::ImageFormat) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([30, 120, 200]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), format)
        .expect("encode image");
    buf
}
