//! Video frame previews: a bounded pool of transcoder runs, each walking the
//! fallback chain on the blocking thread pool.

mod chain;
pub mod discovery;
mod limiter;
mod profile;
mod runner;

use std::path::PathBuf;
use std::sync::Arc;

pub use chain::{AttemptOutcome, FallbackAttempt, FallbackChain, FallbackOutcome, diagnostic_tail};
pub use limiter::{ConcurrencyLimiter, GenerationPermit};
pub use profile::{FallbackTier, build_frame_args, filter_graph, frame_dimensions};
pub use runner::{FfmpegRunner, FrameExtractor};

use crate::error::PreviewError;
use crate::settings::PreviewSettings;
use crate::size::PreviewSize;

/// Content type of every generated video frame.
pub const VIDEO_PREVIEW_CONTENT_TYPE: &str = "image/webp";

pub struct VideoPreviewer {
    chain: Arc<FallbackChain>,
    limiter: ConcurrencyLimiter,
}

impl VideoPreviewer {
    pub fn new(extractor: Arc<dyn FrameExtractor>, settings: &PreviewSettings) -> Self {
        Self::with_limiter(
            extractor,
            settings,
            ConcurrencyLimiter::new(settings.effective_video_concurrency()),
        )
    }

    /// Shares an existing limiter, e.g. between several previewers in one process.
    pub fn with_limiter(
        extractor: Arc<dyn FrameExtractor>,
        settings: &PreviewSettings,
        limiter: ConcurrencyLimiter,
    ) -> Self {
        Self {
            chain: Arc::new(FallbackChain::new(extractor, settings)),
            limiter,
        }
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Waits for a slot, then runs the chain on the blocking pool.
    ///
    /// The permit moves into the blocking job, so a running transcoder keeps its
    /// slot until it exits even if the caller stops waiting. `on_success` runs on
    /// that job with the frame bytes before they are returned.
    pub async fn generate<F>(
        &self,
        input: PathBuf,
        size: PreviewSize,
        on_success: F,
    ) -> Result<FallbackOutcome, PreviewError>
    where
        F: FnOnce(&[u8]) + Send + 'static,
    {
        let permit = self.limiter.acquire().await?;
        let chain = Arc::clone(&self.chain);
        let result = tokio::task::spawn_blocking(move || -> Result<FallbackOutcome, PreviewError> {
            let _permit = permit;
            let outcome = chain.run(&input, size)?;
            on_success(&outcome.bytes);
            Ok(outcome)
        })
        .await;

        match result {
            Ok(outcome) => outcome,
            Err(join_err) => Err(PreviewError::from(join_err.to_string())),
        }
    }
}
