//! Degrading fallback chain: GPU, then software, then the generous profile.
//! The first tier to produce a frame wins; failed tiers leave only log output.

use std::path::Path;
use std::sync::Arc;

use super::profile::{FallbackTier, build_frame_args};
use super::runner::FrameExtractor;
use crate::error::PreviewError;
use crate::settings::PreviewSettings;
use crate::size::PreviewSize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    /// Trailing diagnostic lines from the failed run.
    Failed { diagnostics: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackAttempt {
    pub tier: FallbackTier,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone)]
pub struct FallbackOutcome {
    pub bytes: Vec<u8>,
    pub tier: FallbackTier,
    pub attempts: Vec<FallbackAttempt>,
}

/// Last `max_lines` lines of `text`, trimmed. Short input is returned whole.
pub fn diagnostic_tail(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n").trim().to_string()
}

fn diagnostics_of(err: &PreviewError) -> String {
    match err {
        PreviewError::FfmpegFailed { stderr, .. } => stderr.clone(),
        other => other.to_string(),
    }
}

pub struct FallbackChain {
    extractor: Arc<dyn FrameExtractor>,
    seek_seconds: u32,
    quality: u32,
    tail_lines: usize,
}

impl FallbackChain {
    pub fn new(extractor: Arc<dyn FrameExtractor>, settings: &PreviewSettings) -> Self {
        Self {
            extractor,
            seek_seconds: settings.effective_video_seek_seconds(),
            quality: settings.effective_video_quality(),
            tail_lines: settings.effective_diagnostic_tail_lines(),
        }
    }

    /// Runs the tiers in order. Blocking. On total failure returns the
    /// generous tier's error.
    pub fn run(&self, input: &Path, size: PreviewSize) -> Result<FallbackOutcome, PreviewError> {
        let mut attempts = Vec::with_capacity(FallbackTier::ORDER.len());
        let mut last_err = None;

        for tier in FallbackTier::ORDER {
            let args = build_frame_args(tier, size, input, self.seek_seconds, self.quality);
            match self.extractor.extract(&args) {
                Ok(bytes) => {
                    attempts.push(FallbackAttempt {
                        tier,
                        outcome: AttemptOutcome::Succeeded,
                    });
                    log::debug!(
                        target: "media_preview::video::chain",
                        "{} preview for {} produced by {} tier ({} bytes)",
                        size,
                        input.display(),
                        tier,
                        bytes.len()
                    );
                    return Ok(FallbackOutcome {
                        bytes,
                        tier,
                        attempts,
                    });
                }
                Err(err) => {
                    let diagnostics = diagnostic_tail(&diagnostics_of(&err), self.tail_lines);
                    log::warn!(
                        target: "media_preview::video::chain",
                        "{} preview failed for {}: {}",
                        tier,
                        input.display(),
                        diagnostics
                    );
                    attempts.push(FallbackAttempt {
                        tier,
                        outcome: AttemptOutcome::Failed { diagnostics },
                    });
                    last_err = Some(err);
                }
            }
        }

        log::error!(
            target: "media_preview::video::chain",
            "All {} preview tiers failed for {}",
            attempts.len(),
            input.display()
        );
        Err(last_err.unwrap_or_else(|| PreviewError::from("no fallback tier attempted")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Fails the first `failures` calls, then echoes the tier's filter graph.
    struct Scripted {
        failures: usize,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl FrameExtractor for Scripted {
        fn extract(&self, args: &[String]) -> Result<Vec<u8>, PreviewError> {
            let mut calls = self.calls.lock();
            calls.push(args.to_vec());
            if calls.len() <= self.failures {
                let stderr: String = (1..=15).map(|i| format!("line {i}\n")).collect();
                return Err(PreviewError::ffmpeg_failed(1, stderr));
            }
            Ok(format!("frame-{}", calls.len()).into_bytes())
        }
    }

    fn chain(failures: usize) -> (FallbackChain, Arc<Scripted>) {
        let scripted = Arc::new(Scripted {
            failures,
            calls: Mutex::new(Vec::new()),
        });
        let chain = FallbackChain::new(
            Arc::clone(&scripted) as Arc<dyn FrameExtractor>,
            &PreviewSettings::default(),
        );
        (chain, scripted)
    }

    #[test]
    fn first_success_stops_the_chain() {
        let (chain, scripted) = chain(0);
        let out = chain.run(Path::new("a.mp4"), PreviewSize::Thumb).unwrap();
        assert_eq!(out.tier, FallbackTier::Gpu);
        assert_eq!(out.bytes, b"frame-1");
        assert_eq!(scripted.calls.lock().len(), 1);
    }

    #[test]
    fn generous_tier_result_is_kept_after_two_failures() {
        let (chain, scripted) = chain(2);
        let out = chain.run(Path::new("a.mp4"), PreviewSize::Big).unwrap();
        assert_eq!(out.tier, FallbackTier::Generous);
        assert_eq!(out.bytes, b"frame-3");
        assert_eq!(out.attempts.len(), 3);
        match &out.attempts[0].outcome {
            AttemptOutcome::Failed { diagnostics } => {
                assert_eq!(diagnostics.lines().count(), 10);
                assert!(diagnostics.starts_with("line 6"));
                assert!(diagnostics.ends_with("line 15"));
            }
            other => panic!("unexpected {other:?}"),
        }
        let calls = scripted.calls.lock();
        assert!(calls[0].iter().any(|a| a == "-hwaccel"));
        assert!(!calls[1].iter().any(|a| a == "-hwaccel"));
        assert!(!calls[2].iter().any(|a| a == "-ss"));
    }

    #[test]
    fn total_failure_surfaces_last_error() {
        let (chain, scripted) = chain(3);
        let err = chain.run(Path::new("a.mp4"), PreviewSize::Thumb).unwrap_err();
        assert!(matches!(err, PreviewError::FfmpegFailed { code: 1, .. }));
        assert_eq!(scripted.calls.lock().len(), 3);
    }

    #[test]
    fn tail_handles_short_output() {
        assert_eq!(diagnostic_tail("only\n", 10), "only");
        assert_eq!(diagnostic_tail("", 10), "");
        assert_eq!(diagnostic_tail("a\nb\nc", 2), "b\nc");
    }
}
