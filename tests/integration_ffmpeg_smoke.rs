mod support;

use std::process::{Command, Stdio};
use std::sync::Arc;

use media_preview_core::video::discovery::resolve_ffmpeg_path;
use media_preview_core::{MemoryCache, Permissions, Preview, PreviewSettings, default_service};

use support::{AssetDir, describe};

fn is_webp(bytes: &[u8]) -> bool {
    bytes.len() > 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP"
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires an FFmpeg build with libwebp on PATH or FFMPEG_PATH"]
async fn real_ffmpeg_extracts_webp_frames_for_both_sizes() {
    let ffmpeg = resolve_ffmpeg_path(None).expect("resolve ffmpeg");
    let dir = AssetDir::new();
    let input = dir.path("testsrc.mp4");
    let status = Command::new(&ffmpeg)
        .args([
            "-y",
            "-f",
            "lavfi",
            "-i",
            "testsrc=duration=8:size=640x360:rate=25",
            "-pix_fmt",
            "yuv420p",
        ])
        .arg(&input)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("run ffmpeg");
    assert!(status.success(), "failed to generate test video");

    let settings = PreviewSettings {
        ffmpeg_path: Some(ffmpeg),
        ..PreviewSettings::default()
    };
    let svc = default_service(settings, Arc::new(MemoryCache::new())).expect("build service");
    let asset = describe("testsrc.mp4", &input);

    for size in ["thumb", "big"] {
        match svc
            .generate_preview(&Permissions::downloader(), &asset, size)
            .await
            .unwrap_or_else(|e| panic!("{size} preview failed: {e}"))
        {
            Preview::Rendered(preview) => {
                assert_eq!(preview.content_type, "image/webp");
                assert!(is_webp(&preview.bytes), "{size} output is not WebP");
            }
            Preview::Original(_) => panic!("video previews are never passthrough"),
        }
    }
}
