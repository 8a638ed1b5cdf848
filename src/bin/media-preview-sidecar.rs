use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use media_preview_core::error::{ErrorPayload, PreviewError};
use media_preview_core::{
    AssetDescriptor, MemoryCache, Permissions, PreviewService, PreviewSettings, RequestContext,
    ResponseBody, respond,
};

#[derive(Debug, Deserialize)]
struct RpcRequest {
    id: u64,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, serde::Serialize)]
struct RpcSuccess {
    id: u64,
    result: Value,
}

#[derive(Debug, serde::Serialize)]
struct RpcFailure {
    id: u64,
    error: ErrorPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateParams {
    input_path: PathBuf,
    /// Path as shown to the user; defaults to the input file name.
    path: Option<String>,
    size: String,
    output_path: PathBuf,
    #[serde(default = "Permissions::downloader")]
    permissions: Permissions,
    #[serde(default)]
    inline: bool,
    if_modified_since: Option<String>,
}

type SharedWriter = Arc<Mutex<io::Stdout>>;

fn write_json_line<T: serde::Serialize>(writer: &SharedWriter, value: &T) -> io::Result<()> {
    let mut guard = writer.lock();
    serde_json::to_writer(&mut *guard, value)
        .map_err(|e| io::Error::other(format!("serialize response: {}", e)))?;
    guard.write_all(b"\n")?;
    guard.flush()
}

fn write_failure(writer: &SharedWriter, id: u64, error: ErrorPayload) {
    let _ = write_json_line(writer, &RpcFailure { id, error });
}

fn params_from_value<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, PreviewError> {
    serde_json::from_value(params)
        .map_err(|e| PreviewError::InvalidRequest(format!("Invalid params payload: {}", e)))
}

async fn generate(service: &PreviewService, params: Value) -> Result<Value, PreviewError> {
    let params: GenerateParams = params_from_value(params)?;
    let identity = params.path.unwrap_or_else(|| {
        format!(
            "/{}",
            params
                .input_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        )
    });
    let asset = AssetDescriptor::from_path(identity, &params.input_path)?;
    let ctx = RequestContext {
        inline: params.inline,
        if_modified_since: params.if_modified_since,
    };

    let response = respond(
        service
            .generate_preview(&params.permissions, &asset, &params.size)
            .await,
        &ctx,
    );

    let bytes_written = match &response.body {
        ResponseBody::Empty => 0,
        ResponseBody::Bytes(bytes) => {
            tokio::fs::write(&params.output_path, bytes).await?;
            bytes.len() as u64
        }
        ResponseBody::File(raw) => tokio::fs::copy(&raw.path, &params.output_path).await?,
    };

    let headers: BTreeMap<&str, &str> = response
        .headers
        .iter()
        .map(|(name, value)| (*name, value.as_str()))
        .collect();
    Ok(json!({
        "status": response.status,
        "headers": headers,
        "bytesWritten": bytes_written,
    }))
}

async fn dispatch(service: &PreviewService, method: &str, params: Value) -> Result<Value, PreviewError> {
    match method {
        "preview.generate" => generate(service, params).await,
        "app.settings" => {
            let s = service.settings();
            Ok(json!({
                "enableThumbnails": s.effective_enable_thumbnails(),
                "resizePreview": s.effective_resize_preview(),
                "videoConcurrency": s.effective_video_concurrency(),
                "videoSeekSeconds": s.effective_video_seek_seconds(),
                "videoQuality": s.effective_video_quality(),
            }))
        }
        _ => Err(PreviewError::InvalidRequest(format!(
            "Unknown method: {}",
            method
        ))),
    }
}

fn load_settings() -> Result<PreviewSettings, PreviewError> {
    let base = match std::env::var_os("PREVIEW_SETTINGS") {
        Some(path) => PreviewSettings::from_json(&std::fs::read_to_string(path)?)?,
        None => PreviewSettings::default(),
    };
    Ok(base.with_env_overrides())
}

/// Keeps handles only for requests still running; each task writes its own reply.
fn track(in_flight: &mut Vec<JoinHandle<()>>, task: JoinHandle<()>) {
    in_flight.retain(|running| !running.is_finished());
    in_flight.push(task);
}

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let stdout: SharedWriter = Arc::new(Mutex::new(io::stdout()));
    let service = match load_settings().and_then(|settings| {
        media_preview_core::default_service(settings, Arc::new(MemoryCache::new()))
    }) {
        Ok(service) => Arc::new(service),
        Err(err) => {
            log::error!(target: "media_preview::sidecar", "startup failed: {}", err);
            write_failure(&stdout, 0, err.payload());
            return Err(io::Error::other(err.to_string()));
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let mut in_flight = Vec::new();

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                write_failure(
                    &stdout,
                    0,
                    ErrorPayload {
                        summary: "Invalid input stream".to_string(),
                        detail: err.to_string(),
                    },
                );
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let request: RpcRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                write_failure(
                    &stdout,
                    0,
                    ErrorPayload {
                        summary: "Invalid request".to_string(),
                        detail: err.to_string(),
                    },
                );
                continue;
            }
        };

        let writer = Arc::clone(&stdout);
        let service = Arc::clone(&service);
        let task = runtime.spawn(async move {
            match dispatch(&service, &request.method, request.params).await {
                Ok(result) => {
                    let _ = write_json_line(
                        &writer,
                        &RpcSuccess {
                            id: request.id,
                            result,
                        },
                    );
                }
                Err(err) => write_failure(&writer, request.id, err.payload()),
            }
        });
        track(&mut in_flight, task);
    }

    runtime.block_on(async {
        for task in in_flight {
            let _ = task.await;
        }
    });
    Ok(())
}
