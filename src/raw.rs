//! Raw passthrough: the original file, untouched and uncached.

use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::asset::AssetDescriptor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAsset {
    pub path: PathBuf,
    pub name: String,
    pub content_type: &'static str,
    pub modified: SystemTime,
    pub len: u64,
}

impl RawAsset {
    pub async fn read_all(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

pub fn serve_raw(asset: &AssetDescriptor) -> RawAsset {
    RawAsset {
        path: asset.real_path.clone(),
        name: asset.name().to_string(),
        content_type: asset.content_type(),
        modified: asset.modified,
        len: asset.size,
    }
}
