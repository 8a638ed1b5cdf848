use std::fmt;

use crate::asset::AssetDescriptor;
use crate::size::PreviewSize;

/// Deterministic cache key for one (file version, size class) pair.
///
/// Encoding: hex of the real path bytes, then the modification time in seconds
/// as lower-case hex (`-` prefixed when negative), then the size discriminant
/// as hex. Depends on nothing but its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(asset: &AssetDescriptor, size: PreviewSize) -> Self {
        let path = asset.real_path.to_string_lossy();
        Self::from_parts(&path, asset.modified_unix(), size)
    }

    pub fn from_parts(real_path: &str, modified_unix: i64, size: PreviewSize) -> Self {
        let mtime = if modified_unix < 0 {
            format!("-{:x}", modified_unix.unsigned_abs())
        } else {
            format!("{:x}", modified_unix)
        };
        CacheKey(format!(
            "{}{}{:x}",
            hex::encode(real_path.as_bytes()),
            mtime,
            size.discriminant()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
