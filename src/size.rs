use std::fmt;
use std::str::FromStr;

use crate::error::PreviewError;

/// Preview size class. The discriminant is part of the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewSize {
    Thumb = 0,
    Big = 1,
}

impl PreviewSize {
    pub fn as_str(self) -> &'static str {
        match self {
            PreviewSize::Thumb => "thumb",
            PreviewSize::Big => "big",
        }
    }

    pub fn discriminant(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PreviewSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreviewSize {
    type Err = PreviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thumb" => Ok(PreviewSize::Thumb),
            "big" => Ok(PreviewSize::Big),
            other => Err(PreviewError::InvalidRequest(format!(
                "{} is not a valid PreviewSize",
                other
            ))),
        }
    }
}
