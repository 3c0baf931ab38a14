use std::path::Path;

use astrocube_wcs::OriginMode;
use serde::{Deserialize, Serialize};

use crate::fits::Result;

/// Options for [`CubeReader`](crate::CubeReader). Missing JSON fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Normalize GIPSY-style headers before anything else reads them.
    pub repair_legacy_headers: bool,

    pub origin: OriginMode,

    /// Headers longer than this many 2880-byte blocks are rejected.
    pub max_header_blocks: usize,

    pub compute_statistics_on_load: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            repair_legacy_headers: true,
            origin: OriginMode::Native,
            max_header_blocks: 1000,
            compute_statistics_on_load: true,
        }
    }
}

impl ReaderConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
