//! `[convert]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [convert]
//! default_format = "png"   # Used when a request has no `format` field
//! failures = "report"      # report | omit
//! jpeg_quality = 90        # 1-100
//! ```
//!
//! Without `default_format`, requests must name their target format.

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;
use crate::image::TargetFormat;

/// What a multi-file batch does with files that fail to convert.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Add an `error_NN.txt` member with the failure message.
    #[default]
    Report,
    /// Leave the file out of the archive; the failure is only logged.
    Omit,
}

/// Conversion settings shared by `serve` and `convert`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Fallback target when the request names none.
    pub default_format: Option<TargetFormat>,

    /// Per-file failure handling in archives.
    pub failures: FailurePolicy,

    /// JPEG encoder quality.
    pub jpeg_quality: u8,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            default_format: None,
            failures: FailurePolicy::Report,
            jpeg_quality: 90,
        }
    }
}

impl ConvertConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !(1..=100).contains(&self.jpeg_quality) {
            diag.error(
                "convert.jpeg_quality",
                format!("{} is outside 1-100", self.jpeg_quality),
            );
        }
    }
}
