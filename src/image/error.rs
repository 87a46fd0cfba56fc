//! Conversion error types.

use std::time::Duration;

use thiserror::Error;

use super::TargetFormat;

/// Failure of a single-image conversion.
///
/// The `Display` text is what clients see: the body of a 500 response or
/// the content of an `error_NN.txt` archive member.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("input is not a valid image: {0}")]
    Decode(image::ImageError),

    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("unsupported target format `{0}` (expected one of: svg, png, jpeg, webp, bmp)")]
    UnsupportedFormat(String),

    #[error("required external tool is not installed: `{0}`")]
    ToolMissing(String),

    #[error("tracing failed: {0}")]
    ToolExecution(String),

    #[error("tracing timed out after {}s", .0.as_secs_f32())]
    ToolTimeout(Duration),

    #[error("failed to encode {format}: {cause}")]
    Encode {
        format: TargetFormat,
        cause: image::ImageError,
    },

    #[error("scratch file error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Check if the external tool is at fault (as opposed to the input).
    pub fn is_tool_failure(&self) -> bool {
        matches!(
            self,
            Self::ToolMissing(_) | Self::ToolExecution(_) | Self::ToolTimeout(_)
        )
    }
}
