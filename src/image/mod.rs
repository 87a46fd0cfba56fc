//! Single-image conversion.
//!
//! # Modules
//!
//! - [`load`]: decode uploaded bytes
//! - [`format`]: target format tags
//! - [`mask`]: black/white mask for tracing
//! - [`raster`]: PNG/JPEG/WebP/BMP re-encoding
//! - [`vector`]: SVG through the external tracer
//!
//! # Example
//!
//! ```ignore
//! let svg = image::convert_bytes(&upload, TargetFormat::Svg, &config)?;
//! ```

mod error;
mod format;
pub mod load;
pub mod mask;
pub mod raster;
pub mod vector;

pub use error::ConvertError;
pub use format::TargetFormat;

use ::image::DynamicImage;

use crate::config::AppConfig;

/// Convert a decoded image into `target`.
pub fn convert(
    image: &DynamicImage,
    target: TargetFormat,
    config: &AppConfig,
) -> Result<Vec<u8>, ConvertError> {
    if target.is_vector() {
        vector::trace(image, &config.trace)
    } else {
        raster::encode(image, target, config.convert.jpeg_quality)
    }
}

/// Decode `bytes` and convert into `target`.
///
/// Decoding runs first, so undecodable input is always `Decode` and never
/// reaches the external tool.
pub fn convert_bytes(
    bytes: &[u8],
    target: TargetFormat,
    config: &AppConfig,
) -> Result<Vec<u8>, ConvertError> {
    let image = load::decode(bytes)?;
    convert(&image, target, config)
}
