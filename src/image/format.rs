//! Target format tags.

use std::{fmt, str::FromStr};

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use super::ConvertError;
use crate::utils::mime;

/// Output format requested for a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    /// Outline tracing through the external tool.
    Svg,
    Png,
    /// Requested as `jpeg` or `jpg`.
    #[serde(alias = "jpg")]
    Jpeg,
    Webp,
    Bmp,
}

impl TargetFormat {
    /// Every supported target, in the order shown on the upload form.
    pub const ALL: [Self; 5] = [Self::Svg, Self::Png, Self::Jpeg, Self::Webp, Self::Bmp];

    /// Canonical tag, as accepted by [`FromStr`].
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
        }
    }

    /// File extension used for output names.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            other => other.tag(),
        }
    }

    /// MIME type for the `Content-Type` header.
    pub fn mime(self) -> &'static str {
        mime::from_extension(Some(self.extension()))
    }

    /// Check if this format goes through the tracing tool.
    pub const fn is_vector(self) -> bool {
        matches!(self, Self::Svg)
    }

    /// Check if the encoder can store an alpha channel.
    pub const fn supports_alpha(self) -> bool {
        !matches!(self, Self::Jpeg)
    }

    /// Encoder identifier in the `image` crate (raster formats only).
    pub const fn image_format(self) -> Option<ImageFormat> {
        match self {
            Self::Svg => None,
            Self::Png => Some(ImageFormat::Png),
            Self::Jpeg => Some(ImageFormat::Jpeg),
            Self::Webp => Some(ImageFormat::WebP),
            Self::Bmp => Some(ImageFormat::Bmp),
        }
    }

    /// Attachment name for multi-file responses.
    pub const fn archive_name(self) -> &'static str {
        match self {
            Self::Svg => "converted_svgs.zip",
            _ => "converted_images.zip",
        }
    }
}

impl FromStr for TargetFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::Webp),
            "bmp" => Ok(Self::Bmp),
            _ => Err(ConvertError::UnsupportedFormat(s.trim().to_string())),
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
