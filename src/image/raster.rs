//! Raster re-encoding.

use std::{borrow::Cow, io::Cursor};

use image::{DynamicImage, RgbImage, codecs::jpeg::JpegEncoder};

use super::{ConvertError, TargetFormat};

/// Encode `image` into `target` in memory.
///
/// Targets without alpha (JPEG) get transparent sources flattened onto
/// white first. Other targets keep the source mode, narrowed to 8 bits per
/// channel when the encoder cannot store it (float data, 16-bit WebP/BMP).
pub fn encode(
    image: &DynamicImage,
    target: TargetFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, ConvertError> {
    let Some(format) = target.image_format() else {
        return Err(ConvertError::UnsupportedFormat(target.to_string()));
    };

    let prepared = if target.supports_alpha() {
        prepare_for_encoder(image, target)
    } else {
        prepare_opaque(image)
    };

    let mut buf = Cursor::new(Vec::new());
    let result = match target {
        TargetFormat::Jpeg => {
            prepared.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, jpeg_quality))
        }
        _ => prepared.write_to(&mut buf, format),
    };

    result.map_err(|cause| ConvertError::Encode {
        format: target,
        cause,
    })?;
    Ok(buf.into_inner())
}

/// Bring `image` into an opaque 8-bit mode (L8 or Rgb8).
fn prepare_opaque(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    if image.color().has_alpha() {
        return Cow::Owned(DynamicImage::ImageRgb8(flatten_onto_white(image)));
    }

    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => Cow::Borrowed(image),
        other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
    }
}

/// Narrow sources the target encoder cannot store, keeping alpha.
fn prepare_for_encoder(image: &DynamicImage, target: TargetFormat) -> Cow<'_, DynamicImage> {
    match image {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => Cow::Borrowed(image),
        DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_)
            if target == TargetFormat::Png =>
        {
            Cow::Borrowed(image)
        }
        other if other.color().has_alpha() => {
            Cow::Owned(DynamicImage::ImageRgba8(other.to_rgba8()))
        }
        other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
    }
}

/// Composite onto an opaque white background using alpha as the blend mask.
pub fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut out = RgbImage::new(width, height);
    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        dst.0 = [blend(r, a), blend(g, a), blend(b, a)];
    }
    out
}

#[inline]
fn blend(channel: u8, alpha: u8) -> u8 {
    let (c, a) = (u32::from(channel), u32::from(alpha));
    // c * a + 255 * (1 - a), rounded
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}
