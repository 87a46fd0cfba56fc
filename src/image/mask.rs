//! Binary mask extraction for outline tracing.
//!
//! The tracer follows black regions, so the mask is black where the shape
//! is and white everywhere else.

use image::{DynamicImage, GrayImage, Luma};
use rayon::prelude::*;

use super::ConvertError;
use crate::config::MaskSource;

/// Luminance at or above this value is background.
pub const DEFAULT_THRESHOLD: u8 = 128;

const BLACK: u8 = 0;
const WHITE: u8 = 255;

const PARALLEL_PIXEL_THRESHOLD: usize = 32 * 1024;

/// Build the black/white mask for `image`.
///
/// - alpha channel present: any non-zero alpha is shape (black)
/// - no alpha, `MaskSource::Auto`: grayscale, `< threshold` is shape
/// - no alpha, `MaskSource::Alpha`: rejected with `UnsupportedInput`
pub fn build_mask(
    image: &DynamicImage,
    source: MaskSource,
    threshold: u8,
) -> Result<GrayImage, ConvertError> {
    if image.color().has_alpha() {
        return Ok(alpha_mask(image));
    }

    match source {
        MaskSource::Auto => Ok(luma_mask(image, threshold)),
        MaskSource::Alpha => Err(ConvertError::UnsupportedInput(format!(
            "{:?} image has no alpha channel; tracing requires a transparent image",
            image.color()
        ))),
    }
}

/// Mask from the alpha channel: opaque or partly opaque -> black.
fn alpha_mask(image: &DynamicImage) -> GrayImage {
    // 16-bit keeps tiny alpha values of high-depth images from rounding to zero
    let rgba = image.to_rgba16();
    let (width, height) = rgba.dimensions();
    let mut mask = GrayImage::from_pixel(width, height, Luma([WHITE]));

    let out: &mut [u8] = &mut mask;
    if out.len() >= PARALLEL_PIXEL_THRESHOLD {
        out.par_iter_mut()
            .zip(rgba.as_raw().par_chunks_exact(4))
            .for_each(paint_opaque);
    } else {
        out.iter_mut()
            .zip(rgba.as_raw().chunks_exact(4))
            .for_each(paint_opaque);
    }

    mask
}

#[inline]
fn paint_opaque((out, pixel): (&mut u8, &[u16])) {
    if pixel[3] > 0 {
        *out = BLACK;
    }
}

/// Mask from luminance: dark -> black, light -> white.
fn luma_mask(image: &DynamicImage, threshold: u8) -> GrayImage {
    let mut gray = image.to_luma8();

    let apply = |value: &mut u8| {
        *value = if *value >= threshold { WHITE } else { BLACK };
    };

    let out: &mut [u8] = &mut gray;
    if out.len() >= PARALLEL_PIXEL_THRESHOLD {
        out.par_iter_mut().for_each(apply);
    } else {
        out.iter_mut().for_each(apply);
    }

    gray
}
