//! Image decoding.

use image::DynamicImage;

use super::ConvertError;

/// Decode uploaded bytes into an image.
///
/// The container format is guessed from the content, not the filename.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ConvertError> {
    image::load_from_memory(bytes).map_err(ConvertError::Decode)
}

/// Short description for debug logs, e.g. `10x10 Rgba8`.
pub fn describe(image: &DynamicImage) -> String {
    format!("{}x{} {:?}", image.width(), image.height(), image.color())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ColorType, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_png_keeps_mode() {
        let img = RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 4]));
        let decoded = decode(&png_bytes(img.into())).unwrap();
        assert_eq!(decoded.color(), ColorType::Rgba8);
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn test_decode_garbage() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ConvertError::Decode(_)));
        assert!(err.to_string().starts_with("input is not a valid image"));
    }

    #[test]
    fn test_decode_empty() {
        assert!(matches!(decode(&[]), Err(ConvertError::Decode(_))));
    }

    #[test]
    fn test_decode_truncated_png() {
        let bytes = png_bytes(RgbaImage::new(8, 8).into());
        let err = decode(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, ConvertError::Decode(_)));
    }

    #[test]
    fn test_describe() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(10, 10));
        assert_eq!(describe(&img), "10x10 Rgba8");
    }
}
