//! Page image normalization.
//!
//! Every page, whatever its source format, is decoded, flattened to 8-bit RGB
//! and re-encoded as JPEG at [`JPEG_QUALITY`]. The decoded bitmap only lives for
//! the duration of [`normalize`], so peak memory stays at one page.

use image::codecs::jpeg::JpegEncoder;
use image::error::{LimitError, LimitErrorKind};
use image::{DynamicImage, ImageError};

use crate::error::{Error, Result};
use crate::types::{JPEG_QUALITY, NormalizedPage, PageLayout, PageSize};

/// Decodes `bytes`, re-encodes them as JPEG and fits the result onto `page`.
///
/// # Arguments
///
/// * `name` - Entry name of the page, used in error messages
/// * `bytes` - Raw image bytes in any supported format
/// * `page` - Output page size
///
/// # Returns
///
/// * `Ok(NormalizedPage)` - The JPEG bytes, pixel dimensions and layout
/// * `Err(Error::Decode)` - The bytes are not a decodable image
pub fn normalize(name: &str, bytes: &[u8], page: PageSize) -> Result<NormalizedPage> {
    let decoded = image::load_from_memory(bytes).map_err(|source| Error::Decode {
        name: name.to_string(),
        source,
    })?;

    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(Error::Decode {
            name: name.to_string(),
            source: ImageError::Limits(LimitError::from_kind(LimitErrorKind::DimensionError)),
        });
    }

    let jpeg = encode_jpeg(decoded)?;

    Ok(NormalizedPage {
        jpeg,
        width,
        height,
        layout: PageLayout::fit(width, height, page),
    })
}

/// Consumes the bitmap so it is released as soon as the JPEG bytes exist.
fn encode_jpeg(decoded: DynamicImage) -> Result<Vec<u8>> {
    let rgb = match decoded {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    };

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode_image(&rgb)?;
    Ok(jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 200, 30, 128]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_normalize_reencodes_as_jpeg() {
        let page = normalize("001.png", &png_bytes(40, 80), PageSize::A4).unwrap();
        assert_eq!((page.width, page.height), (40, 80));
        assert_eq!(&page.jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(
            image::guess_format(&page.jpeg).unwrap(),
            ImageFormat::Jpeg
        );
        assert_eq!(page.layout, PageLayout::fit(40, 80, PageSize::A4));
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        let err = normalize("broken.jpg", b"not an image", PageSize::A4).unwrap_err();
        match err {
            Error::Decode { name, .. } => assert_eq!(name, "broken.jpg"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
