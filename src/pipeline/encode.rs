//! Image encoding: `DynamicImage` → PNG bytes, PNG bytes → base64.
//!
//! PNG is lossless; JPEG artefacts around rendered glyphs confuse vision
//! models and cost OCR accuracy. Pages leave the rasteriser as PNG bytes and
//! are base64-encoded only at the HTTP boundary, by whichever backend sends
//! them.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} page → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// Standard (padded) base64, as Ollama and the hosted APIs expect.
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let png = encode_png(&img).expect("encode should succeed");
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn base64_is_padded() {
        assert_eq!(to_base64(b"ab"), "YWI=");
        assert_eq!(to_base64(b""), "");
    }
}
