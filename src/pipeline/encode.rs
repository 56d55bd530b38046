//! Image encoding: composited page raster → JPEG bytes.
//!
//! ## Why JPEG?
//! Exported pages are photographs of rendered pages — continuous-tone
//! content where JPEG's lossy compression wins by an order of magnitude
//! over PNG. It also embeds directly into the output PDF as a `DCTDecode`
//! stream, so the bytes produced here are written verbatim, never
//! re-encoded.

use image::codecs::jpeg::JpegEncoder;
use image::RgbaImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a composited page as JPEG at the given quality (1–100).
///
/// JPEG has no alpha channel; the raster is flattened to RGB first. By the
/// time a page reaches encoding it is fully opaque anyway (pdfium renders
/// on white, compositing preserves opacity).
pub fn encode_jpeg(img: &RgbaImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = image::DynamicImage::ImageRgba8(img.clone()).to_rgb8();

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buf), quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)?;

    debug!("Encoded page image → {} JPEG bytes", buf.len());
    Ok(buf)
}
