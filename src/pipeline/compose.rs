//! Compositing: source-over blend of the ink overlay onto the page raster.
//!
//! The page raster from pdfium is opaque; the overlay is mostly
//! transparent with opaque-or-translucent ink. Blending happens per pixel
//! over the overlapping region — the overlay is rasterised from the same
//! page geometry, so in practice the dimensions match exactly.

use image::RgbaImage;

/// Blend `overlay` onto `base` in place.
pub fn overlay_onto(base: &mut RgbaImage, overlay: &RgbaImage) {
    let w = base.width().min(overlay.width());
    let h = base.height().min(overlay.height());

    for y in 0..h {
        for x in 0..w {
            let src = overlay.get_pixel(x, y);
            let sa = src[3] as u32;
            if sa == 0 {
                continue;
            }
            let dst = base.get_pixel_mut(x, y);
            if sa == 255 {
                *dst = *src;
                continue;
            }
            for c in 0..3 {
                let sc = src[c] as u32;
                let dc = dst[c] as u32;
                dst[c] = ((sc * sa + dc * (255 - sa)) / 255) as u8;
            }
            // The page raster is opaque; keep it that way.
            dst[3] = 255;
        }
    }
}
