//! Bilinear resampling of an RGBA raster region.

use image::{Rgba, RgbaImage};

use crate::geometry::PixelRect;

/// Resample `region` of `src` into a `width` x `height` image.
///
/// Output pixel centers are mapped back into the region (corner-based
/// coordinates, pixel center at `col + 0.5`) and sampled with 2x2 weighted
/// interpolation. Neighbors are clamped to the region so edge pixels never
/// blend with imagery outside it.
pub fn bilinear(src: &RgbaImage, region: PixelRect, width: u32, height: u32) -> RgbaImage {
    let scale_x = region.width() as f64 / width as f64;
    let scale_y = region.height() as f64 / height as f64;

    RgbaImage::from_fn(width, height, |i, j| {
        let x = region.min_x as f64 + (i as f64 + 0.5) * scale_x;
        let y = region.min_y as f64 + (j as f64 + 0.5) * scale_y;
        sample(src, &region, x, y)
    })
}

/// Sample at corner-based coordinates `(x, y)`
fn sample(src: &RgbaImage, region: &PixelRect, x: f64, y: f64) -> Rgba<u8> {
    // Convert from corner-based to center-based coordinates
    let cx = x - 0.5;
    let cy = y - 0.5;

    let x0 = cx.floor();
    let y0 = cy.floor();
    let dx = (cx - x0).clamp(0.0, 1.0);
    let dy = (cy - y0).clamp(0.0, 1.0);

    let clamp_x = |v: i64| v.clamp(region.min_x, region.max_x - 1) as u32;
    let clamp_y = |v: i64| v.clamp(region.min_y, region.max_y - 1) as u32;
    let (x0, y0) = (x0 as i64, y0 as i64);
    let (x0u, x1u) = (clamp_x(x0), clamp_x(x0 + 1));
    let (y0u, y1u) = (clamp_y(y0), clamp_y(y0 + 1));

    let p00 = src.get_pixel(x0u, y0u);
    let p10 = src.get_pixel(x1u, y0u);
    let p01 = src.get_pixel(x0u, y1u);
    let p11 = src.get_pixel(x1u, y1u);

    let mut out = [0u8; 4];
    for (c, v) in out.iter_mut().enumerate() {
        let result = p00[c] as f64 * (1.0 - dx) * (1.0 - dy)
            + p10[c] as f64 * dx * (1.0 - dy)
            + p01[c] as f64 * (1.0 - dx) * dy
            + p11[c] as f64 * dx * dy;
        *v = result.round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}
