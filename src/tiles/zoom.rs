//! Usable zoom range of a georeferenced image.

use geo::{Rect, coord};

use crate::geometry::projection::{lat_lon_to_meters, meters_to_pixels};
use crate::geometry::{LatLng, PixelPoint, TILE_SIZE};
use crate::source::Georeference;

/// Deepest zoom level offered for any image
pub const MAX_ZOOM: u32 = 20;

/// Highest zoom at which the whole image still fits on a single tile,
/// searching down from [`MAX_ZOOM`]; 0 if it never fits.
pub fn min_zoom(georef: &Georeference, width: u32, height: u32) -> u32 {
    let corners = [
        georef.geo_from_pixel(PixelPoint::new(0.0, 0.0)),
        georef.geo_from_pixel(PixelPoint::new(width as f64, height as f64)),
    ];
    let tile = TILE_SIZE as f64;
    (0..=MAX_ZOOM)
        .rev()
        .find(|&zoom| {
            let extent = pyramid_extent(corners, zoom);
            extent.width() < tile && extent.height() < tile
        })
        .unwrap_or(0)
}

/// Lowest zoom at which one tile's worth of source pixels covers more
/// than a tile of the pyramid, i.e. where rendering starts to upsample;
/// [`MAX_ZOOM`] if that never happens.
pub fn max_zoom(georef: &Georeference) -> u32 {
    let tile = TILE_SIZE as f64;
    let corners = [
        georef.geo_from_pixel(PixelPoint::new(0.0, 0.0)),
        georef.geo_from_pixel(PixelPoint::new(tile, tile)),
    ];
    (0..=MAX_ZOOM)
        .find(|&zoom| {
            let extent = pyramid_extent(corners, zoom);
            extent.width() > tile || extent.height() > tile
        })
        .unwrap_or(MAX_ZOOM)
}

/// Box spanned by two geographic points in pyramid pixels at `zoom`
fn pyramid_extent(corners: [LatLng; 2], zoom: u32) -> Rect<f64> {
    let [a, b] = corners.map(|p| {
        let (px, py) = meters_to_pixels(lat_lon_to_meters(p), zoom);
        coord! { x: px, y: py }
    });
    Rect::new(a, b)
}
