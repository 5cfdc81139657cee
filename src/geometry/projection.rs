//! Web Mercator tile pyramid arithmetic.
//!
//! Conversions between pyramid pixels, spherical Mercator meters
//! (EPSG:3857) and WGS84 latitude/longitude. Pixel and meter coordinates
//! follow the TMS convention (origin at the bottom-left of the world);
//! [`tile_lat_lon_bounds`] takes Google/XYZ tile numbers (origin top-left).

use std::f64::consts::PI;

use super::{LatLng, Meters};

/// Width and height of a tile in pixels
pub const TILE_SIZE: u32 = 256;

/// Sphere radius used by the Web Mercator convention (WGS84 semi-major axis)
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Half the circumference: the projected extent spans `[-ORIGIN_SHIFT, ORIGIN_SHIFT]`
pub const ORIGIN_SHIFT: f64 = PI * EARTH_RADIUS_M;

/// Tile bounds in projected meters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetersBounds {
    /// South-west corner
    pub min: Meters,
    /// North-east corner
    pub max: Meters,
}

/// Tile bounds in latitude/longitude
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub north_west: LatLng,
    pub south_east: LatLng,
}

/// Meters per pyramid pixel at `zoom` (measured at the equator)
pub fn resolution(zoom: u32) -> f64 {
    2.0 * ORIGIN_SHIFT / (TILE_SIZE as f64 * 2f64.powi(zoom as i32))
}

pub fn pixels_to_meters(px: f64, py: f64, zoom: u32) -> Meters {
    let res = resolution(zoom);
    Meters::new(px * res - ORIGIN_SHIFT, py * res - ORIGIN_SHIFT)
}

pub fn meters_to_pixels(m: Meters, zoom: u32) -> (f64, f64) {
    let res = resolution(zoom);
    ((m.x + ORIGIN_SHIFT) / res, (m.y + ORIGIN_SHIFT) / res)
}

pub fn lat_lon_to_meters(p: LatLng) -> Meters {
    let mx = p.lng * ORIGIN_SHIFT / 180.0;
    let my = ((90.0 + p.lat) * PI / 360.0).tan().ln() / (PI / 180.0);
    Meters::new(mx, my * ORIGIN_SHIFT / 180.0)
}

pub fn meters_to_lat_lon(m: Meters) -> LatLng {
    let lng = m.x / ORIGIN_SHIFT * 180.0;
    let lat = m.y / ORIGIN_SHIFT * 180.0;
    let lat = 180.0 / PI * (2.0 * (lat * PI / 180.0).exp().atan() - PI / 2.0);
    LatLng::new(lat, lng)
}

/// Bounds of TMS tile `(tx, ty)` in projected meters
pub fn tile_bounds_meters(tx: u32, ty: u32, zoom: u32) -> MetersBounds {
    let size = TILE_SIZE as f64;
    let (tx, ty) = (tx as f64, ty as f64);
    MetersBounds {
        min: pixels_to_meters(tx * size, ty * size, zoom),
        max: pixels_to_meters((tx + 1.0) * size, (ty + 1.0) * size, zoom),
    }
}

/// Bounds of Google/XYZ tile `(x, y)` in latitude/longitude.
///
/// Expects `x, y < 2^zoom` and `zoom <= 30`, as guaranteed by
/// [`TileAddress`](crate::tiles::TileAddress).
pub(crate) fn tile_lat_lon_bounds(x: u32, y: u32, zoom: u32) -> GeoBounds {
    let (tx, ty, _) = google_tile_from_tms(x, y, zoom);
    let bounds = tile_bounds_meters(tx, ty, zoom);
    let south_west = meters_to_lat_lon(bounds.min);
    let north_east = meters_to_lat_lon(bounds.max);
    GeoBounds {
        north_west: LatLng::new(north_east.lat, south_west.lng),
        south_east: LatLng::new(south_west.lat, north_east.lng),
    }
}

/// Flip the tile row between TMS (bottom-left origin) and Google
/// (top-left origin) numbering. The flip is its own inverse.
///
/// Same preconditions as [`tile_lat_lon_bounds`].
pub(crate) fn google_tile_from_tms(x: u32, y: u32, zoom: u32) -> (u32, u32, u32) {
    let rows = 1u64 << zoom;
    (x, (rows - 1 - y as u64) as u32, zoom)
}
