//! Tile addressing, rendering and caching.

pub mod cache;
pub mod placeholder;
pub mod render;
pub mod zoom;

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::geometry::projection::{
    google_tile_from_tms, lat_lon_to_meters, meters_to_pixels, tile_lat_lon_bounds,
};
use crate::geometry::{GeoBounds, LatLng, TILE_SIZE};

pub use cache::TileCache;

/// Deepest zoom level a tile address may use
pub const MAX_TILE_ZOOM: u32 = 30;

/// One cell of the tile pyramid, always in Google/XYZ numbering
/// (row 0 at the top).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    zoom: u32,
    x: u32,
    y: u32,
}

/// Row-numbering convention of an incoming request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileFormat {
    /// Origin at the bottom-left
    Tms,
    /// Origin at the top-left (also called XYZ)
    Google,
}

impl TileAddress {
    /// Create a tile address, checking that `x` and `y` exist at `zoom`
    pub fn new(zoom: u32, x: u32, y: u32) -> Result<Self> {
        let invalid = Error::InvalidTile { zoom, x, y };
        if zoom > MAX_TILE_ZOOM {
            return Err(invalid);
        }
        let s = 1u64 << zoom;
        if (x as u64) < s && (y as u64) < s {
            Ok(Self { zoom, x, y })
        } else {
            Err(invalid)
        }
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    /// Interpret this address as numbered in `format` and convert it to
    /// Google numbering
    pub fn to_google(self, format: TileFormat) -> Self {
        match format {
            TileFormat::Google => self,
            TileFormat::Tms => {
                let (x, y, zoom) = google_tile_from_tms(self.x, self.y, self.zoom);
                Self { zoom, x, y }
            }
        }
    }

    pub fn lat_lon_bounds(&self) -> GeoBounds {
        tile_lat_lon_bounds(self.x, self.y, self.zoom)
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

impl FromStr for TileFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tms" => Ok(TileFormat::Tms),
            "google" | "xyz" => Ok(TileFormat::Google),
            other => Err(Error::Config(format!("unknown tile format: {}", other))),
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TileFormat::Tms => write!(f, "tms"),
            TileFormat::Google => write!(f, "google"),
        }
    }
}

/// Every Google-numbered tile at `zoom` touching the box spanned by two
/// geographic corners, row by row.
pub fn tiles_covering(corners: [LatLng; 2], zoom: u32) -> Vec<TileAddress> {
    let last = ((1u64 << zoom) - 1) as f64;
    let size = TILE_SIZE as f64;
    let index = |p: LatLng| {
        let (px, py) = meters_to_pixels(lat_lon_to_meters(p), zoom);
        let tx = (px / size).floor().clamp(0.0, last);
        // Pixel rows grow northward; Google rows grow southward
        let ty = last - (py / size).floor().clamp(0.0, last);
        (tx as u32, ty as u32)
    };
    let (x0, y0) = index(corners[0]);
    let (x1, y1) = index(corners[1]);

    let mut tiles = Vec::new();
    for y in y0.min(y1)..=y0.max(y1) {
        for x in x0.min(x1)..=x0.max(x1) {
            tiles.push(TileAddress { zoom, x, y });
        }
    }
    tiles
}
