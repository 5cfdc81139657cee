use serde::{Deserialize, Serialize};

/// Geographic position in degrees (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Position inside a source image: `x` is the column, `y` the row,
/// origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

/// Spherical Mercator position (EPSG:3857 meters)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Meters {
    pub x: f64,
    pub y: f64,
}

/// Planar pair consumed by [`Transformation`](super::Transformation).
///
/// The solver does not know which coordinate system it is relating;
/// typed points enter and leave it only through the `From` conversions
/// below, which fix `x` as the horizontal axis (longitude / column) and
/// `y` as the vertical one (latitude / row).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Xy {
    pub x: f64,
    pub y: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Meters {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Xy {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates within `tol` of `other`
    #[cfg(test)]
    pub(crate) fn is_close_to(&self, other: &Xy, tol: f64) -> bool {
        (self.x - other.x).abs() <= tol && (self.y - other.y).abs() <= tol
    }
}

impl From<LatLng> for Xy {
    fn from(p: LatLng) -> Self {
        Xy::new(p.lng, p.lat)
    }
}

impl From<Xy> for LatLng {
    fn from(p: Xy) -> Self {
        LatLng::new(p.y, p.x)
    }
}

impl From<PixelPoint> for Xy {
    fn from(p: PixelPoint) -> Self {
        Xy::new(p.x, p.y)
    }
}

impl From<Xy> for PixelPoint {
    fn from(p: Xy) -> Self {
        PixelPoint::new(p.x, p.y)
    }
}

pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees.to_radians()
}

pub fn rad_to_deg(radians: f64) -> f64 {
    radians.to_degrees()
}
