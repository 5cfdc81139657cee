pub mod point;
pub mod projection;
pub mod rect;
pub mod transform;

pub use point::{LatLng, Meters, PixelPoint, Xy, deg_to_rad, rad_to_deg};
pub use projection::{GeoBounds, MetersBounds, TILE_SIZE};
pub use rect::PixelRect;
pub use transform::{TransformKind, Transformation};
