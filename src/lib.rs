//! mapimage - Serve georeferenced raster images as Web Mercator map tiles

pub mod config;
pub mod error;
pub mod geometry;
pub mod registry;
pub mod service;
pub mod source;
pub mod tiles;

pub use error::{Error, Result};
pub use registry::{ImageMetadata, ImageRegistry, LoadFailure};
pub use service::{TileResponse, TileService};
pub use tiles::{TileAddress, TileFormat};
