use image::RgbaImage;

use super::{RasterBackend, resample};
use crate::error::Result;
use crate::geometry::PixelRect;

/// Fully decoded raster held for the lifetime of the process
pub struct MemoryRaster {
    image: RgbaImage,
}

impl MemoryRaster {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }
}

impl RasterBackend for MemoryRaster {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn resample(&self, region: PixelRect, width: u32, height: u32) -> Result<RgbaImage> {
        Ok(resample::bilinear(&self.image, region, width, height))
    }
}
