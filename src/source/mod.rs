//! Georeferenced source images and the raster backends that sample them.

pub mod memory;
pub mod resample;
pub mod streaming;

use image::{ImageFormat, ImageReader, RgbaImage};
use log::info;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::config::{BackendChoice, ImageConfig, ReferencePoint};
use crate::error::{Error, Result};
use crate::geometry::{LatLng, PixelPoint, PixelRect, TransformKind, Transformation, Xy};
use crate::tiles::zoom;

pub use memory::MemoryRaster;
pub use streaming::StreamingRaster;

/// Crop-and-resize capability shared by every raster backend
pub trait RasterBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Width and height in pixels
    fn dimensions(&self) -> (u32, u32);

    /// Resample `region` (which lies inside the image) into a
    /// `width` x `height` RGBA image with smooth interpolation.
    fn resample(&self, region: PixelRect, width: u32, height: u32) -> Result<RgbaImage>;
}

/// Pixel <-> geographic mapping of one image.
///
/// Both directions are solved independently from the same control points.
#[derive(Debug, Clone)]
pub struct Georeference {
    to_geo: Transformation,
    to_pixel: Transformation,
}

impl Georeference {
    pub fn new(to_geo: Transformation, to_pixel: Transformation) -> Self {
        Self { to_geo, to_pixel }
    }

    pub fn from_reference_points(kind: TransformKind, points: [ReferencePoint; 2]) -> Result<Self> {
        let geo = [Xy::from(points[0].geo), Xy::from(points[1].geo)];
        let pixel = [Xy::from(points[0].pixel), Xy::from(points[1].pixel)];
        let to_geo = Transformation::from_points(kind, geo, pixel)?;
        let to_pixel = Transformation::from_points(kind, pixel, geo)?;
        Ok(Self::new(to_geo, to_pixel))
    }

    pub fn geo_from_pixel(&self, p: PixelPoint) -> LatLng {
        self.to_geo.project(p.into()).into()
    }

    pub fn pixel_from_geo(&self, p: LatLng) -> PixelPoint {
        self.to_pixel.project(p.into()).into()
    }
}

/// A configured image ready to be tiled; immutable once built
pub struct SourceImage {
    id: String,
    text: String,
    path: PathBuf,
    georef: Georeference,
    backend: Box<dyn RasterBackend>,
    min_zoom: u32,
    max_zoom: u32,
}

impl SourceImage {
    pub fn new(
        id: String,
        text: String,
        path: PathBuf,
        georef: Georeference,
        backend: Box<dyn RasterBackend>,
    ) -> Self {
        let (width, height) = backend.dimensions();
        let min_zoom = zoom::min_zoom(&georef, width, height);
        let max_zoom = zoom::max_zoom(&georef);
        Self {
            id,
            text,
            path,
            georef,
            backend,
            min_zoom,
            max_zoom,
        }
    }

    /// Load an image described by `config` from `path`
    pub fn open(config: &ImageConfig, path: &Path, streaming_threshold_mb: u64) -> Result<Self> {
        let points: [ReferencePoint; 2] =
            config
                .reference_points
                .as_slice()
                .try_into()
                .map_err(|_| Error::ReferencePoints {
                    id: config.id.clone(),
                    found: config.reference_points.len(),
                })?;
        let georef = Georeference::from_reference_points(config.transform, points)?;

        let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        let decode_err = |source| Error::Decode {
            path: path.to_path_buf(),
            source,
        };
        let format = image::guess_format(&bytes).map_err(decode_err)?;
        let (width, height) = ImageReader::with_format(Cursor::new(&bytes), format)
            .into_dimensions()
            .map_err(decode_err)?;
        if width == 0 || height == 0 {
            return Err(Error::Config(format!("image {} has no pixels", config.id)));
        }

        let approx_mb = approx_size_mb(width, height);
        info!(
            "{} is approx {} MB, in format {:?}",
            path.display(),
            approx_mb,
            format
        );

        let backend: Box<dyn RasterBackend> =
            if use_streaming(config.backend, approx_mb, streaming_threshold_mb) {
                Box::new(StreamingRaster::new(
                    path.to_path_buf(),
                    bytes,
                    format,
                    width,
                    height,
                ))
            } else {
                let image = decode(&bytes, format).map_err(decode_err)?;
                Box::new(MemoryRaster::new(image))
            };
        info!("Using {} backend for {}", backend.name(), config.id);

        let image = Self::new(
            config.id.clone(),
            config.name.clone(),
            path.to_path_buf(),
            georef,
            backend,
        );
        info!(
            " >> {}: MinZoom {} MaxZoom {}",
            image.id, image.min_zoom, image.max_zoom
        );
        Ok(image)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn georeference(&self) -> &Georeference {
        &self.georef
    }

    pub fn backend(&self) -> &dyn RasterBackend {
        self.backend.as_ref()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.backend.dimensions()
    }

    pub fn pixel_rect(&self) -> PixelRect {
        let (width, height) = self.dimensions();
        PixelRect::from_size(width, height)
    }

    /// Top-left and bottom-right pixel corners
    pub fn pixel_bounds(&self) -> [PixelPoint; 2] {
        let (width, height) = self.dimensions();
        [
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(width as f64, height as f64),
        ]
    }

    /// Geographic positions of the two pixel corners
    pub fn geo_bounds(&self) -> [LatLng; 2] {
        let [min, max] = self.pixel_bounds();
        [
            self.georef.geo_from_pixel(min),
            self.georef.geo_from_pixel(max),
        ]
    }

    pub fn min_zoom(&self) -> u32 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> u32 {
        self.max_zoom
    }

    /// The encoded source file as stored on disk
    pub fn raw_bytes(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| Error::io(&self.path, e))
    }
}

/// Decoded size estimate in MB, assuming 3 bytes per pixel
pub fn approx_size_mb(width: u32, height: u32) -> u64 {
    3 * width as u64 * height as u64 / 1024 / 1024
}

fn use_streaming(choice: BackendChoice, approx_mb: u64, threshold_mb: u64) -> bool {
    match choice {
        BackendChoice::Auto => approx_mb > threshold_mb,
        BackendChoice::Memory => false,
        BackendChoice::Streaming => true,
    }
}

fn decode(bytes: &[u8], format: ImageFormat) -> image::ImageResult<RgbaImage> {
    Ok(image::load_from_memory_with_format(bytes, format)?.to_rgba8())
}
