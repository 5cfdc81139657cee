//! The set of images being served, built once at startup.

use log::{info, warn};
use serde::Serialize;
use std::collections::HashSet;

use crate::config::FileConfig;
use crate::error::{Error, Result};
use crate::geometry::{LatLng, PixelPoint};
use crate::source::SourceImage;

/// An image that could not be loaded
#[derive(Debug)]
pub struct LoadFailure {
    pub id: String,
    pub error: Error,
}

/// Loaded images in configuration order
#[derive(Default)]
pub struct ImageRegistry {
    images: Vec<SourceImage>,
}

impl ImageRegistry {
    pub fn new(images: Vec<SourceImage>) -> Self {
        Self { images }
    }

    /// Load every configured image. Images that fail are logged, reported
    /// back and left out; the rest are still served.
    pub fn load(config: &FileConfig) -> (Self, Vec<LoadFailure>) {
        let mut images = Vec::new();
        let mut failures = Vec::new();
        let mut seen = HashSet::new();

        for image_config in &config.images {
            let id = image_config.id.as_str();
            let rejected = if !is_valid_id(id) {
                Some(format!("image id {:?} is not a plain directory name", id))
            } else if !seen.insert(id) {
                Some(format!("duplicate image id {}", id))
            } else {
                None
            };
            if let Some(reason) = rejected {
                let error = Error::Config(reason);
                warn!("Skipping image {}: {}", image_config.id, error);
                failures.push(LoadFailure {
                    id: image_config.id.clone(),
                    error,
                });
                continue;
            }

            let path = config.image_path(image_config);
            match SourceImage::open(image_config, &path, config.streaming_threshold_mb) {
                Ok(image) => images.push(image),
                Err(error) => {
                    warn!("Skipping image {}: {}", image_config.id, error);
                    failures.push(LoadFailure {
                        id: image_config.id.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            "Loaded {} of {} configured images",
            images.len(),
            config.images.len()
        );
        (Self::new(images), failures)
    }

    pub fn get(&self, id: &str) -> Result<&SourceImage> {
        self.images
            .iter()
            .find(|image| image.id() == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn list(&self) -> impl Iterator<Item = &SourceImage> {
        self.images.iter()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Ids name a directory under the tile cache root, so they must stay a
/// single path component
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\'])
}

/// Public description of one image, serialized as JSON
#[derive(Debug, Clone, Serialize)]
pub struct ImageMetadata {
    pub id: String,
    pub text: String,
    pub geo_bounds: [LatLng; 2],
    pub pixel_bounds: [PixelPoint; 2],
    #[serde(rename = "minZoom")]
    pub min_zoom: u32,
    #[serde(rename = "maxZoom")]
    pub max_zoom: u32,
    /// URL of the raw source file
    pub image: String,
    /// TMS URL template for the tiles
    pub tiled: String,
}

impl ImageMetadata {
    pub fn new(image: &SourceImage, url_base: &str) -> Self {
        let base = url_base.trim_end_matches('/');
        Self {
            id: image.id().to_string(),
            text: image.text().to_string(),
            geo_bounds: image.geo_bounds(),
            pixel_bounds: image.pixel_bounds(),
            min_zoom: image.min_zoom(),
            max_zoom: image.max_zoom(),
            image: format!("{}/raw/{}", base, image.id()),
            tiled: format!("{}/tms/{}/{{z}}/{{x}}/{{y}}", base, image.id()),
        }
    }
}
