use log::warn;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::geometry::{LatLng, PixelPoint, TransformKind};

fn default_images_dir() -> PathBuf {
    PathBuf::from("./images")
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("./media")
}
fn default_cache() -> bool {
    true
}
fn default_streaming_threshold_mb() -> u64 {
    1000
}
fn default_url_base() -> String {
    "/api/file".to_string()
}

/// Top-level configuration file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Directory that image filenames are resolved against
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
    /// Root of the rendered tile cache
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_cache")]
    pub cache: bool,
    /// Approximate decoded size (MB) above which an image is not held in memory
    #[serde(default = "default_streaming_threshold_mb")]
    pub streaming_threshold_mb: u64,
    /// Prefix for the raw image and tile template URLs in image metadata
    #[serde(default = "default_url_base")]
    pub url_base: String,
    #[serde(default)]
    pub images: Vec<ImageConfig>,
}

/// One georeferenced image
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    pub id: String,
    pub name: String,
    pub filename: PathBuf,
    #[serde(default)]
    pub transform: TransformKind,
    #[serde(default)]
    pub backend: BackendChoice,
    pub reference_points: Vec<ReferencePoint>,
}

/// A position known both on the ground and in the image
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct ReferencePoint {
    pub geo: LatLng,
    pub pixel: PixelPoint,
}

/// Raster backend selection for one image
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// Decide from the estimated decoded size
    #[default]
    Auto,
    Memory,
    Streaming,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
            cache_dir: default_cache_dir(),
            cache: default_cache(),
            streaming_threshold_mb: default_streaming_threshold_mb(),
            url_base: default_url_base(),
            images: Vec::new(),
        }
    }
}

impl FileConfig {
    /// Search the default locations for a config file
    pub fn load() -> Option<Self> {
        let config_paths = get_config_paths();

        for path in config_paths {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => return Some(config),
                    Err(e) => {
                        warn!("Failed to load config file {:?}: {}", path, e);
                    }
                }
            }
        }
        None
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }

    /// Full path of an image's source file
    pub fn image_path(&self, image: &ImageConfig) -> PathBuf {
        self.images_dir.join(&image.filename)
    }

    /// Cache root, if caching is enabled
    pub fn cache_root(&self) -> Option<&Path> {
        self.cache.then_some(self.cache_dir.as_path())
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("mapimage.toml"));
    paths.push(PathBuf::from(".mapimage.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("mapimage").join("config.toml"));
        paths.push(config_dir.join("mapimage.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".mapimage.toml"));
    }

    paths
}
