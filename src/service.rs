//! Tile requests: address in, PNG bytes and caching headers out.

use log::{debug, warn};

use crate::error::Result;
use crate::registry::{ImageMetadata, ImageRegistry};
use crate::source::SourceImage;
use crate::tiles::placeholder::{black_tile, placeholder_tile};
use crate::tiles::render::{encode_png, plan_tile, render_plan};
use crate::tiles::{TileAddress, TileCache, TileFormat};

pub const CONTENT_TYPE_PNG: &str = "image/png";

/// Tiles never change once rendered, so clients may keep them indefinitely
pub const FAR_FUTURE_EXPIRES: &str = "Sun, 17 Jan 2038 19:14:07 GMT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileResponse {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub expires: &'static str,
}

impl TileResponse {
    fn png(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: CONTENT_TYPE_PNG,
            expires: FAR_FUTURE_EXPIRES,
        }
    }
}

/// Serves tiles for every image in a registry, optionally through a cache.
///
/// Shared freely between threads; all state is read-only apart from the
/// files the cache writes.
pub struct TileService {
    registry: ImageRegistry,
    cache: Option<TileCache>,
    url_base: String,
}

impl TileService {
    pub fn new(
        registry: ImageRegistry,
        cache: Option<TileCache>,
        url_base: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            cache,
            url_base: url_base.into(),
        }
    }

    pub fn registry(&self) -> &ImageRegistry {
        &self.registry
    }

    pub fn cache(&self) -> Option<&TileCache> {
        self.cache.as_ref()
    }

    /// Answer a tile request. Only unknown images and impossible tile
    /// addresses are errors; everything else yields an image.
    pub fn tile(
        &self,
        id: &str,
        format: TileFormat,
        zoom: u32,
        x: u32,
        y: u32,
    ) -> Result<TileResponse> {
        let image = self.registry.get(id)?;
        let tile = TileAddress::new(zoom, x, y)?.to_google(format);
        let bytes = self.image_tile(image, tile)?;
        Ok(TileResponse::png(bytes))
    }

    /// PNG bytes of a Google-numbered tile of `image`
    pub fn image_tile(&self, image: &SourceImage, tile: TileAddress) -> Result<Vec<u8>> {
        let Some(plan) = plan_tile(image, tile) else {
            debug!("{} {}: outside image", image.id(), tile);
            return black_tile();
        };

        let path = match &self.cache {
            Some(cache) => {
                if let Some(bytes) = cache.get(image.id(), tile) {
                    return Ok(bytes);
                }
                match cache.create_dir(image.id(), tile) {
                    Ok(path) => Some(path),
                    Err(e) => {
                        warn!("{} {}: cache unavailable: {}", image.id(), tile, e);
                        return placeholder_tile(tile);
                    }
                }
            }
            None => None,
        };

        debug!("{} {}: rendering {:?}", image.id(), tile, plan);
        let canvas = match render_plan(image, &plan) {
            Ok(canvas) => canvas,
            Err(e) => {
                warn!("{} {}: render failed: {}", image.id(), tile, e);
                return placeholder_tile(tile);
            }
        };
        let bytes = encode_png(&canvas)?;

        if let Some(path) = path
            && let Err(e) = TileCache::write(&path, &bytes)
        {
            warn!("{} {}: could not store tile: {}", image.id(), tile, e);
        }
        Ok(bytes)
    }

    pub fn metadata(&self, id: &str) -> Result<ImageMetadata> {
        Ok(ImageMetadata::new(self.registry.get(id)?, &self.url_base))
    }

    pub fn all_metadata(&self) -> Vec<ImageMetadata> {
        self.registry
            .list()
            .map(|image| ImageMetadata::new(image, &self.url_base))
            .collect()
    }

    /// The source file of an image, byte for byte
    pub fn raw(&self, id: &str) -> Result<Vec<u8>> {
        self.registry.get(id)?.raw_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendChoice, FileConfig};
    use crate::error::Error;
    use crate::geometry::PixelRect;
    use crate::source::tests::{image_config, write_test_png};
    use crate::source::{Georeference, RasterBackend};
    use crate::tiles::placeholder::FILL;
    use crate::tiles::tiles_covering;
    use image::RgbaImage;
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};

    /// A 400x500 chart over (40.5, 26.0)..(40.0, 26.5), plus a scratch dir
    fn chart_service(cache: bool) -> (TileService, TempDir) {
        let dir = tempdir().unwrap();
        write_test_png(&dir.path().join("chart.png"), 400, 500);
        let config = FileConfig {
            images_dir: dir.path().to_path_buf(),
            cache_dir: dir.path().join("media"),
            cache,
            images: vec![image_config("chart", "chart.png", BackendChoice::Memory)],
            ..FileConfig::default()
        };
        let (registry, failures) = ImageRegistry::load(&config);
        assert!(failures.is_empty());
        let cache = config.cache_root().map(TileCache::new);
        (TileService::new(registry, cache, &config.url_base), dir)
    }

    /// A Google-numbered tile inside the chart at `zoom`
    fn inner_tile(zoom: u32) -> TileAddress {
        let center = crate::geometry::LatLng::new(40.25, 26.25);
        tiles_covering([center, center], zoom)[0]
    }

    fn decode(bytes: &[u8]) -> image::RgbaImage {
        image::load_from_memory(bytes).unwrap().to_rgba8()
    }

    #[test]
    fn test_unknown_image() {
        let (service, _dir) = chart_service(false);
        assert!(matches!(
            service.tile("nope", TileFormat::Google, 0, 0, 0),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(service.metadata("nope"), Err(Error::NotFound(_))));
        assert!(matches!(service.raw("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_invalid_address() {
        let (service, _dir) = chart_service(false);
        assert!(matches!(
            service.tile("chart", TileFormat::Tms, 2, 4, 0),
            Err(Error::InvalidTile { .. })
        ));
    }

    #[test]
    fn test_outside_image_is_black() {
        let (service, dir) = chart_service(true);
        let response = service.tile("chart", TileFormat::Google, 3, 0, 0).unwrap();
        assert_eq!(response.content_type, "image/png");
        assert_eq!(response.expires, FAR_FUTURE_EXPIRES);
        assert!(decode(&response.bytes).pixels().all(|p| *p == FILL));
        // Black tiles are never stored
        assert!(!dir.path().join("media").exists());
    }

    #[test]
    fn test_tms_matches_google() {
        let (service, _dir) = chart_service(false);
        let tile = inner_tile(10);
        let google = service
            .tile("chart", TileFormat::Google, 10, tile.x(), tile.y())
            .unwrap();
        let tms_y = (1 << 10) - 1 - tile.y();
        let tms = service
            .tile("chart", TileFormat::Tms, 10, tile.x(), tms_y)
            .unwrap();
        assert_eq!(google, tms);
        assert!(decode(&google.bytes).pixels().any(|p| *p != FILL));
    }

    #[test]
    fn test_rendered_tile_is_cached() {
        let (service, _dir) = chart_service(true);
        let tile = inner_tile(11);
        let cache = service.cache().unwrap();
        assert_eq!(cache.get("chart", tile), None);

        let first = service
            .tile("chart", TileFormat::Google, 11, tile.x(), tile.y())
            .unwrap();
        assert_eq!(cache.get("chart", tile).unwrap(), first.bytes);

        // Served from the cache from now on
        let path = cache.tile_path("chart", tile);
        std::fs::write(&path, b"cached").unwrap();
        let second = service
            .tile("chart", TileFormat::Google, 11, tile.x(), tile.y())
            .unwrap();
        assert_eq!(second.bytes, b"cached");
    }

    #[test]
    fn test_cache_dir_failure_gives_placeholder() {
        let dir = tempdir().unwrap();
        write_test_png(&dir.path().join("chart.png"), 400, 500);
        let blocker = dir.path().join("media");
        std::fs::write(&blocker, b"a file where the cache should be").unwrap();

        let config = FileConfig {
            images_dir: dir.path().to_path_buf(),
            cache_dir: blocker,
            images: vec![image_config("chart", "chart.png", BackendChoice::Memory)],
            ..FileConfig::default()
        };
        let (registry, _) = ImageRegistry::load(&config);
        let service = TileService::new(registry, config.cache_root().map(TileCache::new), "");

        let tile = inner_tile(11);
        let response = service
            .tile("chart", TileFormat::Google, 11, tile.x(), tile.y())
            .unwrap();
        assert_eq!(response.bytes, placeholder_tile(tile).unwrap());
    }

    #[test]
    fn test_store_failure_still_returns_tile() {
        let (service, _dir) = chart_service(true);
        let tile = inner_tile(11);
        let cache = service.cache().unwrap();
        // A directory squatting on the tile path makes the final rename fail
        std::fs::create_dir_all(cache.tile_path("chart", tile)).unwrap();

        let response = service
            .tile("chart", TileFormat::Google, 11, tile.x(), tile.y())
            .unwrap();
        assert_ne!(response.bytes, placeholder_tile(tile).unwrap());
        assert!(decode(&response.bytes).pixels().any(|p| *p != FILL));
        assert_eq!(cache.get("chart", tile), None);
    }

    /// Backend whose every read fails, like a source file gone bad
    struct BrokenRaster;

    impl RasterBackend for BrokenRaster {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn dimensions(&self) -> (u32, u32) {
            (400, 500)
        }

        fn resample(&self, _region: PixelRect, _width: u32, _height: u32) -> Result<RgbaImage> {
            Err(Error::Config("corrupt source".to_string()))
        }
    }

    #[test]
    fn test_render_failure_gives_placeholder() {
        let config = image_config("chart", "chart.png", BackendChoice::Auto);
        let points = [config.reference_points[0], config.reference_points[1]];
        let georef = Georeference::from_reference_points(config.transform, points).unwrap();
        let image = SourceImage::new(
            "chart".to_string(),
            "Chart".to_string(),
            PathBuf::from("chart.png"),
            georef,
            Box::new(BrokenRaster),
        );
        let service = TileService::new(ImageRegistry::new(vec![image]), None, "");

        let tile = inner_tile(11);
        let response = service
            .tile("chart", TileFormat::Google, 11, tile.x(), tile.y())
            .unwrap();
        assert_eq!(response.bytes, placeholder_tile(tile).unwrap());

        // Tiles outside the image never reach the backend
        let response = service.tile("chart", TileFormat::Google, 3, 0, 0).unwrap();
        assert_eq!(response.bytes, black_tile().unwrap());
    }

    #[test]
    fn test_metadata_and_raw() {
        let (service, dir) = chart_service(false);
        let meta = service.metadata("chart").unwrap();
        assert_eq!(meta.tiled, "/api/file/tms/chart/{z}/{x}/{y}");
        assert_eq!(service.all_metadata().len(), 1);
        assert_eq!(
            service.raw("chart").unwrap(),
            std::fs::read(dir.path().join("chart.png")).unwrap()
        );
    }
}
