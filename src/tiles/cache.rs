//! Rendered tiles on disk, keyed by image id and Google tile address.

use log::{debug, warn};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::TileAddress;
use crate::error::{Error, Result};

/// Tile store rooted at a directory; layout is `{root}/{id}/{z}/{x}/{y}.png`
#[derive(Debug, Clone)]
pub struct TileCache {
    root: PathBuf,
}

impl TileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn tile_path(&self, id: &str, tile: TileAddress) -> PathBuf {
        self.root
            .join(id)
            .join(tile.zoom().to_string())
            .join(tile.x().to_string())
            .join(format!("{}.png", tile.y()))
    }

    /// Previously stored bytes, or `None` on a miss
    pub fn get(&self, id: &str, tile: TileAddress) -> Option<Vec<u8>> {
        let path = self.tile_path(id, tile);
        match std::fs::read(&path) {
            Ok(bytes) => {
                debug!("cache hit {}", path.display());
                Some(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!("unreadable cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Make sure the directory for a tile exists and return the tile's path
    pub fn create_dir(&self, id: &str, tile: TileAddress) -> Result<PathBuf> {
        let path = self.tile_path(id, tile);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
        Ok(path)
    }

    /// Atomically replace `path` with `bytes`.
    ///
    /// The data goes to a temporary file next to `path` first, so readers
    /// see either the old tile or the complete new one.
    pub fn write(path: &Path, bytes: &[u8]) -> Result<()> {
        let dir = path.parent().unwrap_or(Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        tmp.write_all(bytes).map_err(|e| Error::io(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
        Ok(())
    }

    pub fn put(&self, id: &str, tile: TileAddress, bytes: &[u8]) -> Result<()> {
        let path = self.create_dir(id, tile)?;
        Self::write(&path, bytes)
    }
}
