use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the tiling engine
#[derive(Error, Debug)]
pub enum Error {
    /// Control points produced a coefficient matrix that cannot be inverted.
    #[error("singular system: {0}")]
    SingularSystem(String),

    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode tile: {0}")]
    Encode(#[source] image::ImageError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    /// A transformation needs exactly two control-point pairs.
    #[error("image {id}: expected 2 reference points, found {found}")]
    ReferencePoints { id: String, found: usize },

    #[error("invalid tile z={zoom} x={x} y={y}")]
    InvalidTile { zoom: u32, x: u32, y: u32 },

    #[error("image not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
