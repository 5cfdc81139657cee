//! Fixed tiles: the black "no coverage" tile and the diagnostic
//! placeholder served when a tile cannot be produced or stored.

use image::{Rgba, RgbaImage};
use std::sync::OnceLock;

use super::TileAddress;
use super::render::encode_png;
use crate::error::Result;
use crate::geometry::TILE_SIZE;

/// Fill color of tile areas without imagery
pub const FILL: Rgba<u8> = Rgba([0, 0, 0, 255]);

static BLACK_TILE: OnceLock<Vec<u8>> = OnceLock::new();

/// A tile-sized canvas filled with [`FILL`]
pub fn blank_canvas() -> RgbaImage {
    RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, FILL)
}

/// Encoded solid black tile, built once per process
pub fn black_tile() -> Result<Vec<u8>> {
    if let Some(bytes) = BLACK_TILE.get() {
        return Ok(bytes.clone());
    }
    let bytes = encode_png(&blank_canvas())?;
    Ok(BLACK_TILE.get_or_init(|| bytes).clone())
}

/// Encoded diagnostic tile: a color keyed on the tile position, outlined
/// so tile edges stand out.
pub fn placeholder_tile(tile: TileAddress) -> Result<Vec<u8>> {
    encode_png(&placeholder_canvas(tile))
}

fn placeholder_canvas(tile: TileAddress) -> RgbaImage {
    let fill = choose_color(tile.x(), tile.y(), 1.0);
    let border = choose_color(tile.x(), tile.y(), 0.5);
    let last = TILE_SIZE - 1;
    RgbaImage::from_fn(TILE_SIZE, TILE_SIZE, |x, y| {
        if x == 0 || y == 0 || x == last || y == last {
            border
        } else {
            fill
        }
    })
}

/// Pick one of 255 hues; odd rows use the second half of the wheel
fn choose_color(x: u32, y: u32, value: f64) -> Rgba<u8> {
    let mut idx = x % 128;
    if y % 2 == 1 {
        idx += 127;
    }
    let hue = idx as f64 / 255.0 * 6.0;
    let (saturation, value) = (0.6, 0.9 * value);

    let chroma = value * saturation;
    let second = chroma * (1.0 - (hue % 2.0 - 1.0).abs());
    let (r, g, b) = match hue as u32 {
        0 => (chroma, second, 0.0),
        1 => (second, chroma, 0.0),
        2 => (0.0, chroma, second),
        3 => (0.0, second, chroma),
        4 => (second, 0.0, chroma),
        _ => (chroma, 0.0, second),
    };
    let m = value - chroma;
    let to_u8 = |c: f64| ((c + m) * 255.0).round() as u8;
    Rgba([to_u8(r), to_u8(g), to_u8(b), 255])
}
