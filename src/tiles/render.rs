//! On-demand tile rendering.
//!
//! A request moves through: tile bounds -> source pixel rectangle ->
//! overlap with the image -> resample into the covered part of the tile
//! (or a black tile when nothing overlaps) -> PNG.

use image::{ImageFormat, RgbaImage, imageops};
use log::debug;
use std::io::Cursor;

use super::TileAddress;
use super::placeholder::blank_canvas;
use crate::error::{Error, Result};
use crate::geometry::{PixelRect, TILE_SIZE};
use crate::source::SourceImage;

/// Where the source imagery lands on a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePlan {
    /// The whole tile in source pixels, possibly extending past the image
    pub tile_rect: PixelRect,
    /// Part of `tile_rect` inside the image
    pub src_rect: PixelRect,
    /// Where `src_rect` is drawn on the output canvas
    pub dst_rect: PixelRect,
}

/// Work out which part of `image` covers `tile`; `None` when the tile
/// lies entirely outside the image.
pub fn plan_tile(image: &SourceImage, tile: TileAddress) -> Option<TilePlan> {
    let bounds = tile.lat_lon_bounds();
    let georef = image.georeference();
    let tile_rect = PixelRect::from_corners(
        georef.pixel_from_geo(bounds.north_west),
        georef.pixel_from_geo(bounds.south_east),
    );
    let src_rect = image.pixel_rect().intersect(&tile_rect)?;
    Some(TilePlan {
        tile_rect,
        src_rect,
        dst_rect: destination_rect(&tile_rect, &src_rect),
    })
}

/// Shrink the tile canvas on each side by the fraction of `tile_rect`
/// that was clipped away on that side.
fn destination_rect(tile_rect: &PixelRect, src_rect: &PixelRect) -> PixelRect {
    let size = TILE_SIZE as f64;
    let mut dst = PixelRect::from_size(TILE_SIZE, TILE_SIZE);
    let (w, h) = (tile_rect.width() as f64, tile_rect.height() as f64);

    if src_rect.max_x != tile_rect.max_x {
        dst.max_x -= (size * ((tile_rect.max_x - src_rect.max_x) as f64 / w)) as i64;
    }
    if src_rect.min_x != tile_rect.min_x {
        dst.min_x += (size * ((src_rect.min_x - tile_rect.min_x) as f64 / w)) as i64;
    }
    if src_rect.max_y != tile_rect.max_y {
        dst.max_y -= (size * ((tile_rect.max_y - src_rect.max_y) as f64 / h)) as i64;
    }
    if src_rect.min_y != tile_rect.min_y {
        dst.min_y += (size * ((src_rect.min_y - tile_rect.min_y) as f64 / h)) as i64;
    }
    dst
}

/// Render a planned tile onto a black canvas
pub fn render_plan(image: &SourceImage, plan: &TilePlan) -> Result<RgbaImage> {
    let mut canvas = blank_canvas();
    let dst = plan.dst_rect;
    if dst.is_empty() {
        debug!("{}: {:?} rounds to nothing on the canvas", image.id(), plan);
        return Ok(canvas);
    }
    let patch = image
        .backend()
        .resample(plan.src_rect, dst.width() as u32, dst.height() as u32)?;
    imageops::overlay(&mut canvas, &patch, dst.min_x, dst.min_y);
    Ok(canvas)
}

/// Render `tile` of `image`; tiles outside the image are solid black
pub fn render_canvas(image: &SourceImage, tile: TileAddress) -> Result<RgbaImage> {
    match plan_tile(image, tile) {
        Some(plan) => render_plan(image, &plan),
        None => Ok(blank_canvas()),
    }
}

/// Render `tile` of `image` as PNG bytes
pub fn render_tile(image: &SourceImage, tile: TileAddress) -> Result<Vec<u8>> {
    encode_png(&render_canvas(image, tile)?)
}

pub fn encode_png(canvas: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(Error::Encode)?;
    Ok(buf)
}
