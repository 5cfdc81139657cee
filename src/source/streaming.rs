//! Region reads from large encoded images.
//!
//! Only the encoded file is kept. PNG rows are decoded in order and the
//! read stops at the last row of the region; JPEG is decoded with DCT
//! scaling at the smallest scale that still covers the output size. No
//! full-resolution raster is built for either.

use image::error::{DecodingError, ImageFormatHint};
use image::imageops::{self, FilterType};
use image::{ImageError, ImageFormat, ImageResult, Rgba, RgbaImage};
use jpeg_decoder::PixelFormat;
use log::debug;
use std::io::Cursor;
use std::path::PathBuf;

use super::RasterBackend;
use crate::error::{Error, Result};
use crate::geometry::PixelRect;

pub struct StreamingRaster {
    path: PathBuf,
    bytes: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
}

impl StreamingRaster {
    pub fn new(path: PathBuf, bytes: Vec<u8>, format: ImageFormat, width: u32, height: u32) -> Self {
        Self {
            path,
            bytes,
            format,
            width,
            height,
        }
    }

    /// Decode rows `0..region.max_y`, keeping only the columns of `region`
    fn read_png_region(&self, region: PixelRect) -> ImageResult<RgbaImage> {
        let png_err = |e: png::DecodingError| decoding_error(ImageFormat::Png, e);
        let mut decoder = png::Decoder::new(Cursor::new(self.bytes.as_slice()));
        decoder.set_transformations(png::Transformations::normalize_to_color8());
        let mut reader = decoder.read_info().map_err(png_err)?;
        if reader.info().interlaced {
            // Adam7 delivers rows pass by pass
            return self.read_whole(region);
        }

        let (color, _) = reader.output_color_type();
        let channels = color.samples();
        let (x0, x1) = (region.min_x as usize * channels, region.max_x as usize * channels);
        let mut out = RgbaImage::new(region.width() as u32, region.height() as u32);

        for y in 0..region.max_y {
            let row = reader.next_row().map_err(png_err)?.ok_or_else(|| {
                decoding_error(ImageFormat::Png, format!("image data ends before row {}", y))
            })?;
            if y < region.min_y {
                continue;
            }
            let out_y = (y - region.min_y) as u32;
            for (x, px) in row.data()[x0..x1].chunks_exact(channels).enumerate() {
                out.put_pixel(x as u32, out_y, to_rgba(px));
            }
        }
        Ok(out)
    }

    /// Decode at the coarsest DCT scale that keeps `region` at least
    /// `width` x `height`, then cut the scaled region out.
    fn read_jpeg_region(
        &self,
        region: PixelRect,
        width: u32,
        height: u32,
    ) -> ImageResult<RgbaImage> {
        let jpeg_err = |e: jpeg_decoder::Error| decoding_error(ImageFormat::Jpeg, e);
        let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(self.bytes.as_slice()));
        decoder.read_info().map_err(jpeg_err)?;
        let channels = match decoder.info().map(|info| info.pixel_format) {
            Some(PixelFormat::L8) => 1,
            Some(PixelFormat::RGB24) => 3,
            _ => return self.read_whole(region),
        };

        let ratio = (width as f64 / region.width() as f64)
            .max(height as f64 / region.height() as f64)
            .min(1.0);
        let request = |full: u32| {
            ((full as f64 * ratio).ceil() as u32).clamp(1, u16::MAX as u32) as u16
        };
        let (scaled_w, scaled_h) = decoder
            .scale(request(self.width), request(self.height))
            .map_err(jpeg_err)?;
        let pixels = decoder.decode().map_err(jpeg_err)?;

        let (scaled_w, scaled_h) = (scaled_w as u32, scaled_h as u32);
        let sx = scaled_w as f64 / self.width as f64;
        let sy = scaled_h as f64 / self.height as f64;
        let x0 = ((region.min_x as f64 * sx).floor() as u32).min(scaled_w - 1);
        let y0 = ((region.min_y as f64 * sy).floor() as u32).min(scaled_h - 1);
        let x1 = ((region.max_x as f64 * sx).ceil() as u32).clamp(x0 + 1, scaled_w);
        let y1 = ((region.max_y as f64 * sy).ceil() as u32).clamp(y0 + 1, scaled_h);
        debug!(
            "{}: jpeg scaled to {}x{}, region {}..{} x {}..{}",
            self.path.display(),
            scaled_w,
            scaled_h,
            x0,
            x1,
            y0,
            y1
        );

        let stride = scaled_w as usize * channels;
        Ok(RgbaImage::from_fn(x1 - x0, y1 - y0, |x, y| {
            let start = (y0 + y) as usize * stride + (x0 + x) as usize * channels;
            to_rgba(&pixels[start..start + channels])
        }))
    }

    /// Formats without row or scaled access decode in full
    fn read_whole(&self, region: PixelRect) -> ImageResult<RgbaImage> {
        debug!("{}: full decode for {:?}", self.path.display(), region);
        let decoded = image::load_from_memory_with_format(&self.bytes, self.format)?;
        Ok(decoded
            .crop_imm(
                region.min_x as u32,
                region.min_y as u32,
                region.width() as u32,
                region.height() as u32,
            )
            .to_rgba8())
    }
}

impl RasterBackend for StreamingRaster {
    fn name(&self) -> &'static str {
        "streaming"
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resample(&self, region: PixelRect, width: u32, height: u32) -> Result<RgbaImage> {
        debug!(
            "{}: extract {:?} -> {}x{}",
            self.path.display(),
            region,
            width,
            height
        );
        let patch = match self.format {
            ImageFormat::Png => self.read_png_region(region),
            ImageFormat::Jpeg => self.read_jpeg_region(region, width, height),
            _ => self.read_whole(region),
        }
        .map_err(|source| Error::Decode {
            path: self.path.clone(),
            source,
        })?;

        if patch.dimensions() == (width, height) {
            return Ok(patch);
        }
        Ok(imageops::resize(&patch, width, height, FilterType::Triangle))
    }
}

fn decoding_error(
    format: ImageFormat,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> ImageError {
    ImageError::Decoding(DecodingError::new(ImageFormatHint::Exact(format), err))
}

/// 8-bit gray, gray+alpha, RGB or RGBA sample to RGBA
fn to_rgba(px: &[u8]) -> Rgba<u8> {
    match *px {
        [g] => Rgba([g, g, g, 255]),
        [g, a] => Rgba([g, g, g, a]),
        [r, g, b] => Rgba([r, g, b, 255]),
        [r, g, b, a, ..] => Rgba([r, g, b, a]),
        [] => Rgba([0, 0, 0, 255]),
    }
}
