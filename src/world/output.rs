//! PNG export of the frame buffers

use std::path::Path;

use image::error::{ParameterError, ParameterErrorKind};
use image::{ImageBuffer, ImageError, Luma, Rgba};
use log::debug;

use crate::rasterizer::Renderer;

fn dimension_mismatch() -> ImageError {
    ImageError::Parameter(ParameterError::from_kind(ParameterErrorKind::DimensionMismatch))
}

/// Depth as 8-bit gray: nearest finite depth 255, farthest 1, empty pixels 0
pub fn depth_to_gray(depth: &[f32]) -> Vec<u8> {
    let (min, max) = depth
        .iter()
        .filter(|d| d.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &d| (lo.min(d), hi.max(d)));
    let range = max - min;
    depth
        .iter()
        .map(|&d| {
            if !d.is_finite() {
                0
            } else if range <= 0.0 {
                255
            } else {
                255 - ((d - min) / range * 254.0).round() as u8
            }
        })
        .collect()
}

/// RGBA color buffer as a PNG
pub fn save_color_png<P: AsRef<Path>>(pixels: &[u8], width: usize, height: usize, path: P) -> Result<(), ImageError> {
    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_raw(width as u32, height as u32, pixels.to_vec()).ok_or_else(dimension_mismatch)?;
    img.save(path.as_ref())?;
    debug!("Saved color image {:?}", path.as_ref());
    Ok(())
}

/// Depth buffer as an 8-bit grayscale PNG, see `depth_to_gray`
pub fn save_depth_png<P: AsRef<Path>>(depth: &[f32], width: usize, height: usize, path: P) -> Result<(), ImageError> {
    let img: ImageBuffer<Luma<u8>, Vec<u8>> =
        ImageBuffer::from_raw(width as u32, height as u32, depth_to_gray(depth)).ok_or_else(dimension_mismatch)?;
    img.save(path.as_ref())?;
    debug!("Saved depth image {:?}", path.as_ref());
    Ok(())
}

/// Instance ids as a 16-bit grayscale PNG; ids above 65535 saturate
pub fn save_instances_png<P: AsRef<Path>>(
    instances: &[u32],
    width: usize,
    height: usize,
    path: P,
) -> Result<(), ImageError> {
    let ids: Vec<u16> = instances.iter().map(|&i| i.min(u16::MAX as u32) as u16).collect();
    let img: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_raw(width as u32, height as u32, ids).ok_or_else(dimension_mismatch)?;
    img.save(path.as_ref())?;
    debug!("Saved instance image {:?}", path.as_ref());
    Ok(())
}

/// Write `render.png`, `depth.png` and `instances.png` into `dir`
pub fn save_frame<P: AsRef<Path>>(renderer: &Renderer, dir: P) -> Result<(), ImageError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(ImageError::IoError)?;
    let (w, h) = (renderer.width(), renderer.height());
    save_color_png(renderer.color(), w, h, dir.join("render.png"))?;
    save_depth_png(renderer.depth(), w, h, dir.join("depth.png"))?;
    save_instances_png(renderer.instances(), w, h, dir.join("instances.png"))
}
