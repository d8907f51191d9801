//! Generated digit rendering
//!
//! Turns generator output (pixel probabilities in [0, 1]) into grayscale images.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use image::imageops::{self, FilterType};
use image::GrayImage;
use tch::{Device, Kind, Tensor};

fn to_pixels(t: &Tensor) -> Result<Vec<u8>> {
    let flat = t.to_device(Device::Cpu).to_kind(Kind::Float).flatten(0, -1);
    let values = Vec::<f32>::try_from(&flat)?;
    Ok(values
        .iter()
        .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect())
}

fn upscale(img: GrayImage, scale: u32) -> GrayImage {
    if scale <= 1 {
        return img;
    }
    let (w, h) = img.dimensions();
    imageops::resize(&img, w * scale, h * scale, FilterType::Nearest)
}

/// Convert one image tensor to a grayscale image
///
/// # Arguments
///
/// * `t` - Tensor of shape (side, side), (1, side, side) or (1, 1, side, side)
/// * `scale` - Nearest-neighbour upscaling factor
pub fn tensor_to_gray(t: &Tensor, scale: u32) -> Result<GrayImage> {
    let dims = t.size();
    ensure!(dims.len() >= 2, "Expected at least 2 dimensions, got {:?}", dims);
    ensure!(
        dims[..dims.len() - 2].iter().all(|&d| d == 1),
        "Expected a single image, got shape {:?}",
        dims
    );

    let height = dims[dims.len() - 2] as u32;
    let width = dims[dims.len() - 1] as u32;
    let img = GrayImage::from_raw(width, height, to_pixels(t)?)
        .context("Pixel buffer does not match image size")?;

    Ok(upscale(img, scale))
}

/// Tile a batch of images into one grayscale grid
///
/// # Arguments
///
/// * `batch` - Tensor of shape (n, 1, side, side)
/// * `columns` - Images per row
/// * `scale` - Nearest-neighbour upscaling factor
pub fn tile_grid(batch: &Tensor, columns: u32, scale: u32) -> Result<GrayImage> {
    let dims = batch.size();
    ensure!(dims.len() == 4 && dims[1] == 1, "Expected (n, 1, h, w), got {:?}", dims);

    let n = dims[0] as u32;
    let (h, w) = (dims[2] as u32, dims[3] as u32);
    let columns = columns.clamp(1, n.max(1));
    let rows = (n + columns - 1) / columns;

    let mut grid = GrayImage::new(columns * w, rows.max(1) * h);
    for i in 0..n {
        let tile = tensor_to_gray(&batch.get(i as i64), 1)?;
        imageops::replace(&mut grid, &tile, ((i % columns) * w) as i64, ((i / columns) * h) as i64);
    }

    Ok(upscale(grid, scale))
}

/// Save a single generated image as PNG
pub fn save_sample<P: AsRef<Path>>(path: P, t: &Tensor, scale: u32) -> Result<()> {
    let path = path.as_ref();
    tensor_to_gray(t, scale)?
        .save(path)
        .with_context(|| format!("Failed to write sample {}", path.display()))?;
    Ok(())
}

/// Save a batch of generated images as one PNG grid
pub fn save_sample_grid<P: AsRef<Path>>(path: P, batch: &Tensor, columns: u32, scale: u32) -> Result<()> {
    let path = path.as_ref();
    tile_grid(batch, columns, scale)?
        .save(path)
        .with_context(|| format!("Failed to write sample grid {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_to_gray_values() {
        let t = Tensor::from_slice(&[0.0f32, 0.5, 1.0, 2.0]).view([1, 1, 2, 2]);
        let img = tensor_to_gray(&t, 1).unwrap();

        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
        assert_eq!(img.get_pixel(1, 0).0[0], 128);
        assert_eq!(img.get_pixel(0, 1).0[0], 255);
        // clamped
        assert_eq!(img.get_pixel(1, 1).0[0], 255);
    }

    #[test]
    fn test_upscale() {
        let t = Tensor::rand([28, 28], (Kind::Float, Device::Cpu));
        let img = tensor_to_gray(&t, 4).unwrap();
        assert_eq!(img.dimensions(), (112, 112));
    }

    #[test]
    fn test_batch_rejected_as_single_image() {
        let t = Tensor::rand([2, 1, 28, 28], (Kind::Float, Device::Cpu));
        assert!(tensor_to_gray(&t, 1).is_err());
    }

    #[test]
    fn test_tile_grid_layout() {
        let t = Tensor::ones([5, 1, 3, 3], (Kind::Float, Device::Cpu));
        let grid = tile_grid(&t, 2, 1).unwrap();

        // 2 columns, 3 rows
        assert_eq!(grid.dimensions(), (6, 9));
        assert_eq!(grid.get_pixel(0, 0).0[0], 255);
        // empty slot of the last row stays black
        assert_eq!(grid.get_pixel(5, 8).0[0], 0);
    }

    #[test]
    fn test_save_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_0.png");
        let t = Tensor::rand([1, 1, 28, 28], (Kind::Float, Device::Cpu));

        save_sample(&path, &t, 1).unwrap();

        let loaded = image::open(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (28, 28));
    }
}
