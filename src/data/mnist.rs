//! MNIST dataset as tensors

use std::path::Path;

use anyhow::{ensure, Context, Result};
use tch::{Kind, Tensor};

use super::download::{TEST_IMAGES, TEST_LABELS, TRAIN_IMAGES, TRAIN_LABELS};
use super::idx::{read_images, read_labels, IdxImages};

/// Images and labels of one MNIST split
#[derive(Debug)]
pub struct MnistDataset {
    /// Float tensor (n, 1, rows, cols) with pixels in [0, 1]
    pub images: Tensor,
    /// Int64 tensor (n)
    pub labels: Tensor,
}

impl MnistDataset {
    /// Load a split from a directory of uncompressed IDX files
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory containing the IDX files
    /// * `train` - Load the training split (otherwise the t10k test split)
    pub fn load<P: AsRef<Path>>(dir: P, train: bool) -> Result<Self> {
        let dir = dir.as_ref();
        let (images_name, labels_name) = if train {
            (TRAIN_IMAGES, TRAIN_LABELS)
        } else {
            (TEST_IMAGES, TEST_LABELS)
        };

        let images = read_images(dir.join(images_name))
            .with_context(|| format!("Failed to read {}", dir.join(images_name).display()))?;
        let labels = read_labels(dir.join(labels_name))
            .with_context(|| format!("Failed to read {}", dir.join(labels_name).display()))?;

        Self::from_raw(&images, &labels)
    }

    /// Build a dataset from decoded IDX data
    ///
    /// Pixels are scaled from u8 to [0, 1].
    pub fn from_raw(images: &IdxImages, labels: &[u8]) -> Result<Self> {
        ensure!(
            images.count == labels.len(),
            "Image count ({}) does not match label count ({})",
            images.count,
            labels.len()
        );
        ensure!(
            images.rows == images.cols,
            "Images must be square, got {}x{}",
            images.rows,
            images.cols
        );
        ensure!(
            images.count.checked_mul(images.image_size()) == Some(images.pixels.len()),
            "Expected {} images of {}x{}, got {} pixels",
            images.count,
            images.rows,
            images.cols,
            images.pixels.len()
        );

        let pixels = Tensor::from_slice(&images.pixels)
            .to_kind(Kind::Float)
            .view([images.count as i64, 1, images.rows as i64, images.cols as i64])
            / 255.0;
        let labels = Tensor::from_slice(labels).to_kind(Kind::Int64);

        Ok(Self {
            images: pixels,
            labels,
        })
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.images.size()[0] as usize
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Side length of the (square) images
    pub fn image_side(&self) -> i64 {
        self.images.size()[3]
    }
}
