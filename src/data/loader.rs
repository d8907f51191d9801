//! DataLoader for batching and iterating over training images
//!
//! Provides batching for GAN training with support for:
//! - Seeded random shuffling each epoch
//! - Drop last incomplete batch
//! - Iteration over batches

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tch::Tensor;

/// DataLoader for iterating over batched images
pub struct DataLoader {
    /// Full dataset of shape (num_samples, ...)
    data: Tensor,
    /// Batch size
    batch_size: usize,
    /// Whether to shuffle data each epoch
    shuffle: bool,
    /// Whether to drop the last incomplete batch
    drop_last: bool,
    /// Shuffling source
    rng: StdRng,
    /// Current indices for iteration
    indices: Vec<i64>,
    /// Current position in iteration
    current_idx: usize,
}

impl DataLoader {
    /// Create a new DataLoader
    ///
    /// # Arguments
    ///
    /// * `data` - Tensor whose first dimension indexes samples
    /// * `batch_size` - Number of samples per batch
    /// * `shuffle` - Whether to shuffle data each epoch
    /// * `drop_last` - Whether to drop incomplete final batch
    /// * `seed` - Seed for the shuffling RNG
    pub fn new(data: Tensor, batch_size: usize, shuffle: bool, drop_last: bool, seed: u64) -> Self {
        let num_samples = data.size()[0];
        let indices: Vec<i64> = (0..num_samples).collect();

        Self {
            data,
            batch_size: batch_size.max(1),
            shuffle,
            drop_last,
            rng: StdRng::seed_from_u64(seed),
            indices,
            current_idx: 0,
        }
    }

    /// Get the number of batches per epoch
    pub fn num_batches(&self) -> usize {
        let num_samples = self.num_samples();
        if self.drop_last {
            num_samples / self.batch_size
        } else {
            (num_samples + self.batch_size - 1) / self.batch_size
        }
    }

    /// Get total number of samples
    pub fn num_samples(&self) -> usize {
        self.indices.len()
    }

    /// Get batch size
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Reset for new epoch
    pub fn reset(&mut self) {
        self.current_idx = 0;
        if self.shuffle {
            self.indices.shuffle(&mut self.rng);
        }
    }

    /// Get next batch
    ///
    /// Returns None when epoch is complete
    pub fn next_batch(&mut self) -> Option<Tensor> {
        let num_samples = self.indices.len();
        let start = self.current_idx;

        if start >= num_samples {
            return None;
        }

        let end = (start + self.batch_size).min(num_samples);

        // Skip incomplete batch if drop_last
        if self.drop_last && end - start < self.batch_size {
            return None;
        }

        let index = Tensor::from_slice(&self.indices[start..end]);
        let batch = self.data.index_select(0, &index);

        self.current_idx = end;
        Some(batch)
    }

    /// Start a new epoch and iterate over its batches
    pub fn iter(&mut self) -> DataLoaderIter<'_> {
        self.reset();
        DataLoaderIter { loader: self }
    }
}

/// Iterator adapter for DataLoader
pub struct DataLoaderIter<'a> {
    loader: &'a mut DataLoader,
}

impl<'a> Iterator for DataLoaderIter<'a> {
    type Item = Tensor;

    fn next(&mut self) -> Option<Self::Item> {
        self.loader.next_batch()
    }
}
