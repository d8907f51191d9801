//! Data module for fetching and loading MNIST
//!
//! This module provides:
//! - Downloader for the gzipped MNIST files
//! - IDX parsing
//! - DataLoader for batching images

pub mod download;
pub mod idx;
mod loader;
mod mnist;

pub use download::{ensure_mnist, raw_dir, MnistDownloader};
pub use idx::IdxError;
pub use loader::DataLoader;
pub use mnist::MnistDataset;
