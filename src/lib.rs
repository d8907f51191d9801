//! # GAN for MNIST
//!
//! This crate trains a fully connected Generative Adversarial Network on
//! handwritten digits. The generator maps noise to 28x28 images, the
//! discriminator tells real digits from generated ones, and both are
//! trained in alternation.
//!
//! ## Modules
//!
//! - `data`: MNIST download, IDX parsing and batching
//! - `model`: Generator and Discriminator networks
//! - `training`: Training loop, losses and loss bookkeeping
//! - `imaging`: Loss plots and sample images
//! - `utils`: Configuration and checkpoints

pub mod data;
pub mod imaging;
pub mod model;
pub mod training;
pub mod utils;

pub use data::{DataLoader, MnistDataset, MnistDownloader};
pub use model::{Discriminator, Gan, Generator};
pub use training::{LossHistory, Trainer, TrainingConfig};
pub use utils::{load_checkpoint, save_checkpoint, Config};
