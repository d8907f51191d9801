//! Training module for the GAN
//!
//! This module provides:
//! - Training loop implementation
//! - Loss functions (Binary Cross Entropy)
//! - Loss bookkeeping

mod history;
mod losses;
mod trainer;

pub use history::{strided, EmaTracker, LossHistory};
pub use losses::{discriminator_loss, generator_loss};
pub use trainer::{discriminator_step, generator_step, EpochSummary, Trainer, TrainingConfig};
