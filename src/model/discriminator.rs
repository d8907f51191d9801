//! Discriminator network
//!
//! The Discriminator classifies images as real or generated.
//! Images are flattened and pushed through fully connected layers with
//! ReLU and dropout, ending in a single sigmoid unit.

use tch::{nn, nn::Module, nn::ModuleT, Tensor};

/// Discriminator network configuration
#[derive(Debug, Clone)]
pub struct DiscriminatorConfig {
    /// Number of input pixels (side * side)
    pub image_dim: i64,
    /// Widths of the three hidden layers
    pub hidden: [i64; 3],
    /// Dropout rate applied after each hidden layer while training
    pub dropout: f64,
}

impl Default for DiscriminatorConfig {
    fn default() -> Self {
        Self {
            image_dim: 28 * 28,
            hidden: [1024, 512, 256],
            dropout: 0.3,
        }
    }
}

/// Discriminator network
///
/// Architecture:
/// 1. image_dim -> 1024 -> 512 -> 256, each with ReLU then dropout
/// 2. 256 -> 1 with sigmoid
#[derive(Debug)]
pub struct Discriminator {
    config: DiscriminatorConfig,
    fc1: nn::Linear,
    fc2: nn::Linear,
    fc3: nn::Linear,
    fc4: nn::Linear,
}

impl Discriminator {
    /// Create a new Discriminator network
    pub fn new(vs: &nn::Path, config: DiscriminatorConfig) -> Self {
        let [h1, h2, h3] = config.hidden;

        let fc1 = nn::linear(vs / "fc1", config.image_dim, h1, Default::default());
        let fc2 = nn::linear(vs / "fc2", h1, h2, Default::default());
        let fc3 = nn::linear(vs / "fc3", h2, h3, Default::default());
        let fc4 = nn::linear(vs / "fc4", h3, 1, Default::default());

        Self {
            config,
            fc1,
            fc2,
            fc3,
            fc4,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `input` - Tensor of shape (batch_size, ...) holding image_dim values per sample
    /// * `train` - Whether in training mode (enables dropout)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, 1) with probabilities of being real
    pub fn forward_t(&self, input: &Tensor, train: bool) -> Tensor {
        let batch_size = input.size()[0];
        let p = self.config.dropout;

        let x = input.view([batch_size, self.config.image_dim]);
        let x = self.fc1.forward(&x).relu().dropout(p, train);
        let x = self.fc2.forward(&x).relu().dropout(p, train);
        let x = self.fc3.forward(&x).relu().dropout(p, train);

        self.fc4.forward(&x).sigmoid()
    }

    /// Classify samples (inference mode)
    pub fn classify(&self, input: &Tensor) -> Tensor {
        self.forward_t(input, false)
    }

    /// Get configuration
    pub fn config(&self) -> &DiscriminatorConfig {
        &self.config
    }
}

impl ModuleT for Discriminator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Discriminator::forward_t(self, xs, train)
    }
}
