//! Generator network
//!
//! The Generator maps latent noise vectors to 28x28 single-channel images.
//! Architecture is a stack of fully connected layers with ReLU activations
//! and a sigmoid on the output so every pixel lands in [0, 1].

use tch::{nn, nn::Module, nn::ModuleT, Device, Tensor};

/// Generator network configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Size of the latent noise vector
    pub latent_dim: i64,
    /// Side length of the square output image
    pub image_side: i64,
    /// Widths of the three hidden layers
    pub hidden: [i64; 3],
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            latent_dim: 50,
            image_side: 28,
            hidden: [256, 512, 1024],
        }
    }
}

impl GeneratorConfig {
    /// Number of pixels in one generated image
    pub fn image_dim(&self) -> i64 {
        self.image_side * self.image_side
    }
}

/// Generator network
///
/// Architecture:
/// 1. latent -> 256 -> 512 -> 1024, ReLU after each
/// 2. 1024 -> image_dim with sigmoid
/// 3. Reshape to (batch, 1, side, side)
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    fc1: nn::Linear,
    fc2: nn::Linear,
    fc3: nn::Linear,
    fc4: nn::Linear,
}

impl Generator {
    /// Create a new Generator network
    pub fn new(vs: &nn::Path, config: GeneratorConfig) -> Self {
        let [h1, h2, h3] = config.hidden;

        let fc1 = nn::linear(vs / "fc1", config.latent_dim, h1, Default::default());
        let fc2 = nn::linear(vs / "fc2", h1, h2, Default::default());
        let fc3 = nn::linear(vs / "fc3", h2, h3, Default::default());
        let fc4 = nn::linear(vs / "fc4", h3, config.image_dim(), Default::default());

        Self {
            config,
            fc1,
            fc2,
            fc3,
            fc4,
        }
    }

    /// Generate images from noise
    ///
    /// # Arguments
    ///
    /// * `noise` - Tensor of shape (batch_size, latent_dim)
    /// * `_train` - Training flag; the generator has no train-only layers
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, 1, image_side, image_side) in [0, 1]
    pub fn forward_t(&self, noise: &Tensor, _train: bool) -> Tensor {
        let batch_size = noise.size()[0];
        let side = self.config.image_side;

        let x = noise.view([batch_size, self.config.latent_dim]);
        let x = self.fc1.forward(&x).relu();
        let x = self.fc2.forward(&x).relu();
        let x = self.fc3.forward(&x).relu();
        let x = self.fc4.forward(&x).sigmoid();

        x.view([batch_size, 1, side, side])
    }

    /// Generate images (inference mode)
    pub fn generate(&self, noise: &Tensor) -> Tensor {
        self.forward_t(noise, false)
    }

    /// Generate images from freshly sampled standard normal noise
    ///
    /// # Arguments
    ///
    /// * `num_samples` - Number of images to generate
    /// * `device` - Device to create the noise on
    pub fn generate_random(&self, num_samples: i64, device: Device) -> Tensor {
        let noise = Tensor::randn([num_samples, self.config.latent_dim], (tch::Kind::Float, device));
        self.generate(&noise)
    }

    /// Get configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

impl ModuleT for Generator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Generator::forward_t(self, xs, train)
    }
}
