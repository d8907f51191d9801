//! GAN wrapper combining Generator and Discriminator
//!
//! Owns one variable store per network so each optimizer only ever sees
//! its own parameters.

use anyhow::Result;
use tch::{nn, nn::OptimizerConfig, nn::VarStore, Device, Tensor};

use super::discriminator::{Discriminator, DiscriminatorConfig};
use super::generator::{Generator, GeneratorConfig};

/// Complete GAN model
pub struct Gan {
    /// Generator network
    pub generator: Generator,
    /// Discriminator network
    pub discriminator: Discriminator,
    /// Variable store for generator
    pub gen_vs: VarStore,
    /// Variable store for discriminator
    pub disc_vs: VarStore,
    /// Device (CPU/GPU)
    pub device: Device,
}

impl Gan {
    /// Create a new GAN model
    ///
    /// # Arguments
    ///
    /// * `gen_config` - Generator configuration
    /// * `disc_config` - Discriminator configuration
    /// * `device` - Device to create model on
    pub fn new(gen_config: GeneratorConfig, disc_config: DiscriminatorConfig, device: Device) -> Self {
        let gen_vs = VarStore::new(device);
        let disc_vs = VarStore::new(device);

        let generator = Generator::new(&gen_vs.root(), gen_config);
        let discriminator = Discriminator::new(&disc_vs.root(), disc_config);

        Self {
            generator,
            discriminator,
            gen_vs,
            disc_vs,
            device,
        }
    }

    /// Create the fixed MNIST architecture (28x28 images)
    ///
    /// # Arguments
    ///
    /// * `latent_dim` - Size of latent noise vector
    /// * `dropout` - Discriminator dropout rate
    /// * `device` - Device to create model on
    pub fn mnist(latent_dim: i64, dropout: f64, device: Device) -> Self {
        Self::with_image_side(latent_dim, 28, dropout, device)
    }

    /// Create the standard architecture for square images of any side
    pub fn with_image_side(latent_dim: i64, image_side: i64, dropout: f64, device: Device) -> Self {
        let gen_config = GeneratorConfig {
            latent_dim,
            image_side,
            ..Default::default()
        };

        let disc_config = DiscriminatorConfig {
            image_dim: gen_config.image_dim(),
            dropout,
            ..Default::default()
        };

        Self::new(gen_config, disc_config, device)
    }

    /// Generate images from freshly sampled noise
    ///
    /// # Returns
    ///
    /// Tensor of shape (num_samples, 1, side, side)
    pub fn generate(&self, num_samples: i64) -> Tensor {
        self.generator.generate_random(num_samples, self.device)
    }

    /// Generate images from specific noise vectors
    pub fn generate_from_noise(&self, noise: &Tensor) -> Tensor {
        self.generator.generate(noise)
    }

    /// Discriminate samples (probability of being real)
    pub fn discriminate(&self, samples: &Tensor) -> Tensor {
        self.discriminator.classify(samples)
    }

    /// Adam optimizer over the generator parameters
    pub fn generator_optimizer(&self, lr: f64) -> Result<nn::Optimizer> {
        Ok(nn::Adam::default().build(&self.gen_vs, lr)?)
    }

    /// Adam optimizer over the discriminator parameters
    pub fn discriminator_optimizer(&self, lr: f64) -> Result<nn::Optimizer> {
        Ok(nn::Adam::default().build(&self.disc_vs, lr)?)
    }

    /// Save model weights
    pub fn save(&self, gen_path: &str, disc_path: &str) -> Result<()> {
        self.gen_vs.save(gen_path)?;
        self.disc_vs.save(disc_path)?;
        Ok(())
    }

    /// Load model weights
    pub fn load(&mut self, gen_path: &str, disc_path: &str) -> Result<()> {
        self.gen_vs.load(gen_path)?;
        self.disc_vs.load(disc_path)?;
        Ok(())
    }

    /// Load generator weights only (enough for sampling)
    pub fn load_generator(&mut self, gen_path: &str) -> Result<()> {
        self.gen_vs.load(gen_path)?;
        Ok(())
    }

    /// Get latent dimension
    pub fn latent_dim(&self) -> i64 {
        self.generator.config().latent_dim
    }

    /// Get generated image side length
    pub fn image_side(&self) -> i64 {
        self.generator.config().image_side
    }
}
