//! Configuration management
//!
//! Provides unified configuration for the whole training pipeline.
//! Defaults reproduce the reference MNIST GAN setup.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Data configuration
    pub data: DataConfig,
    /// Model configuration
    pub model: ModelConfig,
    /// Training configuration
    pub training: TrainingSection,
}

/// Data-related configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    /// Root directory for the dataset (files live in `<data_dir>/MNIST/raw`)
    pub data_dir: String,
    /// Batch size
    pub batch_size: usize,
    /// Shuffle the training set every epoch
    pub shuffle: bool,
    /// Drop the last incomplete batch
    pub drop_last: bool,
    /// Download the dataset when it is missing
    pub download: bool,
}

/// Model-related configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Latent dimension size
    pub latent_dim: i64,
    /// Side of the square images
    pub image_side: i64,
    /// Dropout rate for discriminator
    pub dropout: f64,
}

/// Training-related configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingSection {
    /// Number of epochs
    pub epochs: usize,
    /// Generator learning rate
    pub gen_lr: f64,
    /// Discriminator learning rate
    pub disc_lr: f64,
    /// Update the generator on every k-th batch
    pub generator_every: usize,
    /// Random seed for weights, noise and shuffling
    pub seed: u64,
    /// Directory for per-epoch loss plots and samples
    pub results_dir: String,
    /// Upscaling factor for the per-epoch sample image
    pub sample_scale: u32,
    /// Checkpoint save frequency in epochs (0 disables checkpoints)
    pub checkpoint_every: usize,
    /// Checkpoint directory
    pub checkpoint_dir: String,
    /// Device: "cpu", "cuda" or "auto"
    pub device: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            batch_size: 128,
            shuffle: true,
            drop_last: false,
            download: true,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            latent_dim: 50,
            image_side: 28,
            dropout: 0.3,
        }
    }
}

impl Default for TrainingSection {
    fn default() -> Self {
        Self {
            epochs: 100,
            gen_lr: 2e-6,
            disc_lr: 2e-4,
            generator_every: 2,
            seed: 1,
            results_dir: "results".to_string(),
            sample_scale: 1,
            checkpoint_every: 0,
            checkpoint_dir: "checkpoints".to_string(),
            device: "auto".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            model: ModelConfig::default(),
            training: TrainingSection::default(),
        }
    }
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_toml(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_toml(&self, path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn save_json(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration, picking the format from the file extension
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if path.ends_with(".toml") {
            Self::from_toml(path)
        } else {
            Self::from_json(path)
        }
    }

    /// Save configuration, picking the format from the file extension
    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        if path.ends_with(".toml") {
            self.save_toml(path)
        } else {
            self.save_json(path)
        }
    }

    /// Load configuration if the file exists, otherwise fall back to defaults
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            tracing::info!("Config file {} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Get device from configuration
    pub fn device(&self) -> tch::Device {
        match self.training.device.to_lowercase().as_str() {
            "cuda" | "gpu" => {
                if tch::Cuda::is_available() {
                    tch::Device::Cuda(0)
                } else {
                    tracing::warn!("CUDA requested but not available, falling back to CPU");
                    tch::Device::Cpu
                }
            }
            "auto" => tch::Device::cuda_if_available(),
            _ => tch::Device::Cpu,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.data.batch_size == 0 {
            anyhow::bail!("Batch size must be > 0");
        }
        if self.model.latent_dim <= 0 {
            anyhow::bail!("Latent dimension must be > 0");
        }
        if self.model.image_side <= 0 {
            anyhow::bail!("Image side must be > 0");
        }
        if !(0.0..1.0).contains(&self.model.dropout) {
            anyhow::bail!("Dropout must be in [0, 1)");
        }
        if self.training.epochs == 0 {
            anyhow::bail!("Number of epochs must be > 0");
        }
        if self.training.generator_every == 0 {
            anyhow::bail!("generator_every must be > 0");
        }
        if self.training.gen_lr <= 0.0 || self.training.disc_lr <= 0.0 {
            anyhow::bail!("Learning rates must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.data.batch_size, 128);
        assert_eq!(config.model.latent_dim, 50);
        assert_eq!(config.model.image_side, 28);
        assert_eq!(config.training.epochs, 100);
        assert_eq!(config.training.generator_every, 2);
        assert_eq!(config.training.seed, 1);
        assert_eq!(config.training.gen_lr, 2e-6);
        assert_eq!(config.training.disc_lr, 2e-4);
        assert_eq!(config.training.checkpoint_every, 0);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let loaded: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config, loaded);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let mut file: NamedTempFile = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[training]\nepochs = 3\n\n[data]\nbatch_size = 16").unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.training.epochs, 3);
        assert_eq!(config.data.batch_size, 16);
        assert_eq!(config.model.latent_dim, 50);
    }

    #[test]
    fn test_save_and_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["config.json", "config.toml"] {
            let path = dir.path().join(name);
            let path = path.to_str().unwrap();

            let mut config = Config::default();
            config.training.seed = 42;
            config.save(path).unwrap();

            assert_eq!(Config::load(path).unwrap(), config);
        }
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load_or_default("/nonexistent/config.json").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.data.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.training.generator_every = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.dropout = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cpu_device() {
        let mut config = Config::default();
        config.training.device = "cpu".to_string();
        assert_eq!(config.device(), tch::Device::Cpu);
    }
}
