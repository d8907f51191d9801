//! Training loop implementation for the GAN
//!
//! Every batch updates the discriminator once; every k-th batch also
//! updates the generator. After each epoch a loss plot and a sample
//! image are written to the results directory.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tch::{nn, Kind, Tensor};
use tracing::{info, warn};

use super::history::{strided, EmaTracker, LossHistory};
use super::losses::{discriminator_loss, generator_loss};
use crate::data::DataLoader;
use crate::imaging::{save_sample, LossPlot};
use crate::model::Gan;
use crate::utils::{save_checkpoint, Config};

/// Training configuration
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,
    /// Learning rate for generator
    pub gen_lr: f64,
    /// Learning rate for discriminator
    pub disc_lr: f64,
    /// Update the generator on every k-th batch
    pub generator_every: usize,
    /// Directory for per-epoch loss plots and samples
    pub results_dir: String,
    /// Upscaling factor for sample images
    pub sample_scale: u32,
    /// Save checkpoint every N epochs (0 disables)
    pub checkpoint_every: usize,
    /// Directory to save checkpoints
    pub checkpoint_dir: String,
    /// Draw a progress bar per epoch
    pub progress: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            gen_lr: 2e-6,
            disc_lr: 2e-4,
            generator_every: 2,
            results_dir: "results".to_string(),
            sample_scale: 1,
            checkpoint_every: 0,
            checkpoint_dir: "checkpoints".to_string(),
            progress: true,
        }
    }
}

impl From<&Config> for TrainingConfig {
    fn from(config: &Config) -> Self {
        let t = &config.training;
        Self {
            epochs: t.epochs,
            gen_lr: t.gen_lr,
            disc_lr: t.disc_lr,
            generator_every: t.generator_every,
            results_dir: t.results_dir.clone(),
            sample_scale: t.sample_scale,
            checkpoint_every: t.checkpoint_every,
            checkpoint_dir: t.checkpoint_dir.clone(),
            progress: true,
        }
    }
}

/// Mean losses of one epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochSummary {
    pub discriminator_loss: f64,
    /// None when the epoch had fewer than k batches
    pub generator_loss: Option<f64>,
    pub discriminator_updates: usize,
    pub generator_updates: usize,
}

/// GAN Trainer
pub struct Trainer {
    config: TrainingConfig,
    history: LossHistory,
    start_epoch: usize,
}

impl Trainer {
    /// Create a new trainer
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            history: LossHistory::new(),
            start_epoch: 0,
        }
    }

    /// Continue from a previous run
    ///
    /// Epoch numbering (and output file names) resume at `start_epoch`.
    pub fn resume(config: TrainingConfig, history: LossHistory, start_epoch: usize) -> Self {
        Self {
            config,
            history,
            start_epoch,
        }
    }

    /// Train the GAN
    ///
    /// # Arguments
    ///
    /// * `gan` - Model to train
    /// * `data_loader` - DataLoader providing real image batches
    ///
    /// # Returns
    ///
    /// Loss history of the whole run
    pub fn train(&mut self, gan: &mut Gan, data_loader: &mut DataLoader) -> Result<&LossHistory> {
        let mut gen_opt = gan.generator_optimizer(self.config.gen_lr)?;
        let mut disc_opt = gan.discriminator_optimizer(self.config.disc_lr)?;

        let num_batches = data_loader.num_batches();
        let end_epoch = self.start_epoch + self.config.epochs;

        std::fs::create_dir_all(&self.config.results_dir)
            .with_context(|| format!("Failed to create {}", self.config.results_dir))?;

        info!(
            "Starting training for {} epochs, {} batches per epoch, generator every {} batches",
            self.config.epochs, num_batches, self.config.generator_every
        );

        let start = Instant::now();

        for epoch in self.start_epoch..end_epoch {
            info!("Step {}", epoch);

            let summary = self.train_epoch(gan, data_loader, &mut gen_opt, &mut disc_opt)?;

            info!(
                "Epoch {}/{}: D_loss={:.4}, G_loss={}, D_updates={}, G_updates={}",
                epoch + 1,
                end_epoch,
                summary.discriminator_loss,
                summary
                    .generator_loss
                    .map(|l| format!("{:.4}", l))
                    .unwrap_or_else(|| "n/a".to_string()),
                summary.discriminator_updates,
                summary.generator_updates
            );

            if self.history.check_mode_collapse(10) {
                warn!("Possible mode collapse detected! Consider adjusting learning rates.");
            }

            self.write_epoch_outputs(gan, epoch, num_batches)?;

            let done = epoch + 1;
            if self.config.checkpoint_every > 0 && done % self.config.checkpoint_every == 0 {
                if let Err(e) = save_checkpoint(gan, &self.history, done, &self.config.checkpoint_dir) {
                    warn!("Failed to save checkpoint: {}", e);
                }
            }
        }

        info!("Training took {:.2}s", start.elapsed().as_secs_f64());

        Ok(&self.history)
    }

    /// Run one pass over the data
    pub fn train_epoch(
        &mut self,
        gan: &Gan,
        data_loader: &mut DataLoader,
        gen_opt: &mut nn::Optimizer,
        disc_opt: &mut nn::Optimizer,
    ) -> Result<EpochSummary> {
        let k = self.config.generator_every.max(1);
        let disc_start = self.history.discriminator.len();
        let gen_start = self.history.generator.len();

        let pb = if self.config.progress {
            let pb = ProgressBar::new(data_loader.num_batches() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
                    .progress_chars("##-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };
        let mut disc_ema = EmaTracker::new(0.1);

        for (batch_idx, real) in data_loader.iter().enumerate() {
            let real = real.to_device(gan.device);

            let d_loss = discriminator_step(gan, disc_opt, &real);
            self.history.record_discriminator(d_loss);
            disc_ema.update(d_loss);

            if (batch_idx + 1) % k == 0 {
                let g_loss = generator_step(gan, gen_opt, real.size()[0]);
                self.history.record_generator(g_loss);
            }

            pb.set_message(format!(
                "D: {:.4}, G: {}",
                disc_ema.value(),
                self.history
                    .latest_generator()
                    .map(|l| format!("{:.4}", l))
                    .unwrap_or_else(|| "-".to_string())
            ));
            pb.inc(1);
        }

        pb.finish_with_message("done");

        Ok(EpochSummary {
            discriminator_loss: self.history.discriminator_mean_since(disc_start).unwrap_or(0.0),
            generator_loss: self.history.generator_mean_since(gen_start),
            discriminator_updates: self.history.discriminator.len() - disc_start,
            generator_updates: self.history.generator.len() - gen_start,
        })
    }

    /// Write `loss_{epoch}.png` and `test_{epoch}.png` to the results directory
    pub fn write_epoch_outputs(&self, gan: &Gan, epoch: usize, batches_per_epoch: usize) -> Result<(PathBuf, PathBuf)> {
        let dir = Path::new(&self.config.results_dir);
        let k = self.config.generator_every.max(1);

        // One point per epoch's worth of updates
        let disc_stride = batches_per_epoch.max(1);
        let gen_stride = (batches_per_epoch / k).max(1);

        let loss_path = dir.join(format!("loss_{}.png", epoch));
        LossPlot::default().save(
            &loss_path,
            &strided(&self.history.generator, gen_stride),
            &strided(&self.history.discriminator, disc_stride),
        )?;

        let noise = Tensor::randn([1, gan.latent_dim()], (Kind::Float, gan.device));
        let sample = tch::no_grad(|| gan.generate_from_noise(&noise));
        let sample_path = dir.join(format!("test_{}.png", epoch));
        save_sample(&sample_path, &sample, self.config.sample_scale)?;

        Ok((loss_path, sample_path))
    }

    /// Get loss history
    pub fn history(&self) -> &LossHistory {
        &self.history
    }

    /// Get configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }
}

/// One discriminator update on a real batch and a fresh fake batch
///
/// Fakes are generated without tracking generator gradients. Dropout is
/// active in the discriminator.
///
/// # Returns
///
/// The discriminator loss
pub fn discriminator_step(gan: &Gan, disc_opt: &mut nn::Optimizer, real: &Tensor) -> f64 {
    let batch_size = real.size()[0];
    let noise = Tensor::randn([batch_size, gan.latent_dim()], (Kind::Float, gan.device));
    let fake = tch::no_grad(|| gan.generator.forward_t(&noise, false));

    let real_probs = gan.discriminator.forward_t(real, true);
    let fake_probs = gan.discriminator.forward_t(&fake, true);
    let loss = discriminator_loss(&real_probs, &fake_probs);

    disc_opt.zero_grad();
    loss.backward();
    disc_opt.step();

    loss.double_value(&[])
}

/// One generator update: try to make the discriminator call fresh fakes real
///
/// The discriminator runs in evaluation mode (no dropout).
///
/// # Returns
///
/// The generator loss
pub fn generator_step(gan: &Gan, gen_opt: &mut nn::Optimizer, batch_size: i64) -> f64 {
    let noise = Tensor::randn([batch_size, gan.latent_dim()], (Kind::Float, gan.device));
    let fake = gan.generator.forward_t(&noise, true);
    let fake_probs = gan.discriminator.forward_t(&fake, false);
    let loss = generator_loss(&fake_probs);

    gen_opt.zero_grad();
    loss.backward();
    gen_opt.step();

    loss.double_value(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn::VarStore, Device};

    fn tiny_gan() -> Gan {
        Gan::with_image_side(8, 6, 0.3, Device::Cpu)
    }

    fn snapshot(vs: &VarStore) -> Vec<Tensor> {
        vs.trainable_variables().iter().map(|t| t.detach().copy()).collect()
    }

    fn unchanged(before: &[Tensor], vs: &VarStore) -> bool {
        before
            .iter()
            .zip(vs.trainable_variables().iter())
            .all(|(a, b)| a.allclose(b, 0.0, 0.0, false))
    }

    fn test_config(results_dir: &Path, epochs: usize) -> TrainingConfig {
        TrainingConfig {
            epochs,
            gen_lr: 1e-3,
            disc_lr: 1e-3,
            results_dir: results_dir.to_string_lossy().to_string(),
            progress: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.epochs, 100);
        assert_eq!(config.generator_every, 2);
        assert_eq!(config.checkpoint_every, 0);
    }

    #[test]
    fn test_config_conversion() {
        let mut config = Config::default();
        config.training.epochs = 7;
        config.training.generator_every = 3;

        let training = TrainingConfig::from(&config);
        assert_eq!(training.epochs, 7);
        assert_eq!(training.generator_every, 3);
        assert_eq!(training.results_dir, "results");
    }

    #[test]
    fn test_discriminator_step_only_moves_discriminator() {
        let gan = tiny_gan();
        let mut disc_opt = gan.discriminator_optimizer(1e-2).unwrap();
        let gen_before = snapshot(&gan.gen_vs);
        let disc_before = snapshot(&gan.disc_vs);

        let real = Tensor::rand([4, 1, 6, 6], (Kind::Float, Device::Cpu));
        let loss = discriminator_step(&gan, &mut disc_opt, &real);

        assert!(loss >= 0.0);
        assert!(unchanged(&gen_before, &gan.gen_vs));
        assert!(!unchanged(&disc_before, &gan.disc_vs));
    }

    #[test]
    fn test_generator_step_only_moves_generator() {
        let gan = tiny_gan();
        let mut gen_opt = gan.generator_optimizer(1e-2).unwrap();
        let gen_before = snapshot(&gan.gen_vs);
        let disc_before = snapshot(&gan.disc_vs);

        let loss = generator_step(&gan, &mut gen_opt, 4);

        assert!(loss >= 0.0);
        assert!(!unchanged(&gen_before, &gan.gen_vs));
        assert!(unchanged(&disc_before, &gan.disc_vs));
    }

    #[test]
    fn test_train_writes_two_files_per_epoch() {
        let results = tempfile::tempdir().unwrap();
        let mut gan = tiny_gan();
        let data = Tensor::rand([10, 1, 6, 6], (Kind::Float, Device::Cpu));
        let mut loader = DataLoader::new(data, 4, true, false, 1);

        let mut trainer = Trainer::new(test_config(results.path(), 2));
        let history = trainer.train(&mut gan, &mut loader).unwrap();

        // 3 batches per epoch: D every batch, G on batch 2
        assert_eq!(history.discriminator.len(), 6);
        assert_eq!(history.generator.len(), 2);
        assert!(history.is_non_negative());

        let mut files: Vec<String> = std::fs::read_dir(results.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        files.sort();
        assert_eq!(files, vec!["loss_0.png", "loss_1.png", "test_0.png", "test_1.png"]);
    }

    #[test]
    fn test_epoch_summary_counts() {
        let results = tempfile::tempdir().unwrap();
        let gan = tiny_gan();
        let mut gen_opt = gan.generator_optimizer(1e-3).unwrap();
        let mut disc_opt = gan.discriminator_optimizer(1e-3).unwrap();
        let data = Tensor::rand([9, 1, 6, 6], (Kind::Float, Device::Cpu));
        let mut loader = DataLoader::new(data, 1, false, false, 1);

        let mut config = test_config(results.path(), 1);
        config.generator_every = 3;
        let mut trainer = Trainer::new(config);

        let summary = trainer
            .train_epoch(&gan, &mut loader, &mut gen_opt, &mut disc_opt)
            .unwrap();

        assert_eq!(summary.discriminator_updates, 9);
        assert_eq!(summary.generator_updates, 3);
        assert!(summary.generator_loss.is_some());
        assert!(summary.discriminator_loss >= 0.0);
    }

    #[test]
    fn test_resume_numbers_outputs_after_start_epoch() {
        let results = tempfile::tempdir().unwrap();
        let mut gan = tiny_gan();
        let data = Tensor::rand([4, 1, 6, 6], (Kind::Float, Device::Cpu));
        let mut loader = DataLoader::new(data, 4, false, false, 1);

        let mut previous = LossHistory::new();
        previous.record_discriminator(1.3);

        let mut trainer = Trainer::resume(test_config(results.path(), 1), previous, 5);
        let history = trainer.train(&mut gan, &mut loader).unwrap();

        assert_eq!(history.discriminator.len(), 2);
        assert!(results.path().join("loss_5.png").exists());
        assert!(results.path().join("test_5.png").exists());
    }

    #[test]
    fn test_checkpoint_written_when_enabled() {
        let results = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let mut gan = tiny_gan();
        let data = Tensor::rand([4, 1, 6, 6], (Kind::Float, Device::Cpu));
        let mut loader = DataLoader::new(data, 2, false, false, 1);

        let mut config = test_config(results.path(), 2);
        config.checkpoint_every = 2;
        config.checkpoint_dir = checkpoints.path().to_string_lossy().to_string();

        Trainer::new(config).train(&mut gan, &mut loader).unwrap();

        assert!(checkpoints.path().join("checkpoint_epoch_0002").join("generator.pt").exists());
        assert!(!checkpoints.path().join("checkpoint_epoch_0001").exists());
    }
}
