//! GAN for MNIST handwritten digits
//!
//! Main entry point providing CLI interface for:
//! - Downloading MNIST
//! - Training the GAN
//! - Generating samples from a checkpoint

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use mnist_gan::{
    data::{ensure_mnist, raw_dir, DataLoader, MnistDataset},
    imaging::save_sample_grid,
    model::Gan,
    training::{Trainer, TrainingConfig},
    utils::{find_latest_checkpoint, load_checkpoint, load_checkpoint_meta, Config},
};

/// GAN trained on MNIST handwritten digits
#[derive(Parser)]
#[command(name = "mnist_gan")]
#[command(version = "0.1.0")]
#[command(about = "Train a fully connected GAN on MNIST digits")]
struct Cli {
    /// Path to configuration file (JSON or TOML)
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the GAN, writing a loss plot and a sample per epoch
    Train {
        /// Number of epochs (overrides the config file)
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Resume from a checkpoint directory, or "latest"
        #[arg(long)]
        resume: Option<String>,
    },

    /// Download MNIST into the data directory
    Download,

    /// Generate a grid of samples from a checkpoint
    Generate {
        /// Checkpoint directory, or "latest"
        #[arg(long, default_value = "latest")]
        checkpoint: String,

        /// Number of samples to generate
        #[arg(short, long, default_value = "64", value_parser = clap::value_parser!(i64).range(1..))]
        num_samples: i64,

        /// Images per row
        #[arg(long, default_value = "8", value_parser = clap::value_parser!(u32).range(1..))]
        columns: u32,

        /// Output PNG path
        #[arg(short, long, default_value = "samples.png")]
        output: String,
    },

    /// Initialize default configuration file
    Init {
        /// Output configuration file path
        #[arg(short, long, default_value = "config.json")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Train { epochs, resume } => {
            train_model(&cli.config, epochs, resume).await?;
        }
        Commands::Download => {
            let config = Config::load_or_default(&cli.config)?;
            let dir = ensure_mnist(Path::new(&config.data.data_dir)).await?;
            info!("MNIST available in {}", dir.display());
        }
        Commands::Generate {
            checkpoint,
            num_samples,
            columns,
            output,
        } => {
            generate_samples(&cli.config, &checkpoint, num_samples, columns, &output)?;
        }
        Commands::Init { output } => {
            init_config(&output)?;
        }
    }

    Ok(())
}

/// Resolve "latest" to the newest checkpoint under the configured directory
fn resolve_checkpoint(config: &Config, checkpoint: &str) -> Result<String> {
    if checkpoint == "latest" {
        find_latest_checkpoint(&config.training.checkpoint_dir)
            .with_context(|| format!("No checkpoints found in {}", config.training.checkpoint_dir))
    } else {
        Ok(checkpoint.to_string())
    }
}

/// Train the GAN
async fn train_model(config_path: &str, epochs: Option<usize>, resume: Option<String>) -> Result<()> {
    let mut config = Config::load_or_default(config_path)?;
    if let Some(epochs) = epochs {
        config.training.epochs = epochs;
    }
    config.validate()?;

    tch::manual_seed(config.training.seed as i64);

    let device = config.device();
    info!("Using device: {:?}", device);

    // Load data
    let data_dir = Path::new(&config.data.data_dir);
    let raw = if config.data.download {
        ensure_mnist(data_dir).await?
    } else {
        raw_dir(data_dir)
    };

    info!("Loading MNIST from {}", raw.display());
    let dataset = MnistDataset::load(&raw, true)?;
    info!("Loaded {} training images", dataset.len());

    if dataset.image_side() != config.model.image_side {
        anyhow::bail!(
            "Dataset images are {}x{}, config expects {}x{}",
            dataset.image_side(),
            dataset.image_side(),
            config.model.image_side,
            config.model.image_side
        );
    }

    let mut data_loader = DataLoader::new(
        dataset.images,
        config.data.batch_size,
        config.data.shuffle,
        config.data.drop_last,
        config.training.seed,
    );

    info!(
        "DataLoader: {} batches of size {}",
        data_loader.num_batches(),
        config.data.batch_size
    );

    // Create model
    let mut gan = Gan::with_image_side(
        config.model.latent_dim,
        config.model.image_side,
        config.model.dropout,
        device,
    );

    info!(
        "Created GAN: latent_dim={}, image={}x{}, dropout={}",
        config.model.latent_dim, config.model.image_side, config.model.image_side, config.model.dropout
    );

    let training_config = TrainingConfig::from(&config);

    let mut trainer = match resume {
        Some(checkpoint) => {
            let checkpoint = resolve_checkpoint(&config, &checkpoint)?;
            let (epoch, history) = load_checkpoint(&mut gan, &checkpoint)?;
            info!("Resumed from epoch {}", epoch);
            Trainer::resume(training_config, history, epoch)
        }
        None => Trainer::new(training_config),
    };

    info!("  Generator LR: {}", config.training.gen_lr);
    info!("  Discriminator LR: {}", config.training.disc_lr);

    let history = trainer.train(&mut gan, &mut data_loader)?;

    info!(
        "Training complete. Final G_loss: {:.4}, D_loss: {:.4}",
        history.latest_generator().unwrap_or(0.0),
        history.latest_discriminator().unwrap_or(0.0)
    );

    Ok(())
}

/// Generate a grid of samples from a checkpoint
fn generate_samples(
    config_path: &str,
    checkpoint: &str,
    num_samples: i64,
    columns: u32,
    output_path: &str,
) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let checkpoint = resolve_checkpoint(&config, checkpoint)?;
    let meta = load_checkpoint_meta(&checkpoint)?;

    tch::manual_seed(config.training.seed as i64);

    let mut gan = Gan::with_image_side(meta.latent_dim, meta.image_side, config.model.dropout, config.device());
    gan.load_generator(&format!("{}/generator.pt", checkpoint))?;

    info!("Loaded generator from {} (epoch {})", checkpoint, meta.epoch);
    info!("Generating {} samples", num_samples);

    let samples = tch::no_grad(|| gan.generate(num_samples));
    save_sample_grid(output_path, &samples, columns, config.training.sample_scale)?;

    info!("Saved samples to {}", output_path);
    Ok(())
}

/// Initialize default configuration file
fn init_config(output_path: &str) -> Result<()> {
    Config::default().save(output_path)?;

    info!("Created default configuration at {}", output_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::try_parse_from(["mnist_gan", "generate"]).unwrap();
        match cli.command {
            Commands::Generate {
                num_samples, columns, ..
            } => {
                assert_eq!(num_samples, 64);
                assert_eq!(columns, 8);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_generate_rejects_non_positive_counts() {
        assert!(Cli::try_parse_from(["mnist_gan", "generate", "--num-samples", "0"]).is_err());
        assert!(Cli::try_parse_from(["mnist_gan", "generate", "--num-samples", "-3"]).is_err());
        assert!(Cli::try_parse_from(["mnist_gan", "generate", "--columns", "0"]).is_err());
        assert!(Cli::try_parse_from(["mnist_gan", "generate", "-n", "16"]).is_ok());
    }
}
