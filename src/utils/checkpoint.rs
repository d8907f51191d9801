//! Checkpoint save/load utilities
//!
//! Provides functions for saving and loading model checkpoints
//! along with the loss history.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::model::Gan;
use crate::training::LossHistory;

const CHECKPOINT_PREFIX: &str = "checkpoint_epoch_";

/// Checkpoint metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckpointMeta {
    /// Epochs completed
    pub epoch: usize,
    /// Latest generator loss at checkpoint
    pub gen_loss: Option<f64>,
    /// Latest discriminator loss at checkpoint
    pub disc_loss: Option<f64>,
    /// Timestamp of checkpoint
    pub timestamp: String,
    /// Latent dimension the weights were trained with
    pub latent_dim: i64,
    /// Image side the weights were trained with
    pub image_side: i64,
}

/// Save a complete checkpoint (model + metadata + loss history)
///
/// # Arguments
///
/// * `gan` - Model to save
/// * `history` - Loss history so far
/// * `epoch` - Number of completed epochs
/// * `dir` - Directory to save checkpoint
///
/// # Returns
///
/// Path to saved checkpoint
pub fn save_checkpoint(
    gan: &Gan,
    history: &LossHistory,
    epoch: usize,
    dir: &str,
) -> anyhow::Result<String> {
    let checkpoint_dir = format!("{}/{}{:04}", dir, CHECKPOINT_PREFIX, epoch);
    std::fs::create_dir_all(&checkpoint_dir)?;

    // Save model weights
    let gen_path = format!("{}/generator.pt", checkpoint_dir);
    let disc_path = format!("{}/discriminator.pt", checkpoint_dir);
    gan.save(&gen_path, &disc_path)?;

    // Save metadata
    let meta = CheckpointMeta {
        epoch,
        gen_loss: history.latest_generator(),
        disc_loss: history.latest_discriminator(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        latent_dim: gan.latent_dim(),
        image_side: gan.image_side(),
    };

    let meta_path = format!("{}/meta.json", checkpoint_dir);
    std::fs::write(&meta_path, serde_json::to_string_pretty(&meta)?)?;

    // Save losses
    let losses_path = format!("{}/losses.csv", checkpoint_dir);
    history.save_csv(&losses_path)?;

    tracing::info!("Saved checkpoint to {}", checkpoint_dir);
    Ok(checkpoint_dir)
}

/// Load checkpoint metadata
pub fn load_checkpoint_meta(checkpoint_dir: &str) -> anyhow::Result<CheckpointMeta> {
    let meta_path = format!("{}/meta.json", checkpoint_dir);
    let content = std::fs::read_to_string(&meta_path)?;
    let meta: CheckpointMeta = serde_json::from_str(&content)?;
    Ok(meta)
}

/// Load a complete checkpoint
///
/// # Arguments
///
/// * `gan` - Model to load weights into
/// * `checkpoint_dir` - Directory containing checkpoint
///
/// # Returns
///
/// Tuple of (epoch, loss history)
pub fn load_checkpoint(gan: &mut Gan, checkpoint_dir: &str) -> anyhow::Result<(usize, LossHistory)> {
    let meta = load_checkpoint_meta(checkpoint_dir)?;
    if meta.latent_dim != gan.latent_dim() || meta.image_side != gan.image_side() {
        anyhow::bail!(
            "Checkpoint {} was trained with latent_dim={} image_side={}, model has latent_dim={} image_side={}",
            checkpoint_dir,
            meta.latent_dim,
            meta.image_side,
            gan.latent_dim(),
            gan.image_side()
        );
    }

    let gen_path = format!("{}/generator.pt", checkpoint_dir);
    let disc_path = format!("{}/discriminator.pt", checkpoint_dir);
    gan.load(&gen_path, &disc_path)?;

    let losses_path = format!("{}/losses.csv", checkpoint_dir);
    let history = if Path::new(&losses_path).exists() {
        LossHistory::load_csv(&losses_path)?
    } else {
        LossHistory::new()
    };

    tracing::info!("Loaded checkpoint from {} (epoch {})", checkpoint_dir, meta.epoch);
    Ok((meta.epoch, history))
}

/// Epoch encoded in a checkpoint directory name
fn checkpoint_epoch(name: &str) -> Option<usize> {
    name.strip_prefix(CHECKPOINT_PREFIX)?.parse().ok()
}

/// Find the checkpoint with the highest epoch in a directory
pub fn find_latest_checkpoint(dir: &str) -> Option<String> {
    let path = Path::new(dir);
    if !path.exists() {
        return None;
    }

    std::fs::read_dir(path)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().ok().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|e| {
            let epoch = checkpoint_epoch(e.file_name().to_str()?)?;
            Some((epoch, e.path()))
        })
        .max_by_key(|(epoch, _)| *epoch)
        .map(|(_, p)| p.to_string_lossy().to_string())
}
