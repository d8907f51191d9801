//! A fixed seed reproduces a training run on CPU
//!
//! Lives in its own test binary: libtorch's generator is process-global, so
//! parallel unit tests drawing random numbers would interleave with it.

use mnist_gan::{DataLoader, Gan, LossHistory, Trainer, TrainingConfig};
use tch::{Device, Kind, Tensor};

fn train_once(seed: u64) -> LossHistory {
    tch::manual_seed(seed as i64);

    let results = tempfile::tempdir().unwrap();
    let mut gan = Gan::with_image_side(8, 6, 0.3, Device::Cpu);
    let data = Tensor::rand([10, 1, 6, 6], (Kind::Float, Device::Cpu));
    let mut loader = DataLoader::new(data, 4, true, false, seed);

    let config = TrainingConfig {
        epochs: 1,
        gen_lr: 1e-3,
        disc_lr: 1e-3,
        results_dir: results.path().to_string_lossy().to_string(),
        progress: false,
        ..Default::default()
    };

    let mut trainer = Trainer::new(config);
    let history = trainer.train(&mut gan, &mut loader).unwrap().clone();
    history
}

#[test]
fn test_same_seed_same_losses() {
    let first = train_once(1);
    let second = train_once(1);

    assert_eq!(first.discriminator.len(), 3);
    assert_eq!(first.generator.len(), 1);
    assert_eq!(first, second);

    let other = train_once(2);
    assert_ne!(first, other);
}
