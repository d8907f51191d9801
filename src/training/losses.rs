//! Loss functions for GAN training
//!
//! Binary cross entropy on discriminator probabilities (sigmoid already applied).

use tch::{Reduction, Tensor};

fn bce(probs: &Tensor, targets: &Tensor) -> Tensor {
    probs.binary_cross_entropy::<Tensor>(targets, None, Reduction::Mean)
}

/// Generator loss: -log(D(G(z)))
///
/// The generator wants the discriminator to output 1 (real) for fake samples.
///
/// # Arguments
///
/// * `fake_probs` - Discriminator probabilities on generated samples
///
/// # Returns
///
/// Scalar loss tensor
pub fn generator_loss(fake_probs: &Tensor) -> Tensor {
    bce(fake_probs, &Tensor::ones_like(fake_probs))
}

/// Discriminator loss: -log(D(x)) - log(1 - D(G(z)))
///
/// The discriminator wants to output 1 for real samples and 0 for fake samples.
///
/// # Arguments
///
/// * `real_probs` - Discriminator probabilities on real samples
/// * `fake_probs` - Discriminator probabilities on generated samples
///
/// # Returns
///
/// Scalar loss tensor
pub fn discriminator_loss(real_probs: &Tensor, fake_probs: &Tensor) -> Tensor {
    let real_loss = bce(real_probs, &Tensor::ones_like(real_probs));
    let fake_loss = bce(fake_probs, &Tensor::zeros_like(fake_probs));

    real_loss + fake_loss
}
