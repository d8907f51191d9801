//! Model module containing GAN architecture components
//!
//! This module provides:
//! - Generator network for creating synthetic digit images
//! - Discriminator network for distinguishing real from fake
//! - Gan wrapper combining both networks

mod discriminator;
mod gan;
mod generator;

pub use discriminator::{Discriminator, DiscriminatorConfig};
pub use gan::Gan;
pub use generator::{Generator, GeneratorConfig};
