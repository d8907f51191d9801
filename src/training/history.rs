//! Loss bookkeeping for GAN training
//!
//! One discriminator loss is recorded per discriminator update and one
//! generator loss per generator update, so the two series grow at
//! different rates.

/// Per-update loss sequences
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossHistory {
    /// Generator losses, one per generator update
    pub generator: Vec<f64>,
    /// Discriminator losses, one per discriminator update
    pub discriminator: Vec<f64>,
}

impl LossHistory {
    /// Create new empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a discriminator update
    pub fn record_discriminator(&mut self, loss: f64) {
        self.discriminator.push(loss);
    }

    /// Record a generator update
    pub fn record_generator(&mut self, loss: f64) {
        self.generator.push(loss);
    }

    /// Latest generator loss
    pub fn latest_generator(&self) -> Option<f64> {
        self.generator.last().copied()
    }

    /// Latest discriminator loss
    pub fn latest_discriminator(&self) -> Option<f64> {
        self.discriminator.last().copied()
    }

    /// Mean of the generator losses recorded from index `since` on
    pub fn generator_mean_since(&self, since: usize) -> Option<f64> {
        mean(self.generator.get(since..)?)
    }

    /// Mean of the discriminator losses recorded from index `since` on
    pub fn discriminator_mean_since(&self, since: usize) -> Option<f64> {
        mean(self.discriminator.get(since..)?)
    }

    /// Moving average of the last `window` generator losses
    pub fn generator_ma(&self, window: usize) -> f64 {
        moving_average(&self.generator, window)
    }

    /// Moving average of the last `window` discriminator losses
    pub fn discriminator_ma(&self, window: usize) -> f64 {
        moving_average(&self.discriminator, window)
    }

    /// Check if training appears to have collapsed
    ///
    /// Indicators: discriminator loss very low while generator loss is very high.
    pub fn check_mode_collapse(&self, window: usize) -> bool {
        if self.generator.len() < window || self.discriminator.len() < window {
            return false;
        }

        self.discriminator_ma(window) < 0.1 && self.generator_ma(window) > 5.0
    }

    /// Both series contain only finite, non-negative values
    pub fn is_non_negative(&self) -> bool {
        self.generator
            .iter()
            .chain(self.discriminator.iter())
            .all(|v| v.is_finite() && *v >= 0.0)
    }

    /// Save history to a CSV file with columns `series,step,loss`
    pub fn save_csv(&self, path: &str) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record(["series", "step", "loss"])?;

        let series = [("generator", &self.generator), ("discriminator", &self.discriminator)];
        for (name, values) in series {
            for (step, loss) in values.iter().enumerate() {
                writer.write_record([name.to_string(), step.to_string(), loss.to_string()])?;
            }
        }

        writer.flush()?;
        Ok(())
    }

    /// Load history from a CSV file written by [`LossHistory::save_csv`]
    pub fn load_csv(path: &str) -> anyhow::Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut history = Self::new();

        for result in reader.records() {
            let record = result?;
            let loss: f64 = record[2].parse()?;
            match &record[0] {
                "generator" => history.generator.push(loss),
                "discriminator" => history.discriminator.push(loss),
                other => anyhow::bail!("Unknown loss series: {}", other),
            }
        }

        Ok(history)
    }
}

/// Exponential moving average tracker
#[derive(Debug)]
pub struct EmaTracker {
    value: f64,
    alpha: f64,
    initialized: bool,
}

impl EmaTracker {
    /// Create new EMA tracker
    ///
    /// # Arguments
    ///
    /// * `alpha` - Smoothing factor (0 < alpha <= 1). Higher = more weight on recent
    pub fn new(alpha: f64) -> Self {
        Self {
            value: 0.0,
            alpha: alpha.clamp(0.001, 1.0),
            initialized: false,
        }
    }

    /// Update with new value
    pub fn update(&mut self, new_value: f64) {
        if !self.initialized {
            self.value = new_value;
            self.initialized = true;
        } else {
            self.value = self.alpha * new_value + (1.0 - self.alpha) * self.value;
        }
    }

    /// Get current EMA value
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Every `stride`-th value starting from the first
pub fn strided(values: &[f64], stride: usize) -> Vec<f64> {
    values.iter().step_by(stride.max(1)).copied().collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Calculate moving average of last `window` values
fn moving_average(values: &[f64], window: usize) -> f64 {
    if values.is_empty() || window == 0 {
        return 0.0;
    }

    let n = window.min(values.len());
    let sum: f64 = values.iter().rev().take(n).sum();
    sum / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loss_history() {
        let mut history = LossHistory::new();

        history.record_discriminator(1.4);
        history.record_discriminator(1.2);
        history.record_generator(0.7);

        assert_eq!(history.discriminator.len(), 2);
        assert_eq!(history.generator.len(), 1);
        assert_eq!(history.latest_discriminator(), Some(1.2));
        assert_eq!(history.latest_generator(), Some(0.7));
        assert!(history.is_non_negative());
    }

    #[test]
    fn test_mean_since() {
        let mut history = LossHistory::new();
        for v in [1.0, 2.0, 3.0, 5.0] {
            history.record_discriminator(v);
        }

        assert_eq!(history.discriminator_mean_since(2), Some(4.0));
        assert_eq!(history.discriminator_mean_since(4), None);
        assert_eq!(history.generator_mean_since(0), None);
    }

    #[test]
    fn test_negative_loss_detected() {
        let mut history = LossHistory::new();
        history.record_generator(-0.1);
        assert!(!history.is_non_negative());
    }

    #[test]
    fn test_mode_collapse() {
        let mut history = LossHistory::new();
        for _ in 0..10 {
            history.record_discriminator(0.01);
            history.record_generator(8.0);
        }

        assert!(history.check_mode_collapse(10));
        assert!(!history.check_mode_collapse(11));
    }

    #[test]
    fn test_strided() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(strided(&values, 2), vec![0.0, 2.0, 4.0]);
        assert_eq!(strided(&values, 0), values.to_vec());
    }

    #[test]
    fn test_ema_tracker() {
        let mut ema = EmaTracker::new(0.5);

        ema.update(10.0);
        assert_eq!(ema.value(), 10.0);

        ema.update(20.0);
        assert_eq!(ema.value(), 15.0); // 0.5 * 20 + 0.5 * 10
    }

    #[test]
    fn test_csv_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("losses.csv");
        let path = path.to_str().unwrap();

        let mut history = LossHistory::new();
        history.record_discriminator(1.25);
        history.record_discriminator(1.5);
        history.record_generator(0.75);

        history.save_csv(path).unwrap();
        assert_eq!(LossHistory::load_csv(path).unwrap(), history);
    }
}
