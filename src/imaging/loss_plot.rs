//! Loss curve renderer
//!
//! Plots one or more loss series against their step index on a shared
//! axis starting at zero.

use std::path::Path;

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};

use super::{colors, draw_horizontal_line, draw_line, draw_vertical_line};

/// Loss curve renderer
#[derive(Debug, Clone)]
pub struct LossPlot {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub background: Rgb<u8>,
    /// Number of horizontal grid lines above the x axis
    pub grid_lines: u32,
}

impl Default for LossPlot {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            margin: 40,
            background: colors::WHITE,
            grid_lines: 4,
        }
    }
}

impl LossPlot {
    /// Create a renderer with the given canvas size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Render series to an image
    ///
    /// Every series shares the x scale (longest series spans the plot width)
    /// and the y scale (zero to the largest finite value).
    pub fn render(&self, series: &[(&[f64], Rgb<u8>)]) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width, self.height, self.background);

        let left = self.margin.min(self.width.saturating_sub(1));
        let bottom = self.height.saturating_sub(self.margin + 1);
        let right = self.width.saturating_sub(self.margin / 2 + 1).max(left);
        let top = (self.margin / 2).min(bottom);

        let max_len = series.iter().map(|(v, _)| v.len()).max().unwrap_or(0);
        let max_val = series
            .iter()
            .flat_map(|(v, _)| v.iter())
            .copied()
            .filter(|v| v.is_finite())
            .fold(0.0f64, f64::max);
        let max_val = if max_val > 0.0 { max_val } else { 1.0 };

        // Grid
        for i in 1..=self.grid_lines {
            let y = bottom - (bottom - top) * i / self.grid_lines.max(1);
            draw_horizontal_line(&mut img, y, left, right, colors::LIGHT_GRAY);
        }

        // Axes
        draw_vertical_line(&mut img, left, top, bottom, colors::BLACK);
        draw_horizontal_line(&mut img, bottom, left, right, colors::BLACK);

        let span_x = (right - left) as f64;
        let span_y = (bottom - top) as f64;
        let to_point = |i: usize, v: f64| -> (i64, i64) {
            let fx = if max_len > 1 {
                i as f64 / (max_len - 1) as f64
            } else {
                0.0
            };
            let fy = (v.max(0.0) / max_val).min(1.0);
            (
                left as i64 + (fx * span_x).round() as i64,
                bottom as i64 - (fy * span_y).round() as i64,
            )
        };

        for (values, color) in series {
            let points: Vec<(i64, i64)> = values
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .map(|(i, &v)| to_point(i, v))
                .collect();

            match points.as_slice() {
                [] => {}
                [single] => draw_line(&mut img, *single, *single, *color),
                _ => {
                    for pair in points.windows(2) {
                        draw_line(&mut img, pair[0], pair[1], *color);
                    }
                }
            }
        }

        img
    }

    /// Render the generator (green) and discriminator (blue) curves and save as PNG
    pub fn save<P: AsRef<Path>>(&self, path: P, generator: &[f64], discriminator: &[f64]) -> Result<()> {
        let path = path.as_ref();
        let img = self.render(&[(generator, colors::GREEN), (discriminator, colors::BLUE)]);
        img.save(path)
            .with_context(|| format!("Failed to write loss plot {}", path.display()))?;
        Ok(())
    }
}
