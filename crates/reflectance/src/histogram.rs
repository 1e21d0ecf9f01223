//! Band statistics and histograms, logged in place of plotting.

use serde::Serialize;
use tracing::info;

use landsat_common::Grid;

/// Equal-width histogram over `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<u64>,
}

impl Histogram {
    /// Bin the finite values in `values` over `[min, max]`.
    ///
    /// Values outside the range are ignored. When `min == max` every
    /// in-range value lands in the first bin.
    pub fn compute(values: &[f64], bins: usize, min: f64, max: f64) -> Self {
        let bins = bins.max(1);
        let mut counts = vec![0u64; bins];
        let width = (max - min) / bins as f64;

        for &v in values {
            if !v.is_finite() || v < min || v > max {
                continue;
            }
            let idx = if width > 0.0 {
                (((v - min) / width) as usize).min(bins - 1)
            } else {
                0
            };
            counts[idx] += 1;
        }

        Self { min, max, counts }
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.counts.len() as f64
    }

    /// Total number of binned values.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// One text line per bin: lower edge, count and a bar scaled to `width`.
    pub fn render(&self, width: usize) -> Vec<String> {
        let peak = self.counts.iter().copied().max().unwrap_or(0).max(1);
        let bin_width = self.bin_width();

        self.counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                let bar_len = (count as f64 / peak as f64 * width as f64).round() as usize;
                format!(
                    "{:>12.4} | {:<width$} {}",
                    self.min + i as f64 * bin_width,
                    "#".repeat(bar_len),
                    count,
                    width = width
                )
            })
            .collect()
    }
}

/// Summary statistics of one band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandSummary {
    pub rows: usize,
    pub cols: usize,
    /// Number of finite cells.
    pub valid_count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub histogram: Histogram,
}

impl BandSummary {
    /// Summarize a grid. Returns None when it holds no finite values.
    pub fn of(grid: &Grid, bins: usize) -> Option<Self> {
        let finite = || grid.data().iter().copied().filter(|v| v.is_finite());

        let valid_count = finite().count();
        if valid_count == 0 {
            return None;
        }

        let (min, max) = finite().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        let mean = finite().sum::<f64>() / valid_count as f64;
        let variance = finite().map(|v| (v - mean).powi(2)).sum::<f64>() / valid_count as f64;

        Some(Self {
            rows: grid.rows(),
            cols: grid.cols(),
            valid_count,
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
            histogram: Histogram::compute(grid.data(), bins, min, max),
        })
    }

    /// Log the statistics and the rendered histogram under `title`.
    pub fn log(&self, title: &str) {
        info!(
            title,
            rows = self.rows,
            cols = self.cols,
            valid = self.valid_count,
            min = self.min,
            max = self.max,
            mean = self.mean,
            std_dev = self.std_dev,
            "Band summary"
        );
        for line in self.histogram.render(40) {
            info!(title, "{}", line);
        }
    }
}
