//! In-memory single-band raster grids.

use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::{PreprocessError, PreprocessResult};

/// GeoTIFF georeferencing carried alongside a grid.
///
/// Stored as the raw tag payloads so they can be written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoReference {
    /// ModelPixelScaleTag: [ScaleX, ScaleY, ScaleZ]
    pub pixel_scale: Vec<f64>,
    /// ModelTiepointTag: [I, J, K, X, Y, Z]
    pub tie_point: Vec<f64>,
    /// GeoKeyDirectoryTag, if the source carried one
    pub geo_key_directory: Option<Vec<u16>>,
    /// GeoDoubleParamsTag, if the source carried one
    pub geo_double_params: Option<Vec<f64>>,
}

impl GeoReference {
    /// Ground size of one pixel as (x, y), if the scale tag is complete.
    pub fn pixel_size(&self) -> Option<(f64, f64)> {
        match self.pixel_scale.as_slice() {
            [x, y, ..] => Some((*x, *y)),
            _ => None,
        }
    }

    /// Model-space coordinate of the upper-left corner of pixel (0, 0).
    pub fn origin(&self) -> Option<(f64, f64)> {
        let (sx, sy) = self.pixel_size()?;
        match self.tie_point.as_slice() {
            [i, j, _, x, y, ..] => Some((x - i * sx, y + j * sy)),
            _ => None,
        }
    }
}

/// A 2-D grid of samples in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
    georef: Option<GeoReference>,
}

impl Grid {
    /// Create a grid from row-major data.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> PreprocessResult<Self> {
        if data.len() != rows * cols {
            return Err(PreprocessError::raster_read(format!(
                "grid of {} rows by {} columns needs {} samples, got {}",
                rows,
                cols,
                rows * cols,
                data.len()
            )));
        }

        Ok(Self {
            rows,
            cols,
            data,
            georef: None,
        })
    }

    /// Create a grid by widening any primitive numeric samples to f64.
    ///
    /// Samples that cannot be represented become NaN.
    pub fn from_samples<T: ToPrimitive>(
        rows: usize,
        cols: usize,
        samples: &[T],
    ) -> PreprocessResult<Self> {
        let data = samples
            .iter()
            .map(|v| v.to_f64().unwrap_or(f64::NAN))
            .collect();
        Self::new(rows, cols, data)
    }

    /// Create a grid from nested rows. All rows must have the same length.
    pub fn from_rows<T: ToPrimitive + Copy>(rows: &[Vec<T>]) -> PreprocessResult<Self> {
        let cols = rows.first().map_or(0, |r| r.len());
        if rows.iter().any(|r| r.len() != cols) {
            return Err(PreprocessError::raster_read("ragged rows in grid"));
        }
        let flat: Vec<T> = rows.iter().flatten().copied().collect();
        Self::from_samples(rows.len(), cols, &flat)
    }

    /// Attach georeferencing.
    pub fn with_georeference(mut self, georef: Option<GeoReference>) -> Self {
        self.georef = georef;
        self
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn georeference(&self) -> Option<&GeoReference> {
        self.georef.as_ref()
    }

    /// Value at (row, col), or None when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.data[row * self.cols + col])
    }
}
