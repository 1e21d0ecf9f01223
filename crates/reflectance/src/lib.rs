//! Reflectance Computation Engine
//!
//! Converts a single-band Landsat-7 digital-number raster into a
//! top-of-atmosphere ground reflectance raster.
//!
//! # Architecture
//!
//! ```text
//! CalibrationParameters
//!      │
//!      ▼
//! RadiometricModel::from_parameters   (rejects non-positive irradiance)
//!      │
//!      ├─► read_band(input)            band 1 → Grid, file closed on return
//!      │
//!      ├─► RadiometricModel::apply     per-pixel, parallel, clamped to [0, 1]
//!      │
//!      └─► write_band(output)          32-bit float GeoTIFF, georeference kept
//! ```
//!
//! # Example
//!
//! ```ignore
//! use reflectance::compute_reflectance;
//!
//! let report = compute_reflectance(&input, &output, &run.parameters)?;
//! println!("{} x {}", report.rows, report.cols);
//! ```

pub mod engine;
pub mod geotiff;
pub mod histogram;

pub use engine::{compute_reflectance, reflectance_grid, RadiometricModel, ReflectanceReport};
pub use geotiff::{read_band, write_band};
pub use histogram::{BandSummary, Histogram};
