//! Common types shared across the reflectance preprocessor workspace.

pub mod database;
pub mod error;
pub mod grid;

pub use database::DatabaseConfig;
pub use error::{PreprocessError, PreprocessResult};
pub use grid::{GeoReference, Grid};
