//! Calibration parameter resolution.
//!
//! Turns the `save_files` and `satellite_parameters` configuration sections
//! into a validated, immutable [`CalibrationParameters`] bundle:
//!
//! ```text
//! config.yaml ──► load_settings ──► Settings
//!                                      │
//!                                      ▼
//!                 resolve: parse ─► validate ─► locate input ─► derive irradiance
//!                                      │
//!                                      ▼
//!                                 ResolvedRun { CalibrationParameters, .. }
//! ```

pub mod config;
pub mod params;

pub use config::{
    load_settings, SatelliteParameters, SaveFiles, Settings, DEFAULT_INPUT_IMAGE,
    DEFAULT_OUTPUT_IMAGE,
};
pub use params::{
    incoming_irradiance, resolve, CalibrationParameters, ResolvedRun, SatelliteValues,
    LANDSAT7_CELL_SIZE,
};
