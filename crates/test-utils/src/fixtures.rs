//! Common test fixtures for preprocessor tests.
//!
//! Values approximate a Landsat-7 ETM+ band 4 (near infrared) scene.

use std::path::Path;

/// Calibration constants for band 4 used throughout the tests.
pub mod band4 {
    pub const GAIN: f64 = 0.6398;
    pub const OFFSET: f64 = -5.1;
    pub const PATH_RADIANCE: f64 = 2.5;
    pub const ATMOSPHERE_TRANSITIVITY: f64 = 0.85;
    pub const SOLAR_RADIANCE: f64 = 1044.0;
    pub const ZENITH_ANGLE: f64 = 37.5;
    pub const CHANNEL: i64 = 4;
    pub const CELL_SIZE: i64 = 30;
}

/// Raw configuration values, written verbatim into YAML.
///
/// Fields are strings so tests can inject malformed values.
#[derive(Debug, Clone)]
pub struct ConfigFixture {
    pub save_locally_flag: String,
    pub gain: String,
    pub offset: String,
    pub path_radiance: String,
    pub atmosphere_transitivity: String,
    pub solar_radiance: String,
    pub zenith_angle: String,
    pub channel: String,
    pub cell_size: String,
    /// Extra lines appended verbatim (e.g. a `postgres_db` section).
    pub extra: String,
}

impl Default for ConfigFixture {
    fn default() -> Self {
        Self {
            save_locally_flag: "True".to_string(),
            gain: band4::GAIN.to_string(),
            offset: band4::OFFSET.to_string(),
            path_radiance: band4::PATH_RADIANCE.to_string(),
            atmosphere_transitivity: band4::ATMOSPHERE_TRANSITIVITY.to_string(),
            solar_radiance: band4::SOLAR_RADIANCE.to_string(),
            zenith_angle: band4::ZENITH_ANGLE.to_string(),
            channel: band4::CHANNEL.to_string(),
            cell_size: band4::CELL_SIZE.to_string(),
            extra: String::new(),
        }
    }
}

impl ConfigFixture {
    /// Render as a config.yaml rooted at `parent_dir`.
    pub fn to_yaml(&self, parent_dir: &Path) -> String {
        format!(
            "save_files:\n  \
               save_locally_flag: {}\n  \
               parent_dir: \"{}\"\n\
             satellite_parameters:\n  \
               gain: {}\n  \
               offset: {}\n  \
               path_radiance: {}\n  \
               atmosphere_transitivity: {}\n  \
               solar_radiance: {}\n  \
               zenith_angle: {}\n  \
               channel: {}\n  \
               cell_size: {}\n\
             {}",
            self.save_locally_flag,
            parent_dir.display(),
            self.gain,
            self.offset,
            self.path_radiance,
            self.atmosphere_transitivity,
            self.solar_radiance,
            self.zenith_angle,
            self.channel,
            self.cell_size,
            self.extra,
        )
    }
}

/// A `postgres_db` section pointing at a local development database.
pub const LOCAL_POSTGRES_SECTION: &str = "postgres_db:
  host: ${POSTGRES_HOST:-localhost}
  port: ${POSTGRES_PORT:-5432}
  db_name: ${POSTGRES_DB:-landsat}
  user: ${POSTGRES_USER:-postgres}
  password: ${POSTGRES_PASSWORD:-postgres}
";
