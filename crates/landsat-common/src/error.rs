//! Error types for the reflectance preprocessor.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using PreprocessError.
pub type PreprocessResult<T> = Result<T, PreprocessError>;

/// Primary error type for preprocessing runs.
///
/// Every variant is terminal for the current invocation.
#[derive(Debug, Error)]
pub enum PreprocessError {
    // === Configuration Errors ===
    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    #[error("Failed to read configuration: {0}")]
    ConfigRead(String),

    // === Input Errors ===
    #[error("Input satellite image not found: {}", .0.display())]
    MissingInput(PathBuf),

    // === Database Errors ===
    #[error("Database error: {0}")]
    Database(String),

    // === Raster Errors ===
    #[error("Failed to read raster: {0}")]
    RasterRead(String),

    #[error("Failed to write raster: {0}")]
    RasterWrite(String),

    // === Numeric Errors ===
    #[error("Incoming solar irradiance is {0}; reflectance requires a strictly positive value")]
    DegenerateIrradiance(f64),
}

impl PreprocessError {
    /// Create an InvalidConfig error for a named field.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a RasterRead error.
    pub fn raster_read(msg: impl Into<String>) -> Self {
        Self::RasterRead(msg.into())
    }

    /// Create a RasterWrite error.
    pub fn raster_write(msg: impl Into<String>) -> Self {
        Self::RasterWrite(msg.into())
    }

    /// Whether this error came from configuration loading or validation.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PreprocessError::InvalidConfig { .. } | PreprocessError::ConfigRead(_)
        )
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PreprocessError::InvalidConfig { .. } | PreprocessError::ConfigRead(_) => 2,
            PreprocessError::MissingInput(_) => 3,
            PreprocessError::Database(_) => 4,
            PreprocessError::RasterRead(_) => 5,
            PreprocessError::RasterWrite(_) => 6,
            PreprocessError::DegenerateIrradiance(_) => 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_message_names_field() {
        let err = PreprocessError::invalid_config("channel", "set as 8, needs to be in [1, 7]");
        let msg = err.to_string();
        assert!(msg.contains("'channel'"));
        assert!(msg.contains("8"));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_exit_codes_are_distinct_and_nonzero() {
        let errors = [
            PreprocessError::invalid_config("gain", "bad"),
            PreprocessError::MissingInput(PathBuf::from("/nope.tif")),
            PreprocessError::Database("down".into()),
            PreprocessError::raster_read("corrupt"),
            PreprocessError::raster_write("denied"),
            PreprocessError::DegenerateIrradiance(0.0),
        ];

        let mut codes: Vec<i32> = errors.iter().map(|e| e.exit_code()).collect();
        assert!(codes.iter().all(|&c| c != 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_missing_input_displays_path() {
        let err = PreprocessError::MissingInput(PathBuf::from("/data/Data/band4.tif"));
        assert!(err.to_string().contains("/data/Data/band4.tif"));
        assert!(!err.is_config_error());
    }
}
