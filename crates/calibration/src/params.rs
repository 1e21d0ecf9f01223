//! Validated calibration parameters and the derived incoming irradiance.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_yaml::Value;
use tracing::{debug, info};

use landsat_common::{PreprocessError, PreprocessResult};

use crate::config::{SatelliteParameters, Settings};

/// Ground sample distance of the Landsat-7 multispectral bands, in meters.
pub const LANDSAT7_CELL_SIZE: i64 = 30;

/// Decimal places kept when deriving incoming irradiance.
pub const IRRADIANCE_DECIMALS: i32 = 5;

/// Satellite parameters parsed from configuration but not yet validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatelliteValues {
    pub gain: f64,
    pub offset: f64,
    pub path_radiance: f64,
    pub atmosphere_transitivity: f64,
    pub solar_radiance: f64,
    pub zenith_angle: f64,
    pub channel: i64,
    pub cell_size: i64,
}

impl SatelliteValues {
    /// Parse every raw value, failing on the first field that is not numeric.
    pub fn parse(raw: &SatelliteParameters) -> PreprocessResult<Self> {
        Ok(Self {
            gain: parse_f64("gain", &raw.gain)?,
            offset: parse_f64("offset", &raw.offset)?,
            path_radiance: parse_f64("path_radiance", &raw.path_radiance)?,
            atmosphere_transitivity: parse_f64(
                "atmosphere_transitivity",
                &raw.atmosphere_transitivity,
            )?,
            solar_radiance: parse_f64("solar_radiance", &raw.solar_radiance)?,
            zenith_angle: parse_f64("zenith_angle", &raw.zenith_angle)?,
            channel: parse_i64("channel", &raw.channel)?,
            cell_size: parse_i64("cell_size", &raw.cell_size)?,
        })
    }

    /// Check value ranges, stopping at the first violation.
    pub fn validate(&self) -> PreprocessResult<()> {
        let t = self.atmosphere_transitivity;
        if !(t > 0.0 && t <= 1.0) {
            return Err(PreprocessError::invalid_config(
                "atmosphere_transitivity",
                format!("Atmosphere Transitivity is set as {} which needs to be in (0, 1]", t),
            ));
        }

        let z = self.zenith_angle;
        if !(0.0..=90.0).contains(&z) {
            return Err(PreprocessError::invalid_config(
                "zenith_angle",
                format!("Zenith Angle is set as {} which needs to be in [0, 90]", z),
            ));
        }

        if !(1..=7).contains(&self.channel) {
            return Err(PreprocessError::invalid_config(
                "channel",
                format!(
                    "Satellite Instrument (Channel) Number is set as {} which needs to be in [1, 7]",
                    self.channel
                ),
            ));
        }

        if self.cell_size != LANDSAT7_CELL_SIZE {
            return Err(PreprocessError::invalid_config(
                "cell_size",
                format!(
                    "Cell Size is set as {} which needs to be {} for Landsat 7",
                    self.cell_size, LANDSAT7_CELL_SIZE
                ),
            ));
        }

        for (field, value) in [
            ("gain", self.gain),
            ("offset", self.offset),
            ("path_radiance", self.path_radiance),
        ] {
            if !value.is_finite() {
                return Err(PreprocessError::invalid_config(
                    field,
                    format!("{} is set as {} which needs to be a finite number", field, value),
                ));
            }
        }

        if !(self.solar_radiance.is_finite() && self.solar_radiance > 0.0) {
            return Err(PreprocessError::invalid_config(
                "solar_radiance",
                format!(
                    "Solar Radiance is set as {} which needs to be a positive finite number",
                    self.solar_radiance
                ),
            ));
        }

        Ok(())
    }
}

/// Immutable calibration bundle consumed by the reflectance engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationParameters {
    satellite_image: PathBuf,
    channel: u8,
    cell_size: u32,
    gain: f64,
    offset: f64,
    path_radiance: f64,
    atmosphere_transitivity: f64,
    solar_radiance: f64,
    zenith_angle: f64,
    incoming_irradiance: f64,
}

impl CalibrationParameters {
    /// Validate `values` and derive the incoming irradiance.
    ///
    /// Does not check that `satellite_image` exists; [`resolve`] does.
    pub fn new(values: SatelliteValues, satellite_image: PathBuf) -> PreprocessResult<Self> {
        values.validate()?;
        Ok(Self::from_validated(values, satellite_image))
    }

    fn from_validated(values: SatelliteValues, satellite_image: PathBuf) -> Self {
        Self {
            satellite_image,
            // Both ranges were checked by validate().
            channel: values.channel as u8,
            cell_size: values.cell_size as u32,
            gain: values.gain,
            offset: values.offset,
            path_radiance: values.path_radiance,
            atmosphere_transitivity: values.atmosphere_transitivity,
            solar_radiance: values.solar_radiance,
            zenith_angle: values.zenith_angle,
            incoming_irradiance: incoming_irradiance(
                values.atmosphere_transitivity,
                values.solar_radiance,
                values.zenith_angle,
            ),
        }
    }

    pub fn satellite_image(&self) -> &Path {
        &self.satellite_image
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn path_radiance(&self) -> f64 {
        self.path_radiance
    }

    pub fn atmosphere_transitivity(&self) -> f64 {
        self.atmosphere_transitivity
    }

    pub fn solar_radiance(&self) -> f64 {
        self.solar_radiance
    }

    /// Solar zenith angle in degrees.
    pub fn zenith_angle(&self) -> f64 {
        self.zenith_angle
    }

    /// Solar irradiance reaching the surface, derived from transitivity,
    /// solar radiance and zenith angle.
    pub fn incoming_irradiance(&self) -> f64 {
        self.incoming_irradiance
    }
}

/// Everything resolved from [`Settings`] for one preprocessing run.
#[derive(Debug, Clone)]
pub struct ResolvedRun {
    pub parameters: CalibrationParameters,
    pub save_locally: bool,
    pub parent_dir: PathBuf,
    pub output_path: PathBuf,
}

/// Parse, validate and derive the calibration bundle from settings.
///
/// Order: `save_locally_flag`, numeric parsing, range validation, input file
/// existence, irradiance derivation. The first failure is returned.
pub fn resolve(settings: &Settings) -> PreprocessResult<ResolvedRun> {
    let save_locally = parse_bool("save_locally_flag", &settings.save_files.save_locally_flag)?;
    let values = SatelliteValues::parse(&settings.satellite_parameters)?;
    values.validate()?;

    let satellite_image = locate_input(&settings.input_path())?;
    let parameters = CalibrationParameters::from_validated(values, satellite_image);

    let run = ResolvedRun {
        parameters,
        save_locally,
        parent_dir: settings.save_files.parent_dir.clone(),
        output_path: settings.output_path(),
    };
    log_summary(&run);

    Ok(run)
}

/// `atmosphere_transitivity * solar_radiance * cos(zenith)`, rounded to
/// [`IRRADIANCE_DECIMALS`] places.
pub fn incoming_irradiance(
    atmosphere_transitivity: f64,
    solar_radiance: f64,
    zenith_angle_deg: f64,
) -> f64 {
    round_to(
        atmosphere_transitivity * solar_radiance * zenith_angle_deg.to_radians().cos(),
        IRRADIANCE_DECIMALS,
    )
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn locate_input(path: &Path) -> PreprocessResult<PathBuf> {
    if !path.is_file() {
        return Err(PreprocessError::MissingInput(path.to_path_buf()));
    }
    path.canonicalize()
        .map_err(|_| PreprocessError::MissingInput(path.to_path_buf()))
}

fn log_summary(run: &ResolvedRun) {
    let p = &run.parameters;
    info!(parent_dir = %run.parent_dir.display(), "Resolved working directory");
    info!(
        gain = p.gain,
        offset = p.offset,
        path_radiance = p.path_radiance,
        atmosphere_transitivity = p.atmosphere_transitivity,
        solar_radiance = p.solar_radiance,
        zenith_angle = p.zenith_angle,
        "Loaded satellite parameters"
    );
    info!(
        satellite_image = %p.satellite_image.display(),
        channel = p.channel,
        cell_size = p.cell_size,
        incoming_irradiance = p.incoming_irradiance,
        "Derived calibration parameters"
    );
    if let Ok(json) = serde_json::to_string(p) {
        debug!(parameters = %json, "Calibration bundle");
    }
    info!(save_locally = run.save_locally, "Save locally flag");
}

// ============================================================================
// Strict scalar parsing
// ============================================================================

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("{:?}", s),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "<unprintable>".to_string()),
    }
}

/// Accepts YAML booleans and the tokens true/false/1/0 in any case.
fn parse_bool(field: &str, value: &Value) -> PreprocessResult<bool> {
    let parsed = match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    };

    parsed.ok_or_else(|| {
        PreprocessError::invalid_config(
            field,
            format!("{} is set as {}. Only True or False is accepted", field, describe(value)),
        )
    })
}

fn parse_f64(field: &str, value: &Value) -> PreprocessResult<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| {
        PreprocessError::invalid_config(
            field,
            format!("{} is set as {} which is not a number", field, describe(value)),
        )
    })
}

fn parse_i64(field: &str, value: &Value) -> PreprocessResult<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| {
        PreprocessError::invalid_config(
            field,
            format!("{} is set as {} which is not an integer", field, describe(value)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_values() -> SatelliteValues {
        SatelliteValues {
            gain: 0.6437,
            offset: -1.52,
            path_radiance: 2.0,
            atmosphere_transitivity: 0.8,
            solar_radiance: 1047.0,
            zenith_angle: 30.0,
            channel: 4,
            cell_size: 30,
        }
    }

    fn field_of(err: PreprocessError) -> String {
        match err {
            PreprocessError::InvalidConfig { field, .. } => field,
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_incoming_irradiance_formula() {
        assert_eq!(incoming_irradiance(0.8, 1047.0, 30.0), 725.38288);
        assert_eq!(incoming_irradiance(0.85, 1044.0, 47.3), 601.79889);
        assert_eq!(incoming_irradiance(1.0, 1000.0, 0.0), 1000.0);
    }

    #[test]
    fn test_incoming_irradiance_zero_at_horizon() {
        assert_eq!(incoming_irradiance(1.0, 1000.0, 90.0), 0.0);
        assert!(incoming_irradiance(1.0, 1000.0, 89.9) > 0.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.234564, 5), 1.23456);
        assert_eq!(round_to(1.234566, 5), 1.23457);
        assert_eq!(round_to(-0.000004, 5), 0.0);
    }

    #[test]
    fn test_valid_values_build_parameters() {
        let params = CalibrationParameters::new(valid_values(), PathBuf::from("/x.tif")).unwrap();
        assert_eq!(params.channel(), 4);
        assert_eq!(params.cell_size(), 30);
        assert_eq!(params.incoming_irradiance(), 725.38288);
    }

    #[test]
    fn test_atmosphere_transitivity_bounds() {
        for bad in [0.0, 1.01, -0.5, f64::NAN] {
            let values = SatelliteValues {
                atmosphere_transitivity: bad,
                ..valid_values()
            };
            assert_eq!(field_of(values.validate().unwrap_err()), "atmosphere_transitivity");
        }
        for good in [1.0, 0.0001] {
            let values = SatelliteValues {
                atmosphere_transitivity: good,
                ..valid_values()
            };
            assert!(values.validate().is_ok(), "{} should pass", good);
        }
    }

    #[test]
    fn test_zenith_angle_bounds() {
        for bad in [-0.1, 90.1] {
            let values = SatelliteValues {
                zenith_angle: bad,
                ..valid_values()
            };
            assert_eq!(field_of(values.validate().unwrap_err()), "zenith_angle");
        }
        for good in [0.0, 90.0] {
            let values = SatelliteValues {
                zenith_angle: good,
                ..valid_values()
            };
            assert!(values.validate().is_ok(), "{} should pass", good);
        }
    }

    #[test]
    fn test_channel_bounds() {
        for bad in [0, 8] {
            let values = SatelliteValues {
                channel: bad,
                ..valid_values()
            };
            assert_eq!(field_of(values.validate().unwrap_err()), "channel");
        }
        for good in [1, 7] {
            let values = SatelliteValues {
                channel: good,
                ..valid_values()
            };
            assert!(values.validate().is_ok(), "{} should pass", good);
        }
    }

    #[test]
    fn test_cell_size_must_be_thirty() {
        let values = SatelliteValues {
            cell_size: 29,
            ..valid_values()
        };
        let err = values.validate().unwrap_err();
        assert!(err.to_string().contains("29"));
        assert_eq!(field_of(err), "cell_size");

        let values = SatelliteValues {
            cell_size: 30,
            ..valid_values()
        };
        assert!(values.validate().is_ok());
    }

    #[test]
    fn test_validation_short_circuits_in_order() {
        let values = SatelliteValues {
            atmosphere_transitivity: 2.0,
            zenith_angle: 100.0,
            channel: 9,
            cell_size: 15,
            ..valid_values()
        };
        assert_eq!(field_of(values.validate().unwrap_err()), "atmosphere_transitivity");

        let values = SatelliteValues {
            zenith_angle: 100.0,
            channel: 9,
            cell_size: 15,
            ..valid_values()
        };
        assert_eq!(field_of(values.validate().unwrap_err()), "zenith_angle");

        let values = SatelliteValues {
            channel: 9,
            cell_size: 15,
            ..valid_values()
        };
        assert_eq!(field_of(values.validate().unwrap_err()), "channel");
    }

    #[test]
    fn test_error_message_reports_actual_value() {
        let values = SatelliteValues {
            zenith_angle: 95.5,
            ..valid_values()
        };
        assert!(values.validate().unwrap_err().to_string().contains("95.5"));
    }

    #[test]
    fn test_non_finite_calibration_constants_rejected() {
        let values = SatelliteValues {
            gain: f64::INFINITY,
            ..valid_values()
        };
        assert_eq!(field_of(values.validate().unwrap_err()), "gain");

        let values = SatelliteValues {
            solar_radiance: 0.0,
            ..valid_values()
        };
        assert_eq!(field_of(values.validate().unwrap_err()), "solar_radiance");
    }

    #[test]
    fn test_parse_bool_tokens() {
        assert!(parse_bool("f", &Value::Bool(true)).unwrap());
        assert!(parse_bool("f", &Value::String("TRUE".into())).unwrap());
        assert!(!parse_bool("f", &Value::String("False".into())).unwrap());
        assert!(parse_bool("f", &Value::String("1".into())).unwrap());
        assert!(!parse_bool("f", &Value::Number(0.into())).unwrap());
    }

    #[test]
    fn test_parse_bool_rejects_other_tokens() {
        for raw in ["yes", "maybe", ""] {
            let err = parse_bool("save_locally_flag", &Value::String(raw.into())).unwrap_err();
            assert_eq!(field_of(err), "save_locally_flag");
        }
        assert!(parse_bool("f", &Value::Number(2.into())).is_err());
        assert!(parse_bool("f", &Value::Null).is_err());
    }

    #[test]
    fn test_parse_numbers_lenient_on_strings() {
        assert_eq!(parse_f64("gain", &Value::String(" 0.5 ".into())).unwrap(), 0.5);
        assert_eq!(parse_f64("gain", &Value::Number(2.into())).unwrap(), 2.0);
        assert_eq!(parse_i64("channel", &Value::String("4".into())).unwrap(), 4);
    }

    #[test]
    fn test_parse_numbers_reject_garbage() {
        let err = parse_f64("gain", &Value::String("abc".into())).unwrap_err();
        assert!(err.to_string().contains("\"abc\""));
        assert_eq!(field_of(err), "gain");

        let err = parse_i64("channel", &Value::String("4.5".into())).unwrap_err();
        assert_eq!(field_of(err), "channel");
    }
}
