//! Radiometric correction from digital numbers to ground reflectance.
//!
//! ```text
//! total radiance  = offset + DN * gain
//! net radiance    = total radiance - path radiance
//! net irradiance  = net radiance * π
//! reflectance     = net irradiance / incoming irradiance   (clamped to [0, 1])
//! ```

use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use calibration::CalibrationParameters;
use landsat_common::{Grid, PreprocessError, PreprocessResult};

use crate::geotiff::{read_band, write_band};

/// The scalar coefficients of the correction, checked for a usable divisor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiometricModel {
    gain: f64,
    offset: f64,
    path_radiance: f64,
    incoming_irradiance: f64,
}

impl RadiometricModel {
    /// Fails with `DegenerateIrradiance` when incoming irradiance is not a
    /// positive finite number (a zenith angle of 90 degrees gives zero).
    pub fn from_parameters(params: &CalibrationParameters) -> PreprocessResult<Self> {
        let incoming_irradiance = params.incoming_irradiance();
        if !(incoming_irradiance.is_finite() && incoming_irradiance > 0.0) {
            return Err(PreprocessError::DegenerateIrradiance(incoming_irradiance));
        }

        Ok(Self {
            gain: params.gain(),
            offset: params.offset(),
            path_radiance: params.path_radiance(),
            incoming_irradiance,
        })
    }

    /// Reflectance of a single digital number, clamped to [0, 1].
    ///
    /// NaN (from a NaN sample) maps to 0.
    #[inline]
    pub fn reflectance(&self, dn: f64) -> f64 {
        let total_radiance = self.offset + dn * self.gain;
        let net_radiance = total_radiance - self.path_radiance;
        let net_irradiance = net_radiance * PI;
        let mut reflectance = net_irradiance / self.incoming_irradiance;

        if reflectance < 0.0 {
            reflectance = 0.0;
        }
        if reflectance > 1.0 {
            reflectance = 1.0;
        }
        if reflectance.is_nan() {
            reflectance = 0.0;
        }
        reflectance
    }

    /// Apply the correction to every cell. Georeferencing is carried over.
    pub fn apply(&self, dn: &Grid) -> Grid {
        let mut out = dn.clone();
        out.data_mut()
            .par_iter_mut()
            .for_each(|v| *v = self.reflectance(*v));
        out
    }
}

/// In-memory reflectance computation.
pub fn reflectance_grid(dn: &Grid, params: &CalibrationParameters) -> PreprocessResult<Grid> {
    Ok(RadiometricModel::from_parameters(params)?.apply(dn))
}

/// Outcome of one reflectance run.
#[derive(Debug, Clone, Serialize)]
pub struct ReflectanceReport {
    pub output_path: PathBuf,
    pub rows: usize,
    pub cols: usize,
    /// Cells whose reflectance is exactly 0 after clamping.
    pub clamped_low: usize,
    /// Cells whose reflectance is exactly 1 after clamping.
    pub clamped_high: usize,
}

/// Read band 1 of `input`, correct it and write the reflectance raster to
/// `output`, replacing any existing file.
///
/// The irradiance guard runs before any raster I/O.
pub fn compute_reflectance(
    input: &Path,
    output: &Path,
    params: &CalibrationParameters,
) -> PreprocessResult<ReflectanceReport> {
    let model = RadiometricModel::from_parameters(params)?;

    let dn = read_band(input)?;
    let (rows, cols) = dn.shape();
    info!(rows, cols, path = %input.display(), "Satellite image {} rows by {} columns", rows, cols);

    if let Some((sx, sy)) = dn.georeference().and_then(|g| g.pixel_size()) {
        let expected = f64::from(params.cell_size());
        if sx != expected || sy != expected {
            warn!(
                pixel_x = sx,
                pixel_y = sy,
                cell_size = params.cell_size(),
                "Raster pixel size differs from configured cell size"
            );
        }
    }

    let reflectance = model.apply(&dn);
    write_band(output, &reflectance)?;

    let clamped_low = reflectance.data().par_iter().filter(|&&v| v == 0.0).count();
    let clamped_high = reflectance.data().par_iter().filter(|&&v| v == 1.0).count();

    info!(
        path = %output.display(),
        clamped_low,
        clamped_high,
        "Wrote reflectance raster"
    );

    Ok(ReflectanceReport {
        output_path: output.to_path_buf(),
        rows,
        cols,
        clamped_low,
        clamped_high,
    })
}
