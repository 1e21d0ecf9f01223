//! The preprocessing run as explicit, ordered steps.
//!
//! ```text
//! resolve  ->  bootstrap_database  ->  compute  ->  display
//! ```
//!
//! Each step is a method so it can be exercised on its own. `run` chains
//! them and stops at the first error; outputs already written are left.

use std::path::Path;

use tracing::{info, warn};

use calibration::{load_settings, resolve, ResolvedRun, Settings};
use landsat_common::{PreprocessError, PreprocessResult};
use reflectance::{compute_reflectance, read_band, BandSummary, ReflectanceReport};
use staging::{ensure_staging_schema, StagingDatabase};

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub skip_database: bool,
    pub histogram_bins: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            skip_database: false,
            histogram_bins: 20,
        }
    }
}

/// Everything a completed run produced.
pub struct PipelineOutcome {
    pub run: ResolvedRun,
    pub database: Option<StagingDatabase>,
    pub report: ReflectanceReport,
}

pub struct Pipeline {
    settings: Settings,
    options: PipelineOptions,
}

impl Pipeline {
    /// Fails with `InvalidConfig` when the database section is required but absent.
    pub fn new(settings: Settings, options: PipelineOptions) -> PreprocessResult<Self> {
        if !options.skip_database && settings.postgres_db.is_none() {
            return Err(PreprocessError::invalid_config(
                "postgres_db",
                "postgres_db section is missing; add it or pass --skip-database",
            ));
        }
        Ok(Self { settings, options })
    }

    pub fn from_config_file(path: &Path, options: PipelineOptions) -> PreprocessResult<Self> {
        Self::new(load_settings(path)?, options)
    }

    /// Parse and validate calibration parameters, then locate the input raster.
    pub fn resolve(&self) -> PreprocessResult<ResolvedRun> {
        resolve(&self.settings)
    }

    /// Connect to PostgreSQL and ensure the staging schema, unless skipped.
    pub async fn bootstrap_database(&self) -> PreprocessResult<Option<StagingDatabase>> {
        if self.options.skip_database {
            info!("Database bootstrap skipped");
            return Ok(None);
        }

        let config = self.settings.postgres_db.as_ref().ok_or_else(|| {
            PreprocessError::invalid_config("postgres_db", "postgres_db section is missing")
        })?;
        ensure_staging_schema(config).await.map(Some)
    }

    pub fn compute(&self, run: &ResolvedRun) -> PreprocessResult<ReflectanceReport> {
        compute_reflectance(
            run.parameters.satellite_image(),
            &run.output_path,
            &run.parameters,
        )
    }

    /// Re-open the input and output rasters and log a summary of each.
    pub fn display(&self, run: &ResolvedRun) -> PreprocessResult<Vec<BandSummary>> {
        let panels = [
            ("Original Image", run.parameters.satellite_image()),
            ("Reflectance Image", run.output_path.as_path()),
        ];

        let mut summaries = Vec::with_capacity(panels.len());
        for (title, path) in panels {
            let grid = read_band(path)?;
            match BandSummary::of(&grid, self.options.histogram_bins) {
                Some(summary) => {
                    summary.log(title);
                    summaries.push(summary);
                }
                None => warn!(title, path = %path.display(), "Band holds no finite values"),
            }
        }
        Ok(summaries)
    }

    pub async fn run(&self) -> PreprocessResult<PipelineOutcome> {
        let run = self.resolve()?;
        let database = self.bootstrap_database().await?;
        let report = self.compute(&run)?;
        self.display(&run)?;

        Ok(PipelineOutcome {
            run,
            database,
            report,
        })
    }
}
