//! Configuration loader for the reflectance preprocessor.
//!
//! Loads a single YAML file with three sections:
//! - `save_files`: base directory and output behaviour
//! - `satellite_parameters`: sensor calibration and solar geometry
//! - `postgres_db`: staging database connection
//!
//! Supports environment variable substitution using ${VAR} syntax.
//! Scalar values under `save_files.save_locally_flag` and
//! `satellite_parameters` are kept raw here and parsed strictly by
//! [`crate::params`], so that type errors name the offending field.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::debug;

use landsat_common::{DatabaseConfig, PreprocessError, PreprocessResult};

/// Input raster location relative to `parent_dir`.
pub const DEFAULT_INPUT_IMAGE: &str = "Data/toronto_2011_band4.tif";

/// Output raster location relative to `parent_dir`.
pub const DEFAULT_OUTPUT_IMAGE: &str = "Data/toronto_reflectance.tif";

// ============================================================================
// Settings (config.yaml)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub save_files: SaveFiles,
    pub satellite_parameters: SatelliteParameters,
    #[serde(default)]
    pub postgres_db: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveFiles {
    pub save_locally_flag: Value,
    pub parent_dir: PathBuf,
    #[serde(default)]
    pub input_image: Option<PathBuf>,
    #[serde(default)]
    pub output_image: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteParameters {
    pub gain: Value,
    pub offset: Value,
    pub path_radiance: Value,
    pub atmosphere_transitivity: Value,
    pub solar_radiance: Value,
    pub zenith_angle: Value,
    pub channel: Value,
    pub cell_size: Value,
}

impl Settings {
    /// Parse settings from YAML text, expanding environment variables first.
    pub fn from_yaml_str(content: &str) -> PreprocessResult<Self> {
        let expanded = expand_env_vars(content)?;
        serde_yaml::from_str(&expanded)
            .map_err(|e| PreprocessError::ConfigRead(format!("invalid YAML: {}", e)))
    }

    /// Path the input satellite image is expected at.
    pub fn input_path(&self) -> PathBuf {
        let relative = self
            .save_files
            .input_image
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_INPUT_IMAGE));
        self.save_files.parent_dir.join(relative)
    }

    /// Path the reflectance raster is written to.
    pub fn output_path(&self) -> PathBuf {
        let relative = self
            .save_files
            .output_image
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_OUTPUT_IMAGE));
        self.save_files.parent_dir.join(relative)
    }
}

/// Load settings from a YAML file.
pub fn load_settings<P: AsRef<Path>>(path: P) -> PreprocessResult<Settings> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Reading configuration");

    let content = fs::read_to_string(path).map_err(|e| {
        PreprocessError::ConfigRead(format!("cannot read {}: {}", path.display(), e))
    })?;

    Settings::from_yaml_str(&content)
}

// ============================================================================
// Environment variable expansion
// ============================================================================

/// Expand environment variables in format ${VAR} or ${VAR:-default}
///
/// YAML comments are copied through untouched.
fn expand_env_vars(content: &str) -> PreprocessResult<String> {
    let mut result = String::with_capacity(content.len());

    for line in content.split_inclusive('\n') {
        let (text, comment) = line.split_at(comment_start(line).unwrap_or(line.len()));
        expand_segment(text, &mut result)?;
        result.push_str(comment);
    }

    Ok(result)
}

/// Byte offset of a `#` that starts a comment: at line start or after
/// whitespace, and outside quoted scalars.
fn comment_start(line: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut prev = ' ';

    for (i, ch) in line.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') if prev.is_whitespace() || matches!(prev, '[' | '{' | ',') => {
                quote = Some(ch)
            }
            (None, '#') if prev.is_whitespace() => return Some(i),
            _ => {}
        }
        prev = ch;
    }
    None
}

fn expand_segment(text: &str, result: &mut String) -> PreprocessResult<()> {
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_expr = String::new();
            let mut brace_count = 1;

            while brace_count > 0 {
                match chars.next() {
                    Some('{') => {
                        brace_count += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        brace_count -= 1;
                        if brace_count > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => {
                        return Err(PreprocessError::ConfigRead(format!(
                            "unclosed variable substitution: ${{{}",
                            var_expr.trim_end()
                        )))
                    }
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(())
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> PreprocessResult<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).map_err(|_| {
            PreprocessError::ConfigRead(format!("environment variable {} not set", expr))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
save_files:
  save_locally_flag: True
  parent_dir: /data/landsat
satellite_parameters:
  gain: 0.6437
  offset: -1.52
  path_radiance: 2.0
  atmosphere_transitivity: 0.8
  solar_radiance: 1047.0
  zenith_angle: 30.0
  channel: 4
  cell_size: 30
"#;

    #[test]
    fn test_expand_env_vars_simple() {
        std::env::set_var("CALIBRATION_TEST_VAR", "test_value");
        let result = expand_env_vars("prefix_${CALIBRATION_TEST_VAR}_suffix").unwrap();
        assert_eq!(result, "prefix_test_value_suffix");
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        std::env::remove_var("CALIBRATION_NONEXISTENT_VAR");
        let result = expand_env_vars("value_${CALIBRATION_NONEXISTENT_VAR:-default}_end").unwrap();
        assert_eq!(result, "value_default_end");
    }

    #[test]
    fn test_expand_env_vars_missing_required() {
        std::env::remove_var("CALIBRATION_REQUIRED_VAR");
        let result = expand_env_vars("${CALIBRATION_REQUIRED_VAR}");
        assert!(matches!(result, Err(PreprocessError::ConfigRead(_))));
    }

    #[test]
    fn test_expand_env_vars_ignores_comments() {
        std::env::remove_var("CALIBRATION_COMMENTED_VAR");
        let yaml = "# uses ${CALIBRATION_COMMENTED_VAR}\nkey: 1 # or ${CALIBRATION_COMMENTED_VAR}\n";
        assert_eq!(expand_env_vars(yaml).unwrap(), yaml);
    }

    #[test]
    fn test_hash_inside_value_is_not_a_comment() {
        std::env::set_var("CALIBRATION_HASH_VAR", "x");
        let result = expand_env_vars("a: \"p # ${CALIBRATION_HASH_VAR}\"\nb: c#${CALIBRATION_HASH_VAR}\n").unwrap();
        assert_eq!(result, "a: \"p # x\"\nb: c#x\n");
    }

    #[test]
    fn test_comment_start() {
        assert_eq!(comment_start("# full line"), Some(0));
        assert_eq!(comment_start("key: v # note"), Some(7));
        assert_eq!(comment_start("key: 'a # b'"), None);
        assert_eq!(comment_start("key: a#b"), None);
        assert_eq!(comment_start("key: it's # note"), Some(10));
    }

    #[test]
    fn test_expand_env_vars_unclosed() {
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }

    #[test]
    fn test_settings_default_paths() {
        let settings = Settings::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(
            settings.input_path(),
            PathBuf::from("/data/landsat/Data/toronto_2011_band4.tif")
        );
        assert_eq!(
            settings.output_path(),
            PathBuf::from("/data/landsat/Data/toronto_reflectance.tif")
        );
        assert!(settings.postgres_db.is_none());
    }

    #[test]
    fn test_settings_path_overrides() {
        let yaml = MINIMAL.replace(
            "  parent_dir: /data/landsat\n",
            "  parent_dir: /data/landsat\n  input_image: scenes/b4.tif\n  output_image: out/r.tif\n",
        );
        let settings = Settings::from_yaml_str(&yaml).unwrap();
        assert_eq!(settings.input_path(), PathBuf::from("/data/landsat/scenes/b4.tif"));
        assert_eq!(settings.output_path(), PathBuf::from("/data/landsat/out/r.tif"));
    }

    #[test]
    fn test_settings_with_database_section() {
        let yaml = format!(
            "{}postgres_db:\n  host: localhost\n  port: 5432\n  db_name: landsat\n  user: postgres\n  password: secret\n",
            MINIMAL
        );
        let settings = Settings::from_yaml_str(&yaml).unwrap();
        let db = settings.postgres_db.unwrap();
        assert_eq!(db.host, "localhost");
        assert_eq!(db.port, 5432);
        assert_eq!(db.max_connections, 5);
    }

    #[test]
    fn test_settings_missing_key_is_config_read_error() {
        let yaml = MINIMAL.replace("  gain: 0.6437\n", "");
        let err = Settings::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, PreprocessError::ConfigRead(_)));
        assert!(err.to_string().contains("gain"));
    }

    #[test]
    fn test_load_settings_missing_file() {
        let err = load_settings("/definitely/not/here/config.yaml").unwrap_err();
        assert!(err.is_config_error());
    }
}
