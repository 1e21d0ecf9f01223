//! Path utilities for locating test data and building scratch workspaces.

use std::fs;
use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// This is determined by walking up from the current crate's manifest directory
/// until we find the workspace Cargo.toml.
pub fn workspace_root() -> PathBuf {
    // Start from the test-utils crate manifest dir
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Returns the path to `crates/{crate_name}/testdata/`.
pub fn crate_testdata_dir(crate_name: &str) -> PathBuf {
    workspace_root()
        .join("crates")
        .join(crate_name)
        .join("testdata")
}

/// Searches for a test file in multiple locations.
///
/// This function checks the following locations in order:
/// 1. Environment variable `TEST_DATA_DIR` (if set)
/// 2. `crates/reflectance/testdata/`
/// 3. `testdata/` at the workspace root
///
/// # Returns
///
/// `Some(PathBuf)` if the file is found, `None` otherwise.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(test_data_dir) = std::env::var("TEST_DATA_DIR") {
        candidates.push(PathBuf::from(test_data_dir).join(name));
    }

    let root = workspace_root();
    candidates.extend([
        crate_testdata_dir("reflectance").join(name),
        root.join("testdata").join(name),
    ]);

    candidates.into_iter().find(|path| path.exists())
}

/// Creates a temporary directory for test output.
///
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

/// Creates a temporary directory with a specific prefix.
pub fn temp_test_dir_with_prefix(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temporary test directory")
}

/// A temporary `parent_dir` laid out the way the preprocessor expects:
///
/// ```text
/// <tmp>/
/// ├── config.yaml
/// └── Data/
///     ├── toronto_2011_band4.tif
///     └── toronto_reflectance.tif
/// ```
pub struct ScratchWorkspace {
    dir: tempfile::TempDir,
}

impl ScratchWorkspace {
    /// Create the temporary directory and its `Data/` subdirectory.
    pub fn new() -> Self {
        let dir = temp_test_dir_with_prefix("reflectance_test_");
        fs::create_dir_all(dir.path().join("Data")).expect("Failed to create Data directory");
        Self { dir }
    }

    /// The `parent_dir` to put in configuration.
    pub fn parent_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Default input raster location.
    pub fn input_path(&self) -> PathBuf {
        self.dir.path().join("Data/toronto_2011_band4.tif")
    }

    /// Default output raster location.
    pub fn output_path(&self) -> PathBuf {
        self.dir.path().join("Data/toronto_reflectance.tif")
    }

    /// Write `content` to `config.yaml` and return its path.
    pub fn write_config(&self, content: &str) -> PathBuf {
        let path = self.dir.path().join("config.yaml");
        fs::write(&path, content).expect("Failed to write config.yaml");
        path
    }
}

impl Default for ScratchWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
