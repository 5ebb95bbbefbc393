// File: testing-framework/src/utilities/storage.rs
//
// Node-home utilities
//
// RAII temporary directories used as the storage namespace of a harness.
// The directory is removed when the handle is dropped, even if the test
// panics.

use std::{
    io,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

const NODE_HOME_PREFIX: &str = "blocksim_node_home_";

/// Temporary node home, deleted on drop.
///
/// # Example
///
/// ```ignore
/// use blocksim_testing_framework::utilities::TempNodeHome;
///
/// let home = TempNodeHome::new()?;
/// let harness = HarnessBuilder::new()
///     .with_node_home(home.path())
///     .build::<MemApp>()?;
/// // home is cleaned up here (Drop)
/// ```
///
/// Cleanup does not happen if the process is killed with SIGKILL.
pub struct TempNodeHome {
    _temp_dir: TempDir,
    path: PathBuf,
}

impl TempNodeHome {
    pub fn new() -> io::Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix(NODE_HOME_PREFIX)
            .tempdir()?;
        let path = temp_dir.path().to_path_buf();

        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Created temporary node home at: {:?}", path);
        }

        Ok(Self {
            _temp_dir: temp_dir,
            path,
        })
    }

    /// Valid until the handle is dropped.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn path_buf(&self) -> PathBuf {
        self.path.clone()
    }
}

impl Drop for TempNodeHome {
    fn drop(&mut self) {
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Cleaning up temporary node home at: {:?}", self.path);
        }
    }
}

/// Temporary directory with a custom prefix, for scenario files or other
/// test data.
pub fn create_temp_dir(prefix: &str) -> io::Result<TempDir> {
    tempfile::Builder::new().prefix(prefix).tempdir()
}
