//! Per-host scratch files.
//!
//! A session keeps two files in its scratch directory while it works:
//!
//! ```text
//! <scratch_dir>/<host>.ini           copy fetched from the device
//! <scratch_dir>/<host>.ini_updated   serialized edit staged for upload
//! ```
//!
//! Both are removed after a successful write-back.

use std::io;
use std::path::{Path, PathBuf};

/// Name of the configuration file on the device.
pub const REMOTE_CONFIG_NAME: &str = "config.ini";

/// Scratch directory used when none is configured.
pub const DEFAULT_SCRATCH_DIR: &str = "configs";

/// The two scratch paths for one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchPaths {
    pub fetched: PathBuf,
    pub staged: PathBuf,
}

impl ScratchPaths {
    pub fn for_host(scratch_dir: &Path, host: &str) -> Self {
        Self {
            fetched: scratch_dir.join(format!("{host}.ini")),
            staged: scratch_dir.join(format!("{host}.ini_updated")),
        }
    }
}

/// Removes `path`, treating "already gone" as success.
///
/// Returns whether a file was actually removed.
pub fn remove_if_present(path: &Path) -> io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_derived_from_host() {
        let paths = ScratchPaths::for_host(Path::new("configs"), "10.0.0.5");

        assert_eq!(paths.fetched, PathBuf::from("configs/10.0.0.5.ini"));
        assert_eq!(paths.staged, PathBuf::from("configs/10.0.0.5.ini_updated"));
    }

    #[test]
    fn test_remove_if_present_tolerates_missing_file() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("pdu_scratch_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("x.ini");
        std::fs::write(&path, "[A]\nk=v\n").unwrap();

        // Act / Assert
        assert!(remove_if_present(&path).unwrap());
        assert!(!path.exists());
        assert!(!remove_if_present(&path).unwrap());

        std::fs::remove_dir_all(&dir).ok();
    }
}
