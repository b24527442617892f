use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Manages the Chrome user-data directory for a run.
///
/// Scenarios get a throwaway profile by default so runs start from a clean
/// browser state; a persistent profile keeps cookies between runs for the
/// already-logged-in fast path.
#[derive(Debug)]
pub struct ProfileManager {
    path: PathBuf,
    is_temporary: bool,
}

impl ProfileManager {
    /// Create a temporary profile that is deleted on drop.
    pub fn temporary() -> Result<Self> {
        let temp_dir = tempfile::tempdir().map_err(Error::Io)?;
        let path = temp_dir.keep();

        Ok(Self {
            path,
            is_temporary: true,
        })
    }

    /// Create or reuse a persistent profile at the given path.
    pub fn persistent(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            std::fs::create_dir_all(&path).map_err(Error::Io)?;
        }

        Ok(Self {
            path,
            is_temporary: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.is_temporary
    }
}

impl Drop for ProfileManager {
    fn drop(&mut self) {
        if self.is_temporary && self.path.exists() {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}
