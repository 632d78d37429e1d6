//! Core runtime configuration.
//!
//! The mount root is resolved once at process startup and then passed into [`crate::Storage`].
//! Request handling never reads environment variables, which keeps behaviour consistent across
//! concurrent calls and test harnesses.

use crate::{StorageError, StorageResult};
use api_shared::FileName;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    mount_root: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`, creating the mount directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageDirCreation` if the directory cannot be created, or `NotADirectory` if the
    /// path exists but is something else.
    pub fn new(mount_root: impl Into<PathBuf>) -> StorageResult<Self> {
        let mount_root = mount_root.into();
        if mount_root.exists() && !mount_root.is_dir() {
            return Err(StorageError::NotADirectory(mount_root));
        }
        std::fs::create_dir_all(&mount_root).map_err(StorageError::StorageDirCreation)?;

        Ok(Self { mount_root })
    }

    pub fn mount_root(&self) -> &Path {
        &self.mount_root
    }

    /// Absolute location of a logical filename.
    pub fn resolve(&self, name: &FileName) -> PathBuf {
        self.mount_root.join(name)
    }
}
