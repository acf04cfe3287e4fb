use crate::domain::Result;
use std::path::{Path, PathBuf};

/// Port for keeping a copy of a file before it is rewritten
pub trait BackupStore: Send + Sync {
    /// Copy the current content of `path` aside and return where it went
    fn backup(&self, path: &Path) -> Result<PathBuf>;
}
