use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::domain::{PacError, Result};
use crate::ports::{BackupStore, Clock};

/// Writes backups as `<dir>/<file name>.<YYYYMMDD_HHMMSS>.bak`.
///
/// Existing backups are never overwritten: a second backup within the same
/// second goes to `<file name>.<YYYYMMDD_HHMMSS>.<n>.bak`.
pub struct FsBackupStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FsBackupStore {
    pub fn new(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self { dir: dir.into(), clock }
    }

    /// Creates the first free backup file for `path`.
    fn create_target(&self, path: &Path) -> Result<(PathBuf, File)> {
        let name = path
            .file_name()
            .ok_or_else(|| PacError::Backup(format!("{} has no file name", path.display())))?
            .to_string_lossy()
            .into_owned();
        let stamp = self.clock.now().format("%Y%m%d_%H%M%S").to_string();

        for n in 0u32.. {
            let target = match n {
                0 => self.dir.join(format!("{}.{}.bak", name, stamp)),
                n => self.dir.join(format!("{}.{}.{}.bak", name, stamp, n)),
            };
            match OpenOptions::new().write(true).create_new(true).open(&target) {
                Ok(file) => return Ok((target, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(PacError::Backup(format!("cannot create {}: {}", target.display(), e))),
            }
        }
        Err(PacError::Backup(format!("no free backup name for {}", path.display())))
    }
}

impl BackupStore for FsBackupStore {
    fn backup(&self, path: &Path) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| PacError::Backup(format!("cannot create {}: {}", self.dir.display(), e)))?;

        let content = fs::read(path).map_err(|e| PacError::Backup(format!("cannot read {}: {}", path.display(), e)))?;

        let (target, mut file) = self.create_target(path)?;
        file.write_all(&content)
            .and_then(|_| file.sync_all())
            .map_err(|e| PacError::Backup(format!("cannot write {}: {}", target.display(), e)))?;

        info!("Created backup: {}", target.display());
        Ok(target)
    }
}
