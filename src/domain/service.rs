use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::rewrite::{self, CommentStyle};
use super::{encoded, FileKind, HostUpdate, PacDocument, PacError, Result, UpdateStats};
use crate::config::AppConfig;
use crate::ports::{BackupStore, Clock};

/// Outcome of [`PacManager::run_update_cycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub success: bool,
    pub stats: UpdateStats,
}

/// Rewrites PAC files and domain lists in place.
///
/// Updates to one path are not coordinated: callers serialize them.
#[derive(Clone)]
pub struct PacManager {
    config: Arc<AppConfig>,
    clock: Arc<dyn Clock>,
    backups: Arc<dyn BackupStore>,
}

impl PacManager {
    pub fn new(config: Arc<AppConfig>, clock: Arc<dyn Clock>, backups: Arc<dyn BackupStore>) -> Self {
        Self { config, clock, backups }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn current_stamp(&self) -> String {
        rewrite::format_stamp(self.clock.now())
    }

    /// Swaps the proxy directive (when `new_proxy` is given) and refreshes the timestamp.
    pub fn update_pac_file(&self, path: &Path, new_proxy: Option<&str>, stats: &mut UpdateStats) -> bool {
        match self.try_update_pac_file(path, new_proxy) {
            Ok(()) => {
                stats.files_processed += 1;
                info!("Successfully updated PAC file: {}", path.display());
                true
            }
            Err(e) => {
                error!("Failed to update PAC file {}: {}", path.display(), e);
                stats.errors += 1;
                false
            }
        }
    }

    /// Increments numbered domains by the configured `domain_increment`.
    pub fn update_domain_list(&self, path: &Path, stats: &mut UpdateStats) -> bool {
        self.update_domain_numbers(path, self.config.domain_increment, stats)
    }

    pub fn update_domain_numbers(&self, path: &Path, increment: i64, stats: &mut UpdateStats) -> bool {
        match self.try_update_domain_numbers(path, increment) {
            Ok(count) => {
                stats.files_processed += 1;
                stats.domains_updated += count as u64;
                info!("Successfully updated domains file: {} ({} domains)", path.display(), count);
                true
            }
            Err(e) => {
                error!("Failed to update domains file {}: {}", path.display(), e);
                stats.errors += 1;
                false
            }
        }
    }

    pub fn update_vmess_link(&self, link: &str) -> HostUpdate {
        encoded::update_host(link, self.config.domain_increment)
    }

    /// Structural check of a PAC file; problems are logged, not returned.
    pub fn validate_pac_file(&self, path: &Path) -> bool {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                error!("Failed to validate PAC syntax of {}: {}", path.display(), e);
                return false;
            }
        };
        match PacDocument::new(content).validate() {
            Ok(()) => {
                info!("PAC file syntax validation passed: {}", path.display());
                true
            }
            Err(problem) => {
                warn!("Invalid PAC file {}: {}", path.display(), problem);
                false
            }
        }
    }

    /// Updates every target according to its kind.
    ///
    /// Succeeds only if every supported file was updated; unsupported files are skipped.
    pub fn run_update_cycle(&self, files: &[PathBuf], new_proxy: Option<&str>) -> CycleReport {
        info!("Starting PAC configuration update cycle...");
        let mut stats = UpdateStats::default();
        let mut success = true;

        for path in files {
            let mut file_stats = UpdateStats::default();
            let updated = match FileKind::classify(path) {
                FileKind::Pac => self.update_pac_file(path, new_proxy, &mut file_stats),
                FileKind::DomainList => self.update_domain_list(path, &mut file_stats),
                FileKind::Unsupported => {
                    warn!("Unsupported file type: {}", path.display());
                    continue;
                }
            };
            debug!(
                "{}: {} domains updated, {} errors",
                path.display(),
                file_stats.domains_updated,
                file_stats.errors
            );
            stats.merge(&file_stats);
            success &= updated;
        }

        info!("{}", self.statistics_report(&stats));
        CycleReport { success, stats }
    }

    pub fn statistics_report(&self, stats: &UpdateStats) -> String {
        format!(
            "
PAC Configuration Manager - Statistics Report
Generated: {}

Files Processed: {}
Domains Updated: {}
Errors Encountered: {}
Success Rate: {:.1}%

Configuration:
- Timezone: {}
- Auto Backup: {}
- Domain Increment: {}
- Proxy Servers: {} configured
",
            self.current_stamp(),
            stats.files_processed,
            stats.domains_updated,
            stats.errors,
            stats.success_rate(),
            self.config.timezone,
            self.config.auto_backup,
            self.config.domain_increment,
            self.config.proxy_servers.len(),
        )
    }

    fn try_update_pac_file(&self, path: &Path, new_proxy: Option<&str>) -> Result<()> {
        let mut content = self.read_target(path)?;

        if let Some(proxy) = new_proxy.map(str::trim).filter(|p| !p.is_empty()) {
            match rewrite::replace_proxy(&content, proxy) {
                Some(updated) => {
                    content = updated;
                    info!("Updated proxy server to: {}", proxy);
                }
                None => warn!("No proxy directive found in {}", path.display()),
            }
        }

        let content = rewrite::refresh_timestamp(&content, &self.current_stamp(), CommentStyle::Script);
        fs::write(path, content)?;
        Ok(())
    }

    fn try_update_domain_numbers(&self, path: &Path, increment: i64) -> Result<usize> {
        let content = self.read_target(path)?;

        let (content, count) = rewrite::increment_domain_numbers(&content, increment);
        if count == 0 {
            debug!("no numbered domains in {}", path.display());
        }

        let content = rewrite::refresh_timestamp(&content, &self.current_stamp(), CommentStyle::Markup);
        fs::write(path, content)?;
        Ok(count)
    }

    /// Checks the target exists, backs it up, and reads it.
    fn read_target(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(PacError::FileNotFound(path.to_path_buf()));
        }
        self.backup(path)?;
        Ok(fs::read_to_string(path)?)
    }

    fn backup(&self, path: &Path) -> Result<()> {
        if !self.config.auto_backup {
            return Ok(());
        }
        match self.backups.backup(path) {
            Ok(_) => Ok(()),
            Err(e) if self.config.strict_backup => Err(e),
            Err(e) => {
                warn!("{}. Continuing without backup...", e);
                Ok(())
            }
        }
    }
}
