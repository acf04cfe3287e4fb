use std::sync::Arc;

use url::Url;

use super::pac::generate_from_str;
use super::{match_host, DomainSet, PacDocument, PacError, Result, RouteReport, StatsSnapshot, UpdateStats};
use crate::config::AppConfig;

const FALLBACK_PROXY: &str = "162.159.138.110:443";

/// Read-only routing simulation over a domain table loaded at start-up.
pub struct PacTester {
    domains: DomainSet,
    config: Arc<AppConfig>,
    zone: String,
}

impl PacTester {
    pub fn new(domains: DomainSet, config: Arc<AppConfig>, zone: impl Into<String>) -> Self {
        Self {
            domains,
            config,
            zone: zone.into(),
        }
    }

    pub fn domains(&self) -> &DomainSet {
        &self.domains
    }

    pub fn default_proxy(&self) -> &str {
        self.config.default_proxy().unwrap_or(FALLBACK_PROXY)
    }

    pub fn test_url(&self, url: &str, proxy: Option<&str>) -> Result<RouteReport> {
        let proxy = proxy.map(str::trim).filter(|p| !p.is_empty()).unwrap_or(self.default_proxy());
        let hostname = extract_hostname(url)?;
        let outcome = match_host(&hostname, &self.domains);

        let action = if outcome.matched {
            format!("PROXY {};", proxy)
        } else {
            "DIRECT;".to_string()
        };

        Ok(RouteReport {
            url: url.to_string(),
            reason: outcome.reason(&hostname),
            uses_proxy: outcome.matched,
            matched_suffix: outcome.suffix,
            hostname,
            action,
        })
    }

    pub fn generate_pac(&self, proxy: Option<&str>) -> Result<PacDocument> {
        let proxy = proxy.map(str::trim).filter(|p| !p.is_empty()).unwrap_or(self.default_proxy());
        generate_from_str(proxy, &self.domains)
    }

    pub fn snapshot(&self, stats: &UpdateStats) -> StatsSnapshot {
        StatsSnapshot {
            total_domains: self.domains.len(),
            domains: self.domains.first_n(100),
            sample_domains: self.domains.first_n(10),
            files_processed: stats.files_processed,
            domains_updated: stats.domains_updated,
            errors: stats.errors,
            success_rate: stats.success_rate(),
            timezone: self.zone.clone(),
            auto_backup: self.config.auto_backup,
            domain_increment: self.config.domain_increment,
            proxy_servers: self.config.proxy_servers.len(),
        }
    }
}

/// Hostname of `url`; bare hosts like `example.com/path` are read as `http://`.
fn extract_hostname(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(PacError::InvalidUrl("empty URL".into()));
    }
    let parsed = if url.contains("://") {
        Url::parse(url)
    } else {
        Url::parse(&format!("http://{}", url))
    }
    .map_err(|e| PacError::InvalidUrl(format!("{}: {}", url, e)))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| PacError::InvalidUrl(format!("{} has no host", url)))?;
    Ok(host.trim_start_matches('[').trim_end_matches(']').to_string())
}
