use std::collections::BTreeSet;
use std::net::Ipv6Addr;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use super::{PacError, Result};

/// Quoted keys mapped to the literal `1` inside a PAC domain table.
static DOMAIN_ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)"\s*:\s*1"#).unwrap());

/// A single proxy endpoint, `host:port` or `[ipv6]:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRule {
    endpoint: String,
}

impl ProxyRule {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PacError::Validation("proxy endpoint is empty".into()));
        }
        if raw.contains(|c: char| c.is_whitespace() || c == ';' || c == '"') {
            return Err(PacError::Validation(format!("proxy endpoint contains illegal characters: {}", raw)));
        }

        let (host, port) = if let Some(rest) = raw.strip_prefix('[') {
            let (host, port) = rest
                .split_once("]:")
                .ok_or_else(|| PacError::Validation(format!("expected [ipv6]:port, got {}", raw)))?;
            host.parse::<Ipv6Addr>()
                .map_err(|e| PacError::Validation(format!("invalid IPv6 host {}: {}", host, e)))?;
            (host, port)
        } else {
            let (host, port) = raw
                .rsplit_once(':')
                .ok_or_else(|| PacError::Validation(format!("expected host:port, got {}", raw)))?;
            // Unbracketed IPv6 hosts keep the port in the last group.
            if host.contains(':') && host.parse::<Ipv6Addr>().is_err() {
                return Err(PacError::Validation(format!("invalid IPv6 host: {}", host)));
            }
            (host, port)
        };

        if host.is_empty() {
            return Err(PacError::Validation(format!("missing host in {}", raw)));
        }
        match port.parse::<u16>() {
            Ok(p) if p != 0 => {}
            _ => return Err(PacError::Validation(format!("invalid port in {}", raw))),
        }

        Ok(Self {
            endpoint: raw.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.endpoint
    }

    pub fn action(&self) -> String {
        format!("PROXY {};", self.endpoint)
    }
}

impl std::fmt::Display for ProxyRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.endpoint)
    }
}

/// Set of domain suffixes routed through the proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainSet {
    domains: BTreeSet<String>,
}

impl DomainSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts every `"<domain>": 1` entry from PAC text.
    pub fn from_pac_text(content: &str) -> Self {
        DOMAIN_ENTRY
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .collect()
    }

    /// Loads and merges the domain tables of several PAC files.
    ///
    /// Missing files are skipped, unreadable ones are logged and skipped.
    pub fn load_from_files<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut set = Self::new();
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                debug!("domain source {} does not exist, skipping", path.display());
                continue;
            }
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    let loaded = Self::from_pac_text(&content);
                    debug!("loaded {} domains from {}", loaded.len(), path.display());
                    set.extend(loaded.domains);
                }
                Err(e) => warn!("Error loading {}: {}", path.display(), e),
            }
        }
        set
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(domain)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Domains in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }

    pub fn first_n(&self, n: usize) -> Vec<String> {
        self.domains.iter().take(n).cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for DomainSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            domains: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for DomainSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.domains.extend(iter.into_iter().map(Into::into));
    }
}

/// Counters of one update run. Owned by the caller, never global.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateStats {
    pub files_processed: u64,
    pub domains_updated: u64,
    pub errors: u64,
}

impl UpdateStats {
    pub fn merge(&mut self, other: &UpdateStats) {
        self.files_processed += other.files_processed;
        self.domains_updated += other.domains_updated;
        self.errors += other.errors;
    }

    pub fn success_rate(&self) -> f64 {
        (1.0 - self.errors as f64 / self.files_processed.max(1) as f64) * 100.0
    }
}

/// Outcome of the encoded-config host rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostUpdate {
    Unchanged,
    Updated(String),
}

impl HostUpdate {
    /// The value to hand back to the caller: the new string, or `original`.
    pub fn into_value(self, original: &str) -> String {
        match self {
            HostUpdate::Unchanged => original.to_string(),
            HostUpdate::Updated(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pac,
    DomainList,
    Unsupported,
}

impl FileKind {
    /// Classifies a target by its file name.
    pub fn classify(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.ends_with(".pac") || name.contains("pac") {
            FileKind::Pac
        } else if name.ends_with(".md") {
            FileKind::DomainList
        } else {
            FileKind::Unsupported
        }
    }
}

/// Result of simulating the routing of one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteReport {
    pub url: String,
    pub hostname: String,
    pub uses_proxy: bool,
    pub matched_suffix: Option<String>,
    pub action: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_domains: usize,
    pub domains: Vec<String>,
    pub sample_domains: Vec<String>,
    pub files_processed: u64,
    pub domains_updated: u64,
    pub errors: u64,
    pub success_rate: f64,
    pub timezone: String,
    pub auto_backup: bool,
    pub domain_increment: i64,
    pub proxy_servers: usize,
}
