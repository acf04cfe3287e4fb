use super::DomainSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub matched: bool,
    pub suffix: Option<String>,
}

impl MatchOutcome {
    fn hit(suffix: &str) -> Self {
        Self {
            matched: true,
            suffix: Some(suffix.to_string()),
        }
    }

    fn miss() -> Self {
        Self {
            matched: false,
            suffix: None,
        }
    }

    /// Human readable explanation for `host`.
    pub fn reason(&self, host: &str) -> String {
        match &self.suffix {
            Some(suffix) if suffix == host => format!("Exact match: {}", host),
            Some(suffix) => format!("Parent domain match: {}", suffix),
            None => "Domain not in proxy list".to_string(),
        }
    }
}

/// Suffix walk of the generated PAC script.
///
/// Tests the label after the last dot first, then moves the split point left
/// one dot at a time, finishing with the whole host. As with
/// `lastIndexOf('.')`, a dot at index 0 ends the walk before the whole host
/// is tried.
pub fn match_host(host: &str, domains: &DomainSet) -> MatchOutcome {
    if host.is_empty() {
        return MatchOutcome::miss();
    }

    let mut pos = host.rfind('.');
    loop {
        let start = pos.map_or(0, |p| p + 1);
        let suffix = &host[start..];
        if domains.contains(suffix) {
            return MatchOutcome::hit(suffix);
        }
        match pos {
            None | Some(0) => break,
            Some(p) => pos = host[..p].rfind('.'),
        }
    }
    MatchOutcome::miss()
}
