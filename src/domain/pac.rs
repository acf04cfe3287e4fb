use once_cell::sync::Lazy;
use regex::Regex;

use super::{match_host, DomainSet, ProxyRule, Result};

static PROXY_DIRECTIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"var proxy = "PROXY ([^;]+);";"#).unwrap());

const DIRECT: &str = "DIRECT;";

const PAC_TEMPLATE: &str = r#"function FindProxyForURL(url, host) {
    var proxy = "PROXY PROXY_SERVER;";
    var direct = "DIRECT;";

    var domains = {
DOMAIN_LIST
    };

    var hasOwnProperty = Object.hasOwnProperty;

    var suffix;
    var pos = host.lastIndexOf('.');
    while(1) {
        suffix = host.substring(pos + 1);
        if (hasOwnProperty.call(domains, suffix)) {
            return proxy;
        }
        if (pos <= 0) {
            break;
        }
        pos = host.lastIndexOf('.', pos - 1);
    }
    return direct;
}"#;

/// Text of a PAC script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacDocument {
    content: String,
}

impl PacDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn into_string(self) -> String {
        self.content
    }

    /// Endpoint of the `var proxy = "PROXY <endpoint>;";` directive.
    pub fn proxy_endpoint(&self) -> Option<&str> {
        PROXY_DIRECTIVE
            .captures(&self.content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    pub fn domains(&self) -> DomainSet {
        DomainSet::from_pac_text(&self.content)
    }

    /// Evaluates the document's suffix walk for `host` without a JS runtime.
    pub fn find_proxy_for_host(&self, host: &str) -> String {
        let domains = self.domains();
        match (match_host(host, &domains).matched, self.proxy_endpoint()) {
            (true, Some(endpoint)) => format!("PROXY {};", endpoint),
            _ => DIRECT.to_string(),
        }
    }

    /// Structural checks: entry point present and braces balanced.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.content.contains("function FindProxyForURL(") {
            return Err("missing FindProxyForURL function".into());
        }
        let open = self.content.matches('{').count();
        let close = self.content.matches('}').count();
        if open != close {
            return Err(format!("unbalanced braces ({} open, {} close)", open, close));
        }
        Ok(())
    }
}

impl std::fmt::Display for PacDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.content)
    }
}

/// Renders the PAC script routing `domains` through `proxy`.
pub fn generate(proxy: &ProxyRule, domains: &DomainSet) -> PacDocument {
    let entries = domains
        .iter()
        .map(|domain| format!("        \"{}\": 1", domain))
        .collect::<Vec<_>>()
        .join(",\n");

    let content = PAC_TEMPLATE
        .replace("PROXY_SERVER", proxy.as_str())
        .replace("DOMAIN_LIST", &entries);
    PacDocument::new(content)
}

pub fn generate_from_str(proxy: &str, domains: &DomainSet) -> Result<PacDocument> {
    let rule = ProxyRule::parse(proxy)?;
    Ok(generate(&rule, domains))
}
