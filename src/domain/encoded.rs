use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::Value;
use tracing::{debug, error};

use super::rewrite::{bump, NUMBERED_DOMAIN};
use super::{HostUpdate, PacError, Result};

pub const VMESS_SCHEME: &str = "vmess://";

/// Share links are produced both with and without padding.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Bumps the numeric label of the `host` field inside a `vmess://` link.
///
/// Never fails: anything that cannot be decoded or rewritten yields
/// [`HostUpdate::Unchanged`].
pub fn update_host(encoded: &str, increment: i64) -> HostUpdate {
    match try_update_host(encoded, increment) {
        Ok(Some(updated)) => HostUpdate::Updated(updated),
        Ok(None) => HostUpdate::Unchanged,
        Err(e) => {
            error!("Failed to update vmess config: {}", e);
            HostUpdate::Unchanged
        }
    }
}

fn try_update_host(encoded: &str, increment: i64) -> Result<Option<String>> {
    let payload = encoded.trim();
    let (prefix, payload) = match payload.strip_prefix(VMESS_SCHEME) {
        Some(rest) => (VMESS_SCHEME, rest),
        None => ("", payload),
    };

    let raw = LENIENT
        .decode(payload)
        .map_err(|e| PacError::Decode(format!("invalid base64: {}", e)))?;
    let text = String::from_utf8(raw).map_err(|e| PacError::Decode(format!("invalid UTF-8: {}", e)))?;
    let mut record: Value =
        serde_json::from_str(&text).map_err(|e| PacError::Decode(format!("invalid JSON: {}", e)))?;

    let Some(host) = record.get("host").and_then(Value::as_str) else {
        debug!("vmess config has no host field, leaving it untouched");
        return Ok(None);
    };
    let Some(new_host) = bump_host(host, increment) else {
        debug!("host {} has no numbered label, leaving it untouched", host);
        return Ok(None);
    };

    record["host"] = Value::String(new_host);
    let json = serde_json::to_string(&record).map_err(|e| PacError::Decode(format!("cannot encode JSON: {}", e)))?;
    Ok(Some(format!("{}{}", prefix, STANDARD.encode(json))))
}

/// Rewrites a host anchored at its start, keeping any trailing text.
fn bump_host(host: &str, increment: i64) -> Option<String> {
    let caps = NUMBERED_DOMAIN.captures(host)?;
    let whole = caps.get(0)?;
    if whole.start() != 0 {
        return None;
    }
    let number = bump(&caps[2], increment)?;
    Some(format!("{}{}{}{}", &caps[1], number, &caps[3], &host[whole.end()..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(value: &Value) -> String {
        format!("{}{}", VMESS_SCHEME, STANDARD.encode(value.to_string()))
    }

    fn decode(link: &str) -> Value {
        let payload = link.strip_prefix(VMESS_SCHEME).unwrap();
        serde_json::from_slice(&STANDARD.decode(payload).unwrap()).unwrap()
    }

    #[test]
    fn test_update_host_increments_number() {
        let link = encode(&json!({"v": "2", "add": "1.2.3.4", "host": "node5.example.net", "port": 443}));
        let HostUpdate::Updated(updated) = update_host(&link, 2) else {
            panic!("expected an update");
        };
        let record = decode(&updated);
        assert_eq!(record["host"], "node7.example.net");
        assert_eq!(record["add"], "1.2.3.4");
        assert_eq!(record["port"], 443);
    }

    #[test]
    fn test_update_host_preserves_field_order() {
        let link = encode(&json!({"v": "2", "host": "node1.example.net", "id": "abc"}));
        let updated = update_host(&link, 1).into_value(&link);
        let payload = STANDARD.decode(updated.strip_prefix(VMESS_SCHEME).unwrap()).unwrap();
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            r#"{"v":"2","host":"node2.example.net","id":"abc"}"#
        );
    }

    #[test]
    fn test_missing_host_is_unchanged() {
        let link = encode(&json!({"v": "2", "add": "node5.example.net"}));
        assert_eq!(update_host(&link, 1), HostUpdate::Unchanged);
        assert_eq!(update_host(&link, 1).into_value(&link), link);
    }

    #[test]
    fn test_unnumbered_host_is_unchanged() {
        let link = encode(&json!({"host": "example.net"}));
        assert_eq!(update_host(&link, 1), HostUpdate::Unchanged);
        let link = encode(&json!({"host": "cdn-node5.example.net"}));
        assert_eq!(update_host(&link, 1), HostUpdate::Unchanged);
    }

    #[test]
    fn test_malformed_input_is_unchanged() {
        assert_eq!(update_host("vmess://not base64 at all!", 1), HostUpdate::Unchanged);
        let not_json = format!("{}{}", VMESS_SCHEME, STANDARD.encode("hello"));
        assert_eq!(update_host(&not_json, 1), HostUpdate::Unchanged);
        let not_utf8 = format!("{}{}", VMESS_SCHEME, STANDARD.encode([0xff, 0xfe, 0xfd]));
        assert_eq!(update_host(&not_utf8, 1), HostUpdate::Unchanged);
    }

    #[test]
    fn test_unpadded_payload_is_accepted() {
        let value = json!({"host": "n1.example.net"});
        let unpadded = format!(
            "{}{}",
            VMESS_SCHEME,
            STANDARD.encode(value.to_string()).trim_end_matches('=')
        );
        let updated = update_host(&unpadded, 1).into_value(&unpadded);
        assert_eq!(decode(&updated)["host"], "n2.example.net");
    }

    #[test]
    fn test_bump_host_keeps_port_suffix() {
        assert_eq!(bump_host("node5.example.net:8443", 1).as_deref(), Some("node6.example.net:8443"));
        assert_eq!(bump_host("5.example.net", 1), None);
    }
}
