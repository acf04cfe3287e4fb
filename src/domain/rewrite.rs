//! Pattern-based substitutions applied to PAC and domain-list text.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::{Captures, NoExpand, Regex};

static PROXY_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"var proxy = "PROXY [^;]+;";"#).unwrap());
static LOCALIZED_STAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"北京时间\d{4}年\d{2}月\d{2}日\d{2}点\d{2}分更新").unwrap());
static UPDATED_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"// Updated: [^\r\n]*").unwrap());
pub(crate) static NUMBERED_DOMAIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-zA-Z]+)(\d+)(\.[\w\.]+)").unwrap());

/// How a freshly inserted timestamp header is commented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `// ...`, for PAC scripts.
    Script,
    /// `<!-- ... -->`, for markdown domain lists.
    Markup,
}

pub fn format_stamp(now: NaiveDateTime) -> String {
    format!("北京时间{}更新", now.format("%Y年%m月%d日%H点%M分"))
}

/// Replaces the first proxy directive. `None` when there is none.
pub fn replace_proxy(content: &str, new_proxy: &str) -> Option<String> {
    if !PROXY_LINE.is_match(content) {
        return None;
    }
    let line = format!(r#"var proxy = "PROXY {};";"#, new_proxy);
    Some(PROXY_LINE.replace(content, NoExpand(&line)).into_owned())
}

/// Rewrites every recognized timestamp to `stamp`, or prepends a header
/// carrying it when the content has none.
pub fn refresh_timestamp(content: &str, stamp: &str, style: CommentStyle) -> String {
    let has_stamp = LOCALIZED_STAMP.is_match(content) || UPDATED_COMMENT.is_match(content);
    if !has_stamp {
        let header = match style {
            CommentStyle::Script => format!("// PAC Configuration - Updated: {}\n", stamp),
            CommentStyle::Markup => format!("<!-- Domain list - Updated: {} -->\n", stamp),
        };
        return header + content;
    }

    let content = LOCALIZED_STAMP.replace_all(content, NoExpand(stamp));
    let updated = format!("// Updated: {}", stamp);
    UPDATED_COMMENT.replace_all(&content, NoExpand(&updated)).into_owned()
}

/// Adds `increment` to the digit run of every `<letters><digits>.<suffix>`
/// token. Returns the new content and the number of tokens rewritten.
///
/// Tokens whose number would overflow or turn negative are left as is.
pub fn increment_domain_numbers(content: &str, increment: i64) -> (String, usize) {
    let mut count = 0usize;
    let replaced = NUMBERED_DOMAIN.replace_all(content, |caps: &Captures| match bump(&caps[2], increment) {
        Some(number) => {
            count += 1;
            format!("{}{}{}", &caps[1], number, &caps[3])
        }
        None => caps[0].to_string(),
    });
    (replaced.into_owned(), count)
}

/// `digits + increment`, `None` if out of range.
pub(crate) fn bump(digits: &str, increment: i64) -> Option<u64> {
    let number: u64 = digits.parse().ok()?;
    if increment >= 0 {
        number.checked_add(increment as u64)
    } else {
        number.checked_sub(increment.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamp() -> String {
        let now = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 0)
            .unwrap();
        format_stamp(now)
    }

    #[test]
    fn test_format_stamp() {
        assert_eq!(stamp(), "北京时间2024年03月09日07点05分更新");
    }

    #[test]
    fn test_replace_proxy_first_occurrence_only() {
        let content = "var proxy = \"PROXY 1.1.1.1:443;\";\nvar proxy = \"PROXY 2.2.2.2:443;\";\n";
        let updated = replace_proxy(content, "9.9.9.9:8443").unwrap();
        assert_eq!(
            updated,
            "var proxy = \"PROXY 9.9.9.9:8443;\";\nvar proxy = \"PROXY 2.2.2.2:443;\";\n"
        );
    }

    #[test]
    fn test_replace_proxy_is_literal() {
        let content = "var proxy = \"PROXY 1.1.1.1:443;\";";
        let updated = replace_proxy(content, "$1.example:80").unwrap();
        assert_eq!(updated, "var proxy = \"PROXY $1.example:80;\";");
    }

    #[test]
    fn test_replace_proxy_is_idempotent() {
        let content = "function FindProxyForURL(url, host) {\n    var proxy = \"PROXY 1.1.1.1:443;\";\n}";
        let once = replace_proxy(content, "[::1]:8080").unwrap();
        let twice = replace_proxy(&once, "[::1]:8080").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_replace_proxy_without_directive() {
        assert_eq!(replace_proxy("function FindProxyForURL() {}", "1.1.1.1:1"), None);
    }

    #[test]
    fn test_refresh_timestamp_replaces_localized_form() {
        let content = "// 北京时间2020年01月01日00点00分更新\nrest";
        let updated = refresh_timestamp(content, &stamp(), CommentStyle::Script);
        assert_eq!(updated, "// 北京时间2024年03月09日07点05分更新\nrest");
    }

    #[test]
    fn test_refresh_timestamp_replaces_updated_comment() {
        let content = "// Updated: yesterday at noon\nfunction FindProxyForURL(url, host) {}";
        let updated = refresh_timestamp(content, &stamp(), CommentStyle::Script);
        assert_eq!(
            updated,
            "// Updated: 北京时间2024年03月09日07点05分更新\nfunction FindProxyForURL(url, host) {}"
        );
    }

    #[test]
    fn test_refresh_timestamp_keeps_crlf_line_endings() {
        let content = "// Updated: yesterday\r\nfunction FindProxyForURL(url, host) {}\r\n";
        let updated = refresh_timestamp(content, &stamp(), CommentStyle::Script);
        assert_eq!(
            updated,
            "// Updated: 北京时间2024年03月09日07点05分更新\r\nfunction FindProxyForURL(url, host) {}\r\n"
        );
    }

    #[test]
    fn test_refresh_timestamp_prepends_header() {
        let updated = refresh_timestamp("body", &stamp(), CommentStyle::Script);
        assert_eq!(updated, "// PAC Configuration - Updated: 北京时间2024年03月09日07点05分更新\nbody");
        let updated = refresh_timestamp("# Domains", &stamp(), CommentStyle::Markup);
        assert_eq!(updated, "<!-- Domain list - Updated: 北京时间2024年03月09日07点05分更新 -->\n# Domains");
    }

    #[test]
    fn test_refresh_timestamp_keeps_single_stamp() {
        let first = refresh_timestamp("body", &stamp(), CommentStyle::Script);
        let second = refresh_timestamp(&first, &stamp(), CommentStyle::Script);
        assert_eq!(first, second);
        assert_eq!(second.matches("北京时间").count(), 1);
    }

    #[test]
    fn test_increment_domain_numbers() {
        let (updated, count) = increment_domain_numbers("fan123.example.com", 1);
        assert_eq!(updated, "fan124.example.com");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_increment_every_match() {
        let content = "- fan9.example.com\n- node41.cdn.net and plain.example.com\n- abc12def3.test.org";
        let (updated, count) = increment_domain_numbers(content, 2);
        assert_eq!(
            updated,
            "- fan11.example.com\n- node43.cdn.net and plain.example.com\n- abc12def5.test.org"
        );
        assert_eq!(count, 3);
    }

    #[test]
    fn test_increment_zero_keeps_digits() {
        let (updated, count) = increment_domain_numbers("fan123.example.com", 0);
        assert_eq!(updated, "fan123.example.com");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_increment_drops_leading_zeros() {
        let (updated, _) = increment_domain_numbers("fan007.example.com", 1);
        assert_eq!(updated, "fan8.example.com");
    }

    #[test]
    fn test_increment_out_of_range_is_skipped() {
        let (updated, count) = increment_domain_numbers("fan0.example.com", -1);
        assert_eq!(updated, "fan0.example.com");
        assert_eq!(count, 0);
        let huge = "fan99999999999999999999999.example.com";
        let (updated, count) = increment_domain_numbers(huge, 1);
        assert_eq!(updated, huge);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_count_reflects_original_matches() {
        // A rewritten token must not be recounted against the new content.
        let (updated, count) = increment_domain_numbers("a9.x a99.y", 1);
        assert_eq!(updated, "a10.x a100.y");
        assert_eq!(count, 2);
    }
}
