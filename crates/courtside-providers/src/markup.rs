//! Regex-based scraping helpers for the providers' server-rendered pages.
//!
//! The sites serve small, loosely-formed HTML. These helpers extract only the
//! handful of shapes the providers rely on: hidden inputs, `name=value` pairs
//! embedded in scripts or links, `alert(...)` messages and table rows.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::error;

use crate::error::ProviderError;
use crate::provider::Token;

static INPUT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<input\b[^>]*>").expect("Invalid input tag regex"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)([a-z_:][-a-z0-9_:]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("Invalid attribute regex")
});

static QUERY_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[?&"'\s;(,])([A-Za-z_][A-Za-z0-9_]*)=([^&"'\s<>]*)"#)
        .expect("Invalid query pair regex")
});

static ALERT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)alert\(\s*(?:"([^"]*)"|'([^']*)')\s*\)"#).expect("Invalid alert regex")
});

static TABLE_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").expect("Invalid row regex"));

static TABLE_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<td\b[^>]*>(.*?)</td>").expect("Invalid cell regex"));

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid tag regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Returns the `value` of the `<input>` named `name`, entity-decoded the way a
/// browser would submit it.
pub fn hidden_input(html: &str, name: &str) -> Option<String> {
    INPUT_TAG.find_iter(html).find_map(|tag| {
        let attrs = attributes(tag.as_str());
        if attrs.get("name").map(String::as_str) == Some(name) {
            Some(decode_entities(attrs.get("value").map(String::as_str).unwrap_or_default()))
        } else {
            None
        }
    })
}

fn attributes(tag: &str) -> HashMap<String, String> {
    ATTRIBUTE
        .captures_iter(tag)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            (caps[1].to_ascii_lowercase(), value.to_string())
        })
        .collect()
}

/// Returns the raw value of a `name=value` pair embedded in markup, e.g. in a
/// script building a query string. The value ends at `&`, a quote,
/// whitespace or an angle bracket and is returned byte-for-byte.
pub fn query_param(html: &str, name: &str) -> Option<String> {
    QUERY_PAIR
        .captures_iter(html)
        .find(|caps| &caps[1] == name)
        .map(|caps| caps[2].to_string())
}

/// Looks for `name` as a hidden input first, then as an embedded pair.
pub fn extract_token(html: &str, name: &str) -> Option<Token> {
    hidden_input(html, name)
        .filter(|v| !v.is_empty())
        .map(Token::Field)
        .or_else(|| {
            query_param(html, name)
                .filter(|v| !v.is_empty())
                .map(Token::Encoded)
        })
}

/// Returns the first `alert('...')` message in a page.
pub fn alert_message(html: &str) -> Option<String> {
    ALERT.captures(html).map(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().replace("\\n", " ").trim().to_string())
            .unwrap_or_default()
    })
}

/// Returns the text of every `<td>` row. Rows without data cells (header
/// rows built from `<th>`) are skipped.
pub fn table_rows(html: &str) -> Vec<Vec<String>> {
    TABLE_ROW
        .captures_iter(html)
        .map(|row| {
            TABLE_CELL
                .captures_iter(&row[1])
                .map(|cell| strip_tags(&cell[1]))
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect()
}

/// Removes tags, decodes common entities and collapses whitespace.
pub fn strip_tags(html: &str) -> String {
    let text = TAG.replace_all(html, " ");
    let text = decode_entities(&text);
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Builds a [`MarkupShape`](crate::ProviderErrorCode::MarkupShape) error and
/// logs it at `error` with a dedicated `markup_shape` field.
pub fn shape_error(provider: &str, what: impl Into<String>) -> ProviderError {
    let what = what.into();
    error!(provider, markup_shape = %what, "Provider page no longer has the expected shape");
    ProviderError::markup_shape(what).with_provider(provider)
}

/// Decodes the handful of entities the sites emit.
pub fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Parses an amount such as `"12,000원"` into won.
pub fn parse_amount(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_input_in_any_attribute_order() {
        let html = r#"
            <form>
              <input type="hidden" value="A&amp;B" name="voStr">
              <input name='timeStr' type=hidden value='13:00~14:00~19~2코트'/>
            </form>"#;
        assert_eq!(hidden_input(html, "voStr").as_deref(), Some("A&B"));
        assert_eq!(
            hidden_input(html, "timeStr").as_deref(),
            Some("13:00~14:00~19~2코트")
        );
        assert!(hidden_input(html, "missing").is_none());
    }

    #[test]
    fn query_param_stops_at_separators() {
        let html = r#"<script>location.href = "/rent/save.do?voStr=abc&timeStr=13:00~14:00~19~2코트";</script>"#;
        assert_eq!(query_param(html, "voStr").as_deref(), Some("abc"));
        assert_eq!(
            query_param(html, "timeStr").as_deref(),
            Some("13:00~14:00~19~2코트")
        );
    }

    #[test]
    fn query_param_does_not_match_suffixes() {
        let html = "?myvoStr=wrong&voStr=right";
        assert_eq!(query_param(html, "voStr").as_deref(), Some("right"));
    }

    #[test]
    fn empty_tokens_are_missing() {
        let html = r#"<input type="hidden" name="voStr" value="">"#;
        assert!(extract_token(html, "voStr").is_none());
    }

    #[test]
    fn token_remembers_where_it_was_found() {
        let html = r#"
            <input type="hidden" name="voStr" value="id=7&amp;seq=2">
            <script>fnSave("timeStr=13%3A00~14%3A00");</script>"#;
        assert_eq!(
            extract_token(html, "voStr"),
            Some(Token::Field("id=7&seq=2".into()))
        );
        assert_eq!(
            extract_token(html, "timeStr"),
            Some(Token::Encoded("13%3A00~14%3A00".into()))
        );
    }

    #[test]
    fn alert_text_is_extracted() {
        let html = "<script>alert('이미 취소된 예약입니다.');history.back();</script>";
        assert_eq!(alert_message(html).as_deref(), Some("이미 취소된 예약입니다."));
        assert!(alert_message("<p>done</p>").is_none());
    }

    #[test]
    fn table_rows_skip_header() {
        let html = r#"
            <table>
              <tr><th>코트</th><th>시간</th><th>상태</th></tr>
              <tr><td>1코트</td><td>06:00&nbsp;~&nbsp;08:00</td><td><span class="on">예약가능</span></td></tr>
              <tr><td>2코트</td><td>08:00 ~ 10:00</td><td>예약완료</td></tr>
            </table>"#;
        let rows = table_rows(html);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["1코트", "06:00 ~ 08:00", "예약가능"]);
        assert_eq!(rows[1][2], "예약완료");
    }

    #[test]
    fn amounts_ignore_formatting() {
        assert_eq!(parse_amount("12,000원"), Some(12000));
        assert_eq!(parse_amount("무료"), None);
    }
}
