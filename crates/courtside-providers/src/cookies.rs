//! Per-session cookie jar.
//!
//! Cookies merge additively by name: a later value for the same name
//! overwrites the earlier one, but nothing is ever removed. The sites expire
//! some intermediate cookies during the login redirect chain while still
//! expecting them on the next request, so deletions are ignored on purpose.

use std::collections::BTreeMap;

use crate::transport::HttpResponse;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the `name=value` pair of one `Set-Cookie` header.
    ///
    /// Returns false if the header has no usable pair.
    pub fn store(&mut self, set_cookie: &str) -> bool {
        let pair = set_cookie.split(';').next().unwrap_or_default();
        let Some((name, value)) = pair.split_once('=') else {
            return false;
        };
        let name = name.trim();
        let value = value.trim().trim_matches('"');
        if name.is_empty() || value.is_empty() {
            return false;
        }
        self.cookies.insert(name.to_string(), value.to_string());
        true
    }

    /// Stores every cookie set by `response`; returns how many were stored.
    pub fn absorb(&mut self, response: &HttpResponse) -> usize {
        response
            .set_cookies()
            .filter(|header| self.store(header))
            .count()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Value for a `Cookie` request header, or `None` when the jar is empty.
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_value_overwrites() {
        let mut jar = CookieJar::new();
        assert!(jar.store("JSESSIONID=first; Path=/; HttpOnly"));
        assert!(jar.store("JSESSIONID=second; Path=/"));
        assert_eq!(jar.get("JSESSIONID"), Some("second"));
        assert_eq!(jar.len(), 1);
    }

    #[test]
    fn deletions_are_ignored() {
        let mut jar = CookieJar::new();
        jar.store("WMONID=keep");
        assert!(!jar.store("WMONID=; Max-Age=0"));
        assert_eq!(jar.get("WMONID"), Some("keep"));
    }

    #[test]
    fn absorbs_every_hop() {
        let mut jar = CookieJar::new();
        let hop1 = HttpResponse::new(302, "").with_header("Set-Cookie", "A=1");
        let hop2 = HttpResponse::new(302, "")
            .with_header("Set-Cookie", "B=2")
            .with_header("Set-Cookie", "A=3");
        assert_eq!(jar.absorb(&hop1), 1);
        assert_eq!(jar.absorb(&hop2), 2);
        assert_eq!(jar.header_value().unwrap(), "A=3; B=2");
    }

    #[test]
    fn empty_jar_sends_no_header() {
        let mut jar = CookieJar::new();
        assert!(jar.header_value().is_none());
        assert!(!jar.store("garbage"));
        assert!(jar.is_empty());
    }
}
