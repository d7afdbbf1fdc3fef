//! Provider connection configuration.

use std::time::Duration;

use url::Url;

/// Connection settings for one booking site.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Site root, e.g. `https://reservation.example.go.kr/`.
    pub base_url: Url,

    /// Whether to verify TLS certificates.
    pub verify_tls: bool,

    /// Per-request timeout.
    pub timeout: Duration,

    /// User agent string. The legacy sites reject unknown agents, so this
    /// defaults to a desktop browser string.
    pub user_agent: String,

    /// Maximum redirect hops followed during login.
    pub max_redirects: usize,
}

impl ProviderConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

    pub const DEFAULT_MAX_REDIRECTS: usize = 10;

    pub const DEFAULT_USER_AGENT: &'static str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

    /// Creates a configuration for the site at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self {
            base_url,
            verify_tls: true,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: Self::DEFAULT_USER_AGENT.to_string(),
            max_redirects: Self::DEFAULT_MAX_REDIRECTS,
        })
    }

    /// Disables TLS verification. Some district sites serve incomplete
    /// certificate chains.
    pub fn with_insecure_tls(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// Joins a site-relative path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}{}", self.base_url, path.trim_start_matches('/')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ProviderConfig::new("https://a.test/").unwrap();
        assert!(config.verify_tls);
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert_eq!(config.max_redirects, 10);
    }

    #[test]
    fn builder_methods() {
        let config = ProviderConfig::new("https://a.test/")
            .unwrap()
            .with_insecure_tls()
            .with_timeout(Duration::from_secs(15))
            .with_user_agent("courtside-test")
            .with_max_redirects(3);
        assert!(!config.verify_tls);
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.user_agent, "courtside-test");
        assert_eq!(config.max_redirects, 3);
    }

    #[test]
    fn url_joining() {
        let config = ProviderConfig::new("https://a.test/rent/").unwrap();
        assert_eq!(config.url("/login.do"), "https://a.test/rent/login.do");
        let config = ProviderConfig::new("https://a.test").unwrap();
        assert_eq!(config.url("/login.do"), "https://a.test/login.do");
    }

    #[test]
    fn invalid_url_returns_error() {
        assert!(ProviderConfig::new("not a url").is_err());
    }
}
