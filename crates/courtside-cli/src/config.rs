//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/courtside/config.toml` by default.
//!
//! Site credentials (`id`, `password`) support secret references:
//! - `pass::path/in/store`, resolved via `pass show`
//! - `env::VAR_NAME`, resolved from the environment
//! - plain text, used as-is
//!
//! ```toml
//! [nowon]
//! base_url = "https://nowon.example.kr/"
//! id = "member"
//! password = "pass::courtside/nowon"
//!
//! [dobong]
//! base_url = "https://dobong.example.kr/"
//! id = "member"
//! password = "env::DOBONG_PASSWORD"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use courtside_core::{Court, CourtDirectory, Credential, CredentialSet, Facility, Region};
use courtside_engine::{BookingOptions, CrawlConfig, ProviderSet, RetryPolicy};
use courtside_providers::{CourtProvider, DobongProvider, NowonProvider, ProviderConfig};
use serde::{Deserialize, Serialize};

use crate::secret;

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the courtside client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Provider A (Nowon) site.
    pub nowon: Option<SiteSettings>,

    /// Provider B (Dobong) site.
    pub dobong: Option<SiteSettings>,

    /// HTTP settings shared by both sites.
    pub http: HttpSettings,

    /// Retry and crawl settings.
    pub crawl: CrawlSettings,

    /// Booking settings.
    pub booking: BookingSettings,

    /// Snapshot cache settings.
    pub cache: CacheSettings,

    /// Facilities added to, or replacing, the built-in directory.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facilities: Vec<Facility>,

    /// Courts added to, or replacing, the built-in directory.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub courts: Vec<Court>,
}

/// One booking site and the member login for it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteSettings {
    /// Site root URL.
    pub base_url: Option<String>,

    /// Member id (supports `pass::` and `env::` prefixes).
    pub id: Option<String>,

    /// Member password (supports `pass::` and `env::` prefixes).
    pub password: Option<String>,
}

/// HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-request timeout in seconds.
    pub timeout: u64,

    /// Override the browser user agent.
    pub user_agent: Option<String>,

    /// Skip TLS certificate verification.
    pub insecure_tls: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: ProviderConfig::DEFAULT_TIMEOUT_SECS,
            user_agent: None,
            insecure_tls: false,
        }
    }
}

/// Retry and crawl settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    /// Concurrent per-date requests (3-5).
    pub concurrency: usize,

    /// Attempts for retryable requests, including the first.
    pub max_attempts: u32,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            concurrency: CrawlConfig::DEFAULT_CONCURRENCY,
            max_attempts: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Booking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingSettings {
    /// Ask the sites to send a reservation alert after booking.
    pub send_alerts: bool,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self { send_alerts: true }
    }
}

/// Snapshot cache settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Directory for monthly snapshots.
    pub dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("courtside")
    }

    /// Returns the default snapshot cache directory.
    pub fn default_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("courtside")
    }

    /// The snapshot cache directory in use.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache.dir.clone().unwrap_or_else(Self::default_cache_dir)
    }

    pub fn site(&self, region: Region) -> Option<&SiteSettings> {
        match region {
            Region::A => self.nowon.as_ref(),
            Region::B => self.dobong.as_ref(),
        }
    }

    /// The court directory: built-in courts plus any configured ones.
    pub fn directory(&self) -> CourtDirectory {
        CourtDirectory::builtin().extend(self.facilities.clone(), self.courts.clone())
    }

    /// Resolves the member login for `region`, if one is configured.
    pub fn credential(&self, region: Region) -> Result<Option<Credential>, String> {
        let Some(site) = self.site(region) else {
            return Ok(None);
        };
        let section = region.provider_name();
        match (site.id.as_deref(), site.password.as_deref()) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(format!("password is missing from [{}] in config.toml", section)),
            (None, Some(_)) => Err(format!("id is missing from [{}] in config.toml", section)),
            (Some(id), Some(password)) => secret::resolve_login(region, id, password)
                .map(Some)
                .map_err(|e| e.to_string()),
        }
    }

    /// Resolves every configured member login.
    pub fn credentials(&self) -> Result<CredentialSet, String> {
        let mut set = CredentialSet::new();
        for region in Region::ALL {
            if let Some(credential) = self.credential(region)? {
                set = set.with(credential);
            }
        }
        Ok(set)
    }

    /// Connection settings for `region`, if its site is configured.
    pub fn provider_config(&self, region: Region) -> Result<Option<ProviderConfig>, String> {
        let Some(base_url) = self.site(region).and_then(|s| s.base_url.as_deref()) else {
            return Ok(None);
        };
        let mut config = ProviderConfig::new(base_url)
            .map_err(|e| format!("invalid {}.base_url {:?}: {}", region.provider_name(), base_url, e))?
            .with_timeout(Duration::from_secs(self.http.timeout.max(1)));
        if let Some(ref agent) = self.http.user_agent {
            config = config.with_user_agent(agent);
        }
        if self.http.insecure_tls {
            config = config.with_insecure_tls();
        }
        Ok(Some(config))
    }

    /// Builds a provider for every configured site.
    pub fn providers(&self, directory: &Arc<CourtDirectory>) -> Result<ProviderSet, String> {
        let mut set = ProviderSet::new();
        for region in Region::ALL {
            let Some(config) = self.provider_config(region)? else {
                continue;
            };
            let provider: Arc<dyn CourtProvider> = match region {
                Region::A => Arc::new(
                    NowonProvider::new(config, Arc::clone(directory)).map_err(|e| e.to_string())?,
                ),
                Region::B => Arc::new(
                    DobongProvider::new(config, Arc::clone(directory)).map_err(|e| e.to_string())?,
                ),
            };
            set = set.with(provider);
        }
        if set.is_empty() {
            return Err(format!(
                "no booking site configured. Add to {}:\n  \
                 [nowon]\n  \
                 base_url = \"https://...\"\n  \
                 id = \"member\"\n  \
                 password = \"env::NOWON_PASSWORD\"",
                Self::default_path().display()
            ));
        }
        Ok(set)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.crawl.max_attempts)
    }

    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig::default()
            .with_concurrency(self.crawl.concurrency)
            .with_retry(self.retry_policy())
    }

    pub fn booking_options(&self) -> BookingOptions {
        BookingOptions::default()
            .with_alerts(self.booking.send_alerts)
            .with_retry(self.retry_policy())
    }

    /// A copy safe to print: plain-text passwords are masked, secret
    /// references are kept.
    pub fn redacted(&self) -> Self {
        let mask = |site: &Option<SiteSettings>| {
            site.clone().map(|mut s| {
                s.password = s.password.as_deref().map(secret::redact);
                s
            })
        };
        Self {
            nowon: mask(&self.nowon),
            dobong: mask(&self.dobong),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[nowon]
base_url = "https://nowon.test/"
id = "kim"
password = "plain-secret"

[dobong]
base_url = "https://dobong.test/"
id = "lee"
password = "env::_COURTSIDE_TEST_DOBONG_PW"

[http]
timeout = 30
insecure_tls = true

[crawl]
concurrency = 9

[booking]
send_alerts = false

[[courts]]
court_id = "bulam-5"
facility = "BULAM"
provider_code = "22"
provider_name = "5코트"
label = "5번"
"#;

    #[test]
    fn parses_sample() {
        let config: ClientConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.http.timeout, 30);
        assert!(!config.booking_options().send_alerts);
        assert_eq!(config.crawl_config().concurrency, CrawlConfig::MAX_CONCURRENCY);

        let provider = config.provider_config(Region::A).unwrap().unwrap();
        assert_eq!(provider.timeout, Duration::from_secs(30));
        assert!(!provider.verify_tls);
    }

    #[test]
    fn empty_file_is_default() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert!(config.nowon.is_none());
        assert!(config.booking.send_alerts);
        assert_eq!(config.http.timeout, ProviderConfig::DEFAULT_TIMEOUT_SECS);
        assert!(config.credentials().unwrap().for_region(Region::A).is_none());
        assert!(config.providers(&Arc::new(config.directory())).is_err());
    }

    #[test]
    fn credentials_resolve_references() {
        unsafe {
            std::env::set_var("_COURTSIDE_TEST_DOBONG_PW", "from-env");
        }
        let config: ClientConfig = toml::from_str(SAMPLE).unwrap();
        let credentials = config.credentials().unwrap();
        unsafe {
            std::env::remove_var("_COURTSIDE_TEST_DOBONG_PW");
        }

        let nowon = credentials.for_region(Region::A).unwrap();
        assert_eq!(nowon.id, "kim");
        assert_eq!(nowon.password(), "plain-secret");
        assert_eq!(credentials.for_region(Region::B).unwrap().password(), "from-env");
    }

    #[test]
    fn half_configured_login_errors() {
        let config: ClientConfig = toml::from_str("[nowon]\nid = \"kim\"\n").unwrap();
        let err = config.credential(Region::A).unwrap_err();
        assert!(err.contains("password is missing from [nowon]"));
    }

    #[test]
    fn unresolvable_reference_names_the_section() {
        let config: ClientConfig =
            toml::from_str("[dobong]\nid = \"lee\"\npassword = \"env::_COURTSIDE_CONFIG_UNSET\"\n")
                .unwrap();
        let err = config.credentials().unwrap_err();
        assert!(err.starts_with("cannot resolve dobong.password"));
    }

    #[test]
    fn invalid_base_url_errors() {
        let config: ClientConfig = toml::from_str("[dobong]\nbase_url = \"not a url\"\n").unwrap();
        assert!(config.provider_config(Region::B).unwrap_err().contains("dobong.base_url"));
    }

    #[test]
    fn redaction_masks_only_plain_passwords() {
        let config: ClientConfig = toml::from_str(SAMPLE).unwrap();
        let shown = toml::to_string_pretty(&config.redacted()).unwrap();
        assert!(!shown.contains("plain-secret"));
        assert!(shown.contains("env::_COURTSIDE_TEST_DOBONG_PW"));
    }

    #[test]
    fn configured_courts_extend_the_directory() {
        let config: ClientConfig = toml::from_str(SAMPLE).unwrap();
        let directory = config.directory();
        assert_eq!(directory.court("bulam-5").unwrap().label, "5번");
        assert!(directory.court("bulam-1").is_some());
    }
}
