use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root registry server used for bare labels such as `com`.
pub const IANA_WHOIS_SERVER: &str = "whois.iana.org";
pub const WHOIS_PORT: u16 = 43;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 5;

/// Registry wording that signals several records matched the query.
pub const DISAMBIGUATION_MARKER: &str = "To single out one record";
/// Prefix asking a registry for the exact record only.
pub const EXACT_MATCH_PREFIX: &str = "=";
/// Line prefix a registry uses to point at the registrar's server.
pub const REFERRAL_MARKER: &str = "Whois Server: ";
/// Referral scanning starts at the first occurrence of this.
pub const REFERRAL_ANCHOR: &str = "Domain Name: ";

#[derive(Debug, Clone)]
pub struct Config {
    /// Per-attempt bound on each round-trip.
    pub whois_timeout: Duration,
    pub whois_port: u16,
    pub root_server: String,
    pub max_response_size: usize,
    pub buffer_size: usize,
    pub max_referrals: usize,
    pub concurrent_referrals: bool,
    pub disambiguation_marker: String,
    pub referral_marker: String,
    pub referral_anchor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigData {
    pub whois_timeout_seconds: u64,
    pub whois_port: u16,
    pub root_server: String,
    pub max_response_size: usize,
    pub buffer_size: usize,
    pub max_referrals: usize,
    pub concurrent_referrals: bool,
    pub disambiguation_marker: String,
    pub referral_marker: String,
    pub referral_anchor: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            whois_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            whois_port: WHOIS_PORT,
            root_server: IANA_WHOIS_SERVER.to_string(),
            max_response_size: 1024 * 1024,
            buffer_size: 8192,
            max_referrals: 10,
            concurrent_referrals: false,
            disambiguation_marker: DISAMBIGUATION_MARKER.to_string(),
            referral_marker: REFERRAL_MARKER.to_string(),
            referral_anchor: REFERRAL_ANCHOR.to_string(),
        }
    }
}

impl Config {
    /// Defaults overlaid with any environment overrides.
    pub fn load() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();

        let mut settings = config::Config::builder()
            .set_default("whois_timeout_seconds", defaults.whois_timeout.as_secs())?
            .set_default("whois_port", defaults.whois_port as i64)?
            .set_default("root_server", defaults.root_server)?
            .set_default("max_response_size", defaults.max_response_size as i64)?
            .set_default("buffer_size", defaults.buffer_size as i64)?
            .set_default("max_referrals", defaults.max_referrals as i64)?
            .set_default("concurrent_referrals", defaults.concurrent_referrals)?
            .set_default("disambiguation_marker", defaults.disambiguation_marker)?
            .set_default("referral_marker", defaults.referral_marker)?
            .set_default("referral_anchor", defaults.referral_anchor)?;

        settings = Self::apply_env_overrides(settings)?;

        let data: ConfigData = settings.build()?.try_deserialize()?;

        Ok(Config {
            whois_timeout: Duration::from_secs(data.whois_timeout_seconds),
            whois_port: data.whois_port,
            root_server: data.root_server,
            max_response_size: data.max_response_size,
            buffer_size: data.buffer_size.max(512),
            max_referrals: data.max_referrals,
            concurrent_referrals: data.concurrent_referrals,
            disambiguation_marker: data.disambiguation_marker,
            referral_marker: data.referral_marker,
            referral_anchor: data.referral_anchor,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.whois_timeout
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.whois_timeout = timeout;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.whois_port = port;
        self
    }

    pub fn with_root_server(mut self, server: impl Into<String>) -> Self {
        self.root_server = server.into();
        self
    }

    pub fn with_max_referrals(mut self, max_referrals: usize) -> Self {
        self.max_referrals = max_referrals;
        self
    }

    pub fn with_concurrent_referrals(mut self, enabled: bool) -> Self {
        self.concurrent_referrals = enabled;
        self
    }

    fn apply_env_overrides(
        mut settings: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        let env_mappings = [
            ("WHOIS_TIMEOUT_SECONDS", "whois_timeout_seconds"),
            ("WHOIS_TIMEOUT", "whois_timeout_seconds"),
            ("WHOIS_PORT", "whois_port"),
            ("WHOIS_ROOT_SERVER", "root_server"),
            ("MAX_RESPONSE_SIZE", "max_response_size"),
            ("BUFFER_SIZE", "buffer_size"),
            ("MAX_REFERRALS", "max_referrals"),
            ("CONCURRENT_REFERRALS", "concurrent_referrals"),
        ];

        for (env_var, config_key) in env_mappings {
            if let Ok(value) = std::env::var(env_var) {
                settings = settings.set_override(config_key, value)?;
            }
        }

        Ok(settings)
    }
}
