use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ConfigFile {
    pub urls: UrlConfig,
    #[serde(default)]
    pub rewards: RewardConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// Where the connection page is hosted, one per source mode.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct UrlConfig {
    pub production: String,
    pub alternate_host: String,
    pub local_development: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RewardConfig {
    #[serde(default = "default_welcome_bonus")]
    pub welcome_bonus: u64,
    #[serde(default = "default_gift_card_points")]
    pub gift_card_points: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BridgeConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_poll_window_ms")]
    pub poll_window_ms: u64,
    #[serde(default = "default_pending_key")]
    pub pending_key: String,
    #[serde(default = "default_install_badge_ms")]
    pub install_badge_ms: u64,
}

impl BridgeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_window(&self) -> Duration {
        Duration::from_millis(self.poll_window_ms)
    }

    pub fn install_badge(&self) -> Duration {
        Duration::from_millis(self.install_badge_ms)
    }
}

fn default_welcome_bonus() -> u64 {
    15
}

fn default_gift_card_points() -> u64 {
    18
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_poll_window_ms() -> u64 {
    60_000
}

fn default_pending_key() -> String {
    "pendingWalletAddress".to_string()
}

fn default_install_badge_ms() -> u64 {
    5_000
}

impl UrlConfig {
    fn all(&self) -> [&String; 3] {
        [&self.production, &self.alternate_host, &self.local_development]
    }

    /// Whether `page_url` is served from the same origin as one of the
    /// connection pages. Default ports compare equal to no port.
    pub fn is_connect_page(&self, page_url: &str) -> bool {
        let Ok(page) = Url::parse(page_url) else {
            return false;
        };
        let page = page.origin();
        self.all()
            .into_iter()
            .filter_map(|url| Url::parse(url).ok())
            .any(|url| url.origin() == page)
    }

    /// Browser match patterns covering the three hosts, ports dropped.
    /// Deduplicated, in production/alternate/local order.
    pub fn match_patterns(&self) -> Vec<String> {
        let mut patterns: Vec<String> = Vec::new();
        for url in self.all().into_iter().filter_map(|url| Url::parse(url).ok()) {
            let Some(host) = url.host_str() else {
                continue;
            };
            let pattern = format!("{}://{}/*", url.scheme(), host);
            if !patterns.contains(&pattern) {
                patterns.push(pattern);
            }
        }
        patterns
    }
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            production: "https://solana-wallet-extension.up.railway.app/wallet-connect.html".to_string(),
            alternate_host: "https://hoepeyemi.github.io/xtension/wallet-connect.html".to_string(),
            local_development: "http://localhost:3000/wallet-connect.html".to_string(),
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            welcome_bonus: default_welcome_bonus(),
            gift_card_points: default_gift_card_points(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            poll_window_ms: default_poll_window_ms(),
            pending_key: default_pending_key(),
            install_badge_ms: default_install_badge_ms(),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            urls: UrlConfig::default(),
            rewards: RewardConfig::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

impl ConfigFile {
    pub fn load(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).context(format!("Failed to read config file: {}", path))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a config. The extension embeds its config at
    /// build time and comes through here.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("production", &self.urls.production),
            ("alternate_host", &self.urls.alternate_host),
            ("local_development", &self.urls.local_development),
        ] {
            let parsed = Url::parse(url)
                .with_context(|| format!("urls.{} is not a valid URL: '{}'", name, url))?;
            if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
                anyhow::bail!("urls.{} must be an absolute http(s) URL, got '{}'", name, url);
            }
        }

        if self.bridge.poll_interval_ms == 0 {
            anyhow::bail!("bridge.poll_interval_ms must be greater than zero");
        }
        if self.bridge.poll_window_ms < self.bridge.poll_interval_ms {
            anyhow::bail!(
                "bridge.poll_window_ms ({}) must cover at least one poll interval ({})",
                self.bridge.poll_window_ms,
                self.bridge.poll_interval_ms
            );
        }
        if self.bridge.pending_key.trim().is_empty() {
            anyhow::bail!("bridge.pending_key must not be empty");
        }
        Ok(())
    }
}
