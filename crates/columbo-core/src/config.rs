use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::VerifyError;
use crate::fetch::FetchOptions;

/// How a fetch is tied to the connection that served it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributionMode {
    /// The transfer handle reports its own local port and remote IP.
    #[default]
    Direct,
    /// Diff this process's TCP connection table after each fetch. Sequential only.
    ConnectionTable,
}

/// Global configuration loaded from `~/.config/columbo/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumboConfig {
    /// Curl connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Total time allowed for one GET, in seconds.
    pub fetch_timeout_secs: u64,
    /// Bound on each forward or reverse DNS lookup, in seconds.
    pub dns_timeout_secs: u64,
    /// Follow 3xx responses (up to 10 hops). When false a redirect counts as a failed fetch.
    pub follow_redirects: bool,
    #[serde(default)]
    pub attribution: AttributionMode,
    /// Resource fetches in flight per page. Values above 1 need `attribution = "direct"`.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Optional User-Agent header.
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_concurrency() -> usize {
    1
}

impl Default for ColumboConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            fetch_timeout_secs: 30,
            dns_timeout_secs: 5,
            follow_redirects: true,
            attribution: AttributionMode::Direct,
            concurrency: 1,
            user_agent: None,
        }
    }
}

impl ColumboConfig {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            timeout: Duration::from_secs(self.fetch_timeout_secs),
            follow_redirects: self.follow_redirects,
            user_agent: self.user_agent.clone(),
            ..FetchOptions::default()
        }
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs)
    }

    /// Every timeout must be a positive bound: curl reads 0 as "no limit" and a zero DNS
    /// bound fails every lookup.
    pub fn validate(&self) -> Result<(), VerifyError> {
        for (key, value) in [
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("fetch_timeout_secs", self.fetch_timeout_secs),
            ("dns_timeout_secs", self.dns_timeout_secs),
        ] {
            if value == 0 {
                return Err(VerifyError::InvalidConfiguration(format!(
                    "{} must be at least 1",
                    key
                )));
            }
        }
        if self.concurrency == 0 {
            return Err(VerifyError::InvalidConfiguration(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("columbo")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ColumboConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ColumboConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: ColumboConfig = toml::from_str(&data)?;
    Ok(cfg)
}
