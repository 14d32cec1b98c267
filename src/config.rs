use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://127.0.0.1:27124";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub obsidian: ObsidianConfig,
    pub readiness: ReadinessConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ObsidianConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub process_name: String,
    pub launch_uri: String,
}

impl Default for ObsidianConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            process_name: default_process_name().to_string(),
            launch_uri: "obsidian://open".to_string(),
        }
    }
}

fn default_process_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "Obsidian.exe"
    } else if cfg!(target_os = "macos") {
        "Obsidian"
    } else {
        "obsidian"
    }
}

/// Launch-and-poll policy for the companion app.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReadinessConfig {
    pub settle_delay_secs: u64,
    pub backoff_secs: u64,
    pub max_attempts: u32,
    pub probe_timeout_secs: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            settle_delay_secs: 5,
            backoff_secs: 2,
            max_attempts: 10,
            probe_timeout_secs: 2,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Bearer token plus the endpoint it authenticates against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub base_url: String,
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist. Environment variables override file values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Config::default()
        };

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, var: F) {
        if let Some(key) = var("OBSIDIAN_API_KEY") {
            self.obsidian.api_key = Some(key);
        }
        if let Some(url) = var("OBSIDIAN_BASE_URL") {
            self.obsidian.base_url = url;
        }
    }

    /// The credential pair, or `None` when no usable API key is configured.
    pub fn credentials(&self) -> Option<Credentials> {
        let api_key = self.obsidian.api_key.as_deref()?.trim();
        if api_key.is_empty() {
            return None;
        }
        Some(Credentials {
            api_key: api_key.to_string(),
            base_url: self.obsidian.base_url.trim_end_matches('/').to_string(),
        })
    }
}
