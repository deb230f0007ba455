use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const DEFAULT_DOMAINS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "youtu.be",
    "m.youtu.be",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub download: DownloadConfig,
    pub domains: AllowedDomains,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn get_logging_format(&self) -> &str {
        &self.logging.format
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory with the browser frontend, served for non-API paths.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            static_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BackendConfig {
    /// Path or name of the yt-dlp executable.
    pub binary: String,
    pub info_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub socket_timeout_secs: u64,
    pub fragment_retries: u32,
    /// `player_client` value used for the single retry after a bot challenge.
    pub alternate_player_client: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            info_timeout_secs: 60,
            download_timeout_secs: 1800,
            socket_timeout_secs: 60,
            fragment_retries: 3,
            alternate_player_client: "tv,web_safari".to_string(),
        }
    }
}

impl BackendConfig {
    pub fn info_timeout(&self) -> Duration {
        Duration::from_secs(self.info_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DownloadConfig {
    /// Container used when a video-only stream is merged with audio.
    pub merge_container: String,
    /// Parent of the per-request scratch directories. Falls back to the
    /// system temp dir.
    pub scratch_root: Option<PathBuf>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            merge_container: "mkv".to_string(),
            scratch_root: None,
        }
    }
}

impl DownloadConfig {
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AllowedDomains {
    pub allowed: Vec<String>,
}

impl Default for AllowedDomains {
    fn default() -> Self {
        Self {
            allowed: DEFAULT_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl AllowedDomains {
    /// Checks the host of `url` against the allow-list. A missing scheme is
    /// treated as https; subdomains of allowed hosts are accepted.
    pub fn is_supported_url(&self, url: &str) -> bool {
        if url.is_empty() {
            return false;
        }

        let url = with_scheme(url);
        let host = match url::Url::parse(&url) {
            Ok(parsed) => match parsed.host_str() {
                Some(host) => host.to_lowercase(),
                None => return false,
            },
            Err(e) => {
                warn!("URL parsing/validation error for '{}': {}", url, e);
                return false;
            }
        };

        self.allowed.iter().any(|supported| {
            let supported = supported.to_lowercase();
            host == supported || host.ends_with(&format!(".{}", supported))
        })
    }
}

/// Prefixes `https://` when the URL carries no http(s) scheme.
pub fn with_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// "json" or "text"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
        }
    }
}
