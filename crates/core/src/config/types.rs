use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::library::MediaKind;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("could not parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub indexers: Vec<IndexerConfig>,
    #[serde(default)]
    pub download_clients: Vec<DownloadClientConfig>,
    #[serde(default)]
    pub tasks: Vec<TaskOverrideConfig>,
    #[serde(default)]
    pub rss: RssConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub blacklist: BlacklistConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub rate_limits: RateLimitsConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Optional static API key; when set, requests must carry it in `X-Api-Key`.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: None,
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8686
}

/// Library layout configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LibraryConfig {
    #[serde(default)]
    pub root_folders: Vec<RootFolderConfig>,
    /// Create configured root folders at startup instead of rejecting them.
    #[serde(default)]
    pub create_missing_root_folders: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RootFolderConfig {
    pub path: PathBuf,
    pub media_type: MediaKind,
}

/// A Newznab-compatible indexer endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexerConfig {
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    /// Newznab category ids to query; empty means the default superset.
    #[serde(default)]
    pub categories: Vec<u32>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub supports_rss: bool,
    #[serde(default = "default_indexer_priority")]
    pub priority: i32,
}

fn default_indexer_priority() -> i32 {
    25
}

/// Supported download client backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadClientKind {
    Sabnzbd,
}

/// An external download client (grabber) the engine hands releases to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadClientConfig {
    pub id: String,
    pub name: String,
    pub kind: DownloadClientKind,
    pub host: String,
    pub port: u16,
    pub api_key: String,
    #[serde(default)]
    pub use_ssl: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_client_priority")]
    pub priority: i32,
    #[serde(default)]
    pub remove_completed: bool,
    #[serde(default)]
    pub remove_failed: bool,
    /// Path prefix as the remote client reports it.
    #[serde(default)]
    pub remote_path: Option<String>,
    /// Local mount point the remote prefix maps to.
    #[serde(default)]
    pub local_path: Option<String>,
    /// Category to submit jobs under.
    #[serde(default)]
    pub category: Option<String>,
}

fn default_client_priority() -> i32 {
    1
}

impl DownloadClientConfig {
    /// Base URL of the client's API.
    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

/// Per-task override of the scheduler defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskOverrideConfig {
    /// Task type name, e.g. `rss_sync`.
    pub task: String,
    #[serde(default)]
    pub interval_minutes: Option<i64>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// RSS sync tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RssConfig {
    /// Maximum releases requested per indexer feed.
    #[serde(default = "default_rss_limit")]
    pub limit: u32,
    /// Cap on wanted episodes loaded per cycle to bound match cost.
    #[serde(default = "default_episode_limit")]
    pub episode_limit: i64,
    /// Pause after each successful grab.
    #[serde(default = "default_grab_delay_ms")]
    pub grab_delay_ms: u64,
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            limit: default_rss_limit(),
            episode_limit: default_episode_limit(),
            grab_delay_ms: default_grab_delay_ms(),
        }
    }
}

fn default_rss_limit() -> u32 {
    100
}

fn default_episode_limit() -> i64 {
    50
}

fn default_grab_delay_ms() -> u64 {
    2000
}

/// Wanted-items search tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Wanted items searched per cycle across all media kinds.
    #[serde(default = "default_search_items")]
    pub items_per_cycle: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            items_per_cycle: default_search_items(),
        }
    }
}

fn default_search_items() -> usize {
    20
}

/// Completed-downloads scanner tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
    /// History entries fetched per download client.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    /// Minutes after which an `importing` download is considered stuck.
    #[serde(default = "default_stuck_import_minutes")]
    pub stuck_import_minutes: i64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            stuck_import_minutes: default_stuck_import_minutes(),
        }
    }
}

fn default_history_limit() -> u32 {
    50
}

fn default_stuck_import_minutes() -> i64 {
    5
}

/// Blacklist retention.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlacklistConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

impl Default for BlacklistConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
        }
    }
}

fn default_retention_days() -> i64 {
    90
}

/// Database backup task configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BackupConfig {
    /// Backup directory; defaults to `backups/` next to the database file.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_backup_keep")]
    pub keep: usize,
}

fn default_backup_keep() -> usize {
    7
}

/// Outbound rate limits per provider key.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RateLimitsConfig {
    /// Applied to providers without an explicit entry.
    #[serde(default)]
    pub default: ProviderLimitsConfig,
    /// Per-provider overrides, keyed like `indexer:<id>` or `sabnzbd:<id>`.
    #[serde(default)]
    pub providers: HashMap<String, ProviderLimitsConfig>,
}

/// Rate limit parameters for one outbound provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderLimitsConfig {
    /// Dispatch window length in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Requests permitted per window.
    #[serde(default = "default_interval_cap")]
    pub interval_cap: u32,
    /// Maximum in-flight requests.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    /// Request-level timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderLimitsConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            interval_cap: default_interval_cap(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_interval_cap() -> u32 {
    1
}

fn default_concurrency() -> u32 {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub indexers: Vec<SanitizedIndexer>,
    pub download_clients: Vec<SanitizedDownloadClient>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedIndexer {
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub enabled: bool,
    pub supports_rss: bool,
    pub priority: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDownloadClient {
    pub id: String,
    pub name: String,
    pub kind: DownloadClientKind,
    pub host: String,
    pub port: u16,
    pub enabled: bool,
    pub priority: i32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: ServerConfig {
                api_key: config.server.api_key.as_ref().map(|_| "***".to_string()),
                ..config.server.clone()
            },
            indexers: config
                .indexers
                .iter()
                .map(|i| SanitizedIndexer {
                    id: i.id.clone(),
                    name: i.name.clone(),
                    base_url: i.base_url.clone(),
                    enabled: i.enabled,
                    supports_rss: i.supports_rss,
                    priority: i.priority,
                })
                .collect(),
            download_clients: config
                .download_clients
                .iter()
                .map(|c| SanitizedDownloadClient {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    kind: c.kind,
                    host: c.host.clone(),
                    port: c.port,
                    enabled: c.enabled,
                    priority: c.priority,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let toml = r#"
[database]
path = "/var/lib/magpie/magpie.db"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8686);
        assert_eq!(config.rss.limit, 100);
        assert_eq!(config.scanner.history_limit, 50);
        assert!(config.indexers.is_empty());
    }

    #[test]
    fn test_deserialize_missing_database_fails() {
        let toml = r#"
[server]
port = 8686
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_indexer_defaults() {
        let toml = r#"
[database]
path = "magpie.db"

[[indexers]]
id = "nzbgeek"
name = "NZBgeek"
base_url = "https://api.nzbgeek.info"
api_key = "secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let indexer = &config.indexers[0];
        assert!(indexer.enabled);
        assert!(indexer.supports_rss);
        assert_eq!(indexer.priority, 25);
        assert!(indexer.categories.is_empty());
    }

    #[test]
    fn test_deserialize_download_client() {
        let toml = r#"
[database]
path = "magpie.db"

[[download_clients]]
id = "sab"
name = "SABnzbd"
kind = "sabnzbd"
host = "localhost"
port = 8080
api_key = "secret"
remote_path = "/remote/dl"
local_path = "/mnt/dl"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let client = &config.download_clients[0];
        assert_eq!(client.kind, DownloadClientKind::Sabnzbd);
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.remote_path.as_deref(), Some("/remote/dl"));
    }

    #[test]
    fn test_rate_limits_defaults() {
        let toml = r#"
[database]
path = "magpie.db"

[rate_limits.providers."indexer:nzbgeek"]
interval_ms = 250
interval_cap = 1
concurrency = 8
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.rate_limits.default.interval_ms, 1000);
        let provider = &config.rate_limits.providers["indexer:nzbgeek"];
        assert_eq!(provider.interval_ms, 250);
        assert_eq!(provider.concurrency, 8);
        assert_eq!(provider.timeout_secs, 30);
    }

    #[test]
    fn test_sanitized_config_redacts_secrets() {
        let toml = r#"
[database]
path = "magpie.db"

[server]
api_key = "topsecret"

[[indexers]]
id = "ix"
name = "Indexer"
base_url = "https://indexer.example"
api_key = "alsosecret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.server.api_key.as_deref(), Some("***"));
        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("topsecret"));
        assert!(!json.contains("alsosecret"));
    }
}
