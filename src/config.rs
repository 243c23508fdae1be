use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address the HTTP server binds to (default: "0.0.0.0:3000")
    #[serde(default = "Config::default_bind_addr")]
    pub bind_addr: String,
    /// Allowed CORS origins. Required unless cors_permissive is true.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Explicitly allow all origins (development only). Defaults to false.
    #[serde(default)]
    pub cors_permissive: bool,
    /// Upstream feed endpoints and cache policy
    #[serde(default)]
    pub feeds: FeedConfig,
}

/// Configuration for the ZTM Poznań feed pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// URL of the static GTFS schedule archive
    #[serde(default = "FeedConfig::default_static_zip_url")]
    pub static_zip_url: String,
    /// URL of the GTFS-RT vehicle positions feed
    #[serde(default = "FeedConfig::default_vehicle_positions_url")]
    pub vehicle_positions_url: String,
    /// URL of the GTFS-RT trip updates feed
    #[serde(default = "FeedConfig::default_trip_updates_url")]
    pub trip_updates_url: String,
    /// Directory downloaded feed files are cached in (default: "cache")
    #[serde(default = "FeedConfig::default_cache_dir")]
    pub cache_dir: String,
    /// Seconds a cached realtime file stays fresh (default: 10)
    #[serde(default = "FeedConfig::default_realtime_max_age_secs")]
    pub realtime_max_age_secs: u64,
    /// Seconds the cached schedule archive stays fresh (default: 86400)
    #[serde(default = "FeedConfig::default_static_max_age_secs")]
    pub static_max_age_secs: u64,
    /// Per-request timeout in seconds for upstream downloads (default: 30)
    #[serde(default = "FeedConfig::default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            static_zip_url: Self::default_static_zip_url(),
            vehicle_positions_url: Self::default_vehicle_positions_url(),
            trip_updates_url: Self::default_trip_updates_url(),
            cache_dir: Self::default_cache_dir(),
            realtime_max_age_secs: Self::default_realtime_max_age_secs(),
            static_max_age_secs: Self::default_static_max_age_secs(),
            fetch_timeout_secs: Self::default_fetch_timeout_secs(),
        }
    }
}

impl FeedConfig {
    fn default_static_zip_url() -> String {
        "https://www.ztm.poznan.pl/pl/dla-deweloperow/getGTFSFile".to_string()
    }
    fn default_vehicle_positions_url() -> String {
        "https://www.ztm.poznan.pl/pl/dla-deweloperow/getGtfsRtFile?file=vehicle_positions.pb"
            .to_string()
    }
    fn default_trip_updates_url() -> String {
        "https://www.ztm.poznan.pl/pl/dla-deweloperow/getGtfsRtFile?file=trip_updates.pb"
            .to_string()
    }
    fn default_cache_dir() -> String {
        "cache".to_string()
    }
    fn default_realtime_max_age_secs() -> u64 {
        10
    }
    fn default_static_max_age_secs() -> u64 {
        86400
    }
    fn default_fetch_timeout_secs() -> u64 {
        30
    }
}

impl Config {
    fn default_bind_addr() -> String {
        "0.0.0.0:3000".to_string()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}
