use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::{ReelError, Result};

pub const DEFAULT_USER_AGENT: &str = concat!("reelfeed/", env!("CARGO_PKG_VERSION"));

/// Storage key holding the liked video id set.
pub const LIKED_VIDEOS_KEY: &str = "liked_video_ids";

/// Storage key holding the liked property reference set.
pub const LIKED_PROPERTIES_KEY: &str = "liked_property_refs";

// --- HTTP ---

/// Shared HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Backend API root, e.g. `https://api.example.com/v1`
    pub api_base: String,

    /// Bearer token sent to the engagement backend, if any
    pub auth_token: Option<String>,

    pub user_agent: String,

    /// Overall request timeout. 0 disables it.
    pub timeout_ms: u64,

    /// Time allowed to establish a connection
    pub connect_timeout_ms: u64,

    /// Idle connections kept per host. Warm-up only pays off if the
    /// connection it opened is still pooled when playback starts.
    pub pool_max_idle_per_host: usize,

    pub pool_idle_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8080/api".to_owned(),
            auth_token: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout_ms: 15_000,
            connect_timeout_ms: 10_000,
            pool_max_idle_per_host: 8,
            pool_idle_timeout_ms: 90_000,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.pool_idle_timeout_ms)
    }

    /// `api_base` without a trailing slash.
    pub fn api_root(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }

    pub fn default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );

        default_headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );

        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json, application/vnd.apple.mpegurl, text/vtt, */*;q=0.8"),
        );

        default_headers
    }

    /// Build the client every component shares, so warm-up connections are
    /// reused by the real requests that follow.
    pub fn build_client(&self) -> Result<Client> {
        let mut builder = Client::builder()
            .user_agent(self.user_agent.clone())
            .default_headers(Self::default_headers())
            .connect_timeout(self.connect_timeout())
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(self.pool_idle_timeout());

        if let Some(timeout) = self.timeout() {
            builder = builder.timeout(timeout);
        }

        builder
            .build()
            .map_err(|e| ReelError::configuration(format!("failed to build HTTP client: {e}")))
    }
}

// --- Feed ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Page size requested for the first page
    pub per_page: u32,
    /// Number of leading items whose connections/players are warmed
    pub prime_count: usize,
    /// Age after which callers should consider the cached page stale
    pub max_age_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            per_page: 10,
            prime_count: 3,
            max_age_ms: 5 * 60 * 1000,
        }
    }
}

impl FeedConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }
}

// --- Player pool ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerPoolConfig {
    /// Maximum live handles; the oldest is released when exceeded
    pub max_players: usize,
}

impl Default for PlayerPoolConfig {
    fn default() -> Self {
        Self { max_players: 4 }
    }
}

// --- Warm-up ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    /// Upper bound on URLs touched per warm-up call
    pub max_urls: usize,
    /// Size of the ranged request (`bytes=0-<N-1>`)
    pub range_bytes: u64,
    pub timeout_ms: u64,
    /// How long warmed players play muted before being paused
    pub play_window_ms: u64,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            max_urls: 3,
            range_bytes: 64 * 1024,
            timeout_ms: 2_500,
            play_window_ms: 350,
        }
    }
}

impl WarmupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn play_window(&self) -> Duration {
        Duration::from_millis(self.play_window_ms)
    }
}

// --- Subtitles ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    pub request_timeout_ms: u64,
    /// How long fetched playlists stay cached
    pub playlist_cache_ttl_ms: u64,
    pub playlist_cache_capacity: u64,
    /// Upper bound on VTT segments fetched for one track
    pub max_segments: usize,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            playlist_cache_ttl_ms: 5 * 60 * 1000,
            playlist_cache_capacity: 64,
            max_segments: 200,
        }
    }
}

impl SubtitleConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn playlist_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.playlist_cache_ttl_ms)
    }
}

// --- Top-Level Configuration ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelConfig {
    pub http: HttpConfig,
    pub feed: FeedConfig,
    pub pool: PlayerPoolConfig,
    pub warmup: WarmupConfig,
    pub subtitles: SubtitleConfig,
    /// Directory for persisted like state. In-memory only when unset.
    pub storage_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ReelConfig = serde_json::from_str(
            r#"{"http": {"api_base": "https://api.example.com/v1/"}, "warmup": {"max_urls": 2}}"#,
        )
        .unwrap();

        assert_eq!(config.http.api_root(), "https://api.example.com/v1");
        assert_eq!(config.http.connect_timeout_ms, 10_000);
        assert_eq!(config.warmup.max_urls, 2);
        assert_eq!(config.warmup.play_window(), Duration::from_millis(350));
        assert_eq!(config.feed.prime_count, 3);
        assert!(config.storage_dir.is_none());
    }

    #[test]
    fn test_zero_timeout_disables_it() {
        let http = HttpConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(http.timeout().is_none());
        assert!(http.build_client().is_ok());
    }
}
