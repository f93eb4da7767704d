use std::path::{Path, PathBuf};

use reelfeed_engine::ReelConfig;
use tracing::debug;

use crate::error::{AppError, Result};

const CONFIG_FILE: &str = "config.toml";

fn app_dir(base: Option<PathBuf>) -> Option<PathBuf> {
    base.map(|dir| dir.join("reelfeed"))
}

pub fn default_config_path() -> Option<PathBuf> {
    app_dir(dirs::config_dir()).map(|dir| dir.join(CONFIG_FILE))
}

/// Load the engine configuration.
///
/// An explicit path must exist. Without one, the platform config file is
/// used when present and defaults otherwise.
pub fn load(path: Option<&Path>) -> Result<ReelConfig> {
    let (path, required) = match path {
        Some(path) => (Some(path.to_path_buf()), true),
        None => (default_config_path(), false),
    };

    let mut config = match path {
        Some(path) if required || path.exists() => {
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                AppError::Config(format!("cannot read {}: {e}", path.display()))
            })?;
            debug!(path = %path.display(), "Loaded configuration");
            parse(&raw)?
        }
        _ => ReelConfig::default(),
    };

    if config.storage_dir.is_none() {
        config.storage_dir = app_dir(dirs::data_dir());
    }
    Ok(config)
}

pub fn parse(raw: &str) -> Result<ReelConfig> {
    toml::from_str(raw).map_err(|e| AppError::Config(e.to_string()))
}

pub fn show(config: &ReelConfig) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| AppError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_toml() {
        let config = parse(
            r#"
            storage_dir = "/tmp/reelfeed"

            [http]
            api_base = "https://api.example.com/v1"

            [feed]
            prime_count = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.http.api_root(), "https://api.example.com/v1");
        assert_eq!(config.feed.prime_count, 2);
        assert_eq!(config.feed.per_page, 10);
        assert_eq!(config.pool.max_players, 4);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(load(Some(&missing)), Err(AppError::Config(_))));
    }

    #[test]
    fn test_show_round_trips() {
        let config = ReelConfig::default();
        let rendered = show(&config).unwrap();
        let parsed = parse(&rendered).unwrap();
        assert_eq!(parsed.warmup.play_window_ms, config.warmup.play_window_ms);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(parse("[http\napi_base = 1"), Err(AppError::Config(_))));
    }
}
