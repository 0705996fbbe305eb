//! Server configuration
//!
//! Loaded from `$RIDE_REPLAY_CONFIG`, or `<config dir>/ride-replay/config.json`
//! when that file exists, otherwise defaults. `RIDE_REPLAY_BIND` overrides the
//! listen address.

use anyhow::{Context, Result};
use replay_core::{source::RideTrackSource, ReplayConfig};
use replay_sources::{DemoSource, JsonFileSource, SourceChain};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_PATH_ENV: &str = "RIDE_REPLAY_CONFIG";
pub const BIND_ENV: &str = "RIDE_REPLAY_BIND";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server listens on
    pub bind: SocketAddr,

    /// Directory of `<ride_id>.json` files; platform data dir when unset
    pub rides_dir: Option<PathBuf>,

    /// Serve the built-in demo rides after the file source
    pub include_demo: bool,

    /// Interpolation and playback tunables
    pub replay: ReplayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 9200)),
            rides_dir: None,
            include_demo: true,
            replay: ReplayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .or_else(|| {
                dirs::config_dir()
                    .map(|d| d.join("ride-replay").join("config.json"))
                    .filter(|p| p.exists())
            });

        let mut config = match path {
            Some(path) => Self::from_path(&path)?,
            None => {
                info!("No config file found, using defaults");
                Self::default()
            }
        };

        if let Ok(bind) = std::env::var(BIND_ENV) {
            config.bind = bind
                .parse()
                .with_context(|| format!("Invalid {} address '{}'", BIND_ENV, bind))?;
        }

        config.replay.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: ServerConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.replay.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Build the ride source chain: JSON files first, then demo rides
    pub fn build_source(&self) -> SourceChain {
        let mut sources: Vec<Box<dyn RideTrackSource>> = Vec::new();

        if let Some(dir) = self.rides_dir.clone().or_else(JsonFileSource::default_dir) {
            info!("Reading rides from {}", dir.display());
            sources.push(Box::new(JsonFileSource::new(dir)));
        }
        if self.include_demo {
            sources.push(Box::new(DemoSource::new()));
        }

        SourceChain::new(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind.port(), 9200);
        assert!(config.include_demo);
        assert_eq!(config.replay, ReplayConfig::default());
    }

    #[test]
    fn test_partial_config_file() {
        let dir = std::env::temp_dir().join(format!("ride-replay-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(
            &path,
            r#"{"bind": "127.0.0.1:9300", "replay": {"tick_interval_ms": 50}}"#,
        )
        .unwrap();

        let config = ServerConfig::from_path(&path).unwrap();
        assert_eq!(config.bind, "127.0.0.1:9300".parse::<SocketAddr>().unwrap());
        assert_eq!(config.replay.tick_interval_ms, 50);
        assert_eq!(config.replay.proximity_window_seconds, 10.0);
    }

    #[test]
    fn test_invalid_replay_section_is_rejected() {
        let dir = std::env::temp_dir().join(format!("ride-replay-bad-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"replay": {"speed_presets": []}}"#).unwrap();

        assert!(ServerConfig::from_path(&path).is_err());
    }

    #[test]
    fn test_build_source_without_demo() {
        let config = ServerConfig {
            rides_dir: Some(PathBuf::from("/nonexistent/rides")),
            include_demo: false,
            ..Default::default()
        };
        let source = config.build_source();
        assert_eq!(source.sources().count(), 1);
        assert!(source.list_rides().unwrap().is_empty());
    }
}
