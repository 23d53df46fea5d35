use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::CallError;

const CONFIG_FILE: &str = "callroom.json";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CallConfig {
    /// Origin of the room service proxy, e.g. `https://demo.example.com`.
    #[serde(default = "default_api_origin")]
    pub api_origin: String,
    #[serde(default = "default_rooms_path")]
    pub rooms_path: String,
    #[serde(default = "default_room_expiry_secs")]
    pub room_expiry_secs: u64,
    #[serde(default = "default_true")]
    pub enable_chat: bool,
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
    #[serde(default = "default_countdown_interval_secs")]
    pub countdown_interval_secs: u64,
    /// RTMP ingest for live streaming; streaming is unavailable without it.
    #[serde(default)]
    pub live_stream_rtmp_url: Option<String>,
}

fn default_api_origin() -> String {
    "http://localhost:8888".to_string()
}

fn default_rooms_path() -> String {
    "/api/rooms".to_string()
}

fn default_room_expiry_secs() -> u64 {
    60 * 30
}

fn default_true() -> bool {
    true
}

fn default_stats_interval_secs() -> u64 {
    5
}

fn default_countdown_interval_secs() -> u64 {
    1
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            api_origin: default_api_origin(),
            rooms_path: default_rooms_path(),
            room_expiry_secs: default_room_expiry_secs(),
            enable_chat: true,
            stats_interval_secs: default_stats_interval_secs(),
            countdown_interval_secs: default_countdown_interval_secs(),
            live_stream_rtmp_url: None,
        }
    }
}

impl CallConfig {
    /// Load `callroom.json` from `dir`. A missing file yields the defaults.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, CallError> {
        let path: PathBuf = dir.as_ref().join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let config: CallConfig = serde_json::from_str(&contents).map_err(|e| {
                    CallError::Config(format!("invalid {}: {e}", path.display()))
                })?;
                config.validate()?;
                tracing::debug!("loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(CallError::Config(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Full URL of the room-creation endpoint.
    pub fn rooms_endpoint(&self) -> Result<Url, CallError> {
        let origin = Url::parse(&self.api_origin).map_err(|e| {
            CallError::Config(format!("invalid api_origin '{}': {e}", self.api_origin))
        })?;
        origin.join(&self.rooms_path).map_err(|e| {
            CallError::Config(format!("invalid rooms_path '{}': {e}", self.rooms_path))
        })
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }

    pub fn countdown_interval(&self) -> Duration {
        Duration::from_secs(self.countdown_interval_secs)
    }

    fn validate(&self) -> Result<(), CallError> {
        if self.stats_interval_secs == 0 || self.countdown_interval_secs == 0 {
            return Err(CallError::Config("intervals must be at least one second".into()));
        }
        self.rooms_endpoint().map(|_| ())
    }
}
