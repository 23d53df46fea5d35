use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::CallConfig;
use crate::errors::CallError;

/// Room names the room service hands out: letters, digits, `-` and `_`.
static ROOM_NAME: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[A-Za-z0-9_-]+$").expect("room name pattern"));

/// A room handed out by the room service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub url: String,
    pub name: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Room {
    /// Whole seconds left before the room expires, never negative.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_seconds().max(0) as u64
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining_secs(now) == 0
    }
}

/// Expiry countdown for the demo room.
///
/// Only yields values strictly lower than the previous one, so a display fed
/// from it never repeats or goes up, and stops at zero.
#[derive(Debug, Clone)]
pub struct Countdown {
    expires_at: DateTime<Utc>,
    last: Option<u64>,
}

impl Countdown {
    pub fn new(room: &Room) -> Self {
        Self {
            expires_at: room.expires_at,
            last: None,
        }
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<u64> {
        let remaining = (self.expires_at - now).num_seconds().max(0) as u64;
        if self.last.is_some_and(|last| remaining >= last) {
            return None;
        }
        self.last = Some(remaining);
        Some(remaining)
    }

    pub fn is_finished(&self) -> bool {
        self.last == Some(0)
    }
}

pub fn countdown_text(remaining_secs: u64) -> String {
    format!("Heads up! Your demo room expires in {remaining_secs} seconds")
}

#[derive(Debug, Serialize)]
struct CreateRoomRequest {
    properties: RoomProperties,
}

#[derive(Debug, Serialize)]
struct RoomProperties {
    exp: i64,
    enable_chat: bool,
}

/// Response from the room service.
#[derive(Debug, Deserialize)]
struct RoomResponse {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    config: Option<RoomResponseConfig>,
}

#[derive(Debug, Deserialize)]
struct RoomResponseConfig {
    #[serde(default)]
    exp: Option<i64>,
}

/// Creates short-lived demo rooms through the room service proxy.
#[derive(Debug, Clone)]
pub struct RoomProvisioner {
    client: reqwest::Client,
    endpoint: Url,
    expiry_secs: u64,
    enable_chat: bool,
}

impl RoomProvisioner {
    pub fn new(config: &CallConfig) -> Result<Self, CallError> {
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: config.rooms_endpoint()?,
            expiry_secs: config.room_expiry_secs,
            enable_chat: config.enable_chat,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POST the creation options and return the new room.
    ///
    /// Any failure (transport, non-2xx, unreadable body, missing `url`) is
    /// logged and returned as `CallError::Provision`; no room is produced.
    pub async fn create_room(&self) -> Result<Room, CallError> {
        let requested_exp = Utc::now().timestamp() + self.expiry_secs as i64;
        let body = CreateRoomRequest {
            properties: RoomProperties {
                exp: requested_exp,
                enable_chat: self.enable_chat,
            },
        };

        tracing::info!("requesting room from {}", self.endpoint);

        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| provision_error(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(provision_error(format!(
                "room service returned status {}",
                resp.status()
            )));
        }

        let data: RoomResponse = resp
            .json()
            .await
            .map_err(|e| provision_error(format!("invalid room service response: {e}")))?;

        let url = data
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| provision_error("room service response has no url".into()))?;

        let exp = data.config.and_then(|c| c.exp).unwrap_or(requested_exp);
        let expires_at = DateTime::<Utc>::from_timestamp(exp, 0)
            .ok_or_else(|| provision_error(format!("invalid room expiry {exp}")))?;

        tracing::info!("room created: {url} (expires {expires_at})");
        Ok(Room {
            url,
            name: data.name,
            expires_at,
        })
    }
}

fn provision_error(message: String) -> CallError {
    tracing::error!("room provisioning failed: {message}");
    CallError::Provision(message)
}

/// Validate a room URL typed by the user.
///
/// Accepts `http(s)://host/room-name` with an optional trailing slash.
pub fn validate_room_url(input: &str) -> Result<Url, CallError> {
    let input = input.trim();
    let url = Url::parse(input).map_err(|e| CallError::InvalidUrl(format!("'{input}': {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(CallError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(CallError::InvalidUrl(format!("'{input}' has no host")));
    }

    let room = url.path().trim_matches('/');
    if !ROOM_NAME.is_match(room) {
        return Err(CallError::InvalidUrl(format!(
            "expected a room name in '{input}', got '{room}'"
        )));
    }
    Ok(url)
}
