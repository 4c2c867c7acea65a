//! Service configuration, loaded from the environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use voxroom_protocol::ChannelId;
use voxroom_room::RoomConfig;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the service needs besides a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Use this channel as the spawn room instead of looking it up.
    pub spawn_channel: Option<ChannelId>,

    /// Name of the spawn room, looked up (or created) under the category.
    pub spawn_channel_name: String,

    /// Category that holds the spawn room and every room created from it.
    pub category_name: String,

    /// How often the idle reaper runs. Zero disables it.
    pub reap_interval: Duration,

    /// How old an empty room must be before the reaper removes it.
    pub idle_grace: Duration,

    pub room: RoomConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            spawn_channel: None,
            spawn_channel_name: "➕ Join to Create".to_string(),
            category_name: "Voice Channels".to_string(),
            reap_interval: Duration::from_secs(60),
            idle_grace: Duration::from_secs(30),
            room: RoomConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub const SPAWN_CHANNEL_ID: &'static str = "VOXROOM_SPAWN_CHANNEL_ID";
    pub const SPAWN_CHANNEL_NAME: &'static str = "VOXROOM_SPAWN_CHANNEL_NAME";
    pub const CATEGORY_NAME: &'static str = "VOXROOM_CATEGORY_NAME";
    pub const REAP_INTERVAL_SECS: &'static str = "VOXROOM_REAP_INTERVAL_SECS";
    pub const IDLE_GRACE_SECS: &'static str = "VOXROOM_IDLE_GRACE_SECS";
    pub const DEFAULT_BITRATE_KBPS: &'static str = "VOXROOM_DEFAULT_BITRATE_KBPS";
    pub const MAX_USER_LIMIT: &'static str = "VOXROOM_MAX_USER_LIMIT";

    /// Loads configuration from the process environment, after reading a
    /// `.env` file if there is one. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which returns the value of a
    /// variable or `None` if unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(id) = parse::<u64>(&lookup, Self::SPAWN_CHANNEL_ID)? {
            config.spawn_channel = Some(ChannelId(id));
        }
        if let Some(name) = non_empty(&lookup, Self::SPAWN_CHANNEL_NAME) {
            config.spawn_channel_name = name;
        }
        if let Some(name) = non_empty(&lookup, Self::CATEGORY_NAME) {
            config.category_name = name;
        }
        if let Some(secs) = parse::<u64>(&lookup, Self::REAP_INTERVAL_SECS)? {
            config.reap_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse::<u64>(&lookup, Self::IDLE_GRACE_SECS)? {
            config.idle_grace = Duration::from_secs(secs);
        }
        if let Some(kbps) = parse::<u32>(&lookup, Self::DEFAULT_BITRATE_KBPS)? {
            config.room.default_bitrate_kbps = kbps;
        }
        if let Some(limit) = parse::<u32>(&lookup, Self::MAX_USER_LIMIT)? {
            config.room.max_user_limit = limit;
        }

        config.room = config.room.validated();
        Ok(config)
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = non_empty(lookup, key) else {
        return Ok(None);
    };
    raw.parse().map(Some).map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })
}
