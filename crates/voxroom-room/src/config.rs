//! Room configuration: the ranges admin commands are validated against.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Placeholder in [`RoomConfig::name_template`] replaced by the owner's
/// display name.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Limits and defaults applied to every room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Longest allowed room name, in characters.
    pub max_name_len: usize,

    /// Largest finite user limit. `0` always means unlimited.
    pub max_user_limit: u32,

    /// Accepted bitrate range, inclusive.
    pub min_bitrate_kbps: u32,
    pub max_bitrate_kbps: u32,

    /// Bitrate new rooms get and `reset` restores.
    pub default_bitrate_kbps: u32,

    /// Name given to a room when the creator does not pick one.
    pub name_template: String,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_name_len: 100,
            max_user_limit: 99,
            min_bitrate_kbps: 8,
            max_bitrate_kbps: 96,
            default_bitrate_kbps: 64,
            name_template: format!("{NAME_PLACEHOLDER}'s Channel"),
        }
    }
}

impl RoomConfig {
    /// The platform's hard ceiling on a finite user limit.
    pub const USER_LIMIT_CEILING: u32 = 99;

    /// Returns a copy with out-of-range values clamped.
    pub fn validated(mut self) -> Self {
        if self.max_user_limit == 0 || self.max_user_limit > Self::USER_LIMIT_CEILING {
            warn!(
                limit = self.max_user_limit,
                ceiling = Self::USER_LIMIT_CEILING,
                "max_user_limit out of range, clamping"
            );
            self.max_user_limit = self.max_user_limit.clamp(1, Self::USER_LIMIT_CEILING);
        }
        if self.max_name_len == 0 {
            self.max_name_len = 1;
        }
        if self.min_bitrate_kbps == 0 {
            self.min_bitrate_kbps = 1;
        }
        if self.max_bitrate_kbps < self.min_bitrate_kbps {
            self.max_bitrate_kbps = self.min_bitrate_kbps;
        }
        let clamped = self
            .default_bitrate_kbps
            .clamp(self.min_bitrate_kbps, self.max_bitrate_kbps);
        if clamped != self.default_bitrate_kbps {
            warn!(
                bitrate = self.default_bitrate_kbps,
                min = self.min_bitrate_kbps,
                max = self.max_bitrate_kbps,
                "default bitrate outside accepted range, clamping"
            );
            self.default_bitrate_kbps = clamped;
        }
        self
    }

    /// Fills the name template for an owner. The result is cut to
    /// `max_name_len` characters.
    pub fn default_name_for(&self, display_name: &str) -> String {
        self.name_template
            .replace(NAME_PLACEHOLDER, display_name)
            .chars()
            .take(self.max_name_len)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.max_name_len, 100);
        assert_eq!(config.max_user_limit, 99);
        assert_eq!(config.min_bitrate_kbps, 8);
        assert_eq!(config.max_bitrate_kbps, 96);
        assert_eq!(config.default_bitrate_kbps, 64);
    }

    #[test]
    fn test_validated_clamps_user_limit() {
        let config = RoomConfig {
            max_user_limit: 500,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(config.max_user_limit, 99);

        let config = RoomConfig {
            max_user_limit: 0,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(config.max_user_limit, 1);
    }

    #[test]
    fn test_validated_pulls_default_bitrate_into_range() {
        let config = RoomConfig {
            default_bitrate_kbps: 320,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(config.default_bitrate_kbps, 96);
    }

    #[test]
    fn test_validated_keeps_good_config_unchanged() {
        let config = RoomConfig::default();
        assert_eq!(config.clone().validated(), config);
    }

    #[test]
    fn test_default_name_for_fills_template() {
        let config = RoomConfig::default();
        assert_eq!(config.default_name_for("alice"), "alice's Channel");
    }

    #[test]
    fn test_default_name_for_truncates_long_names() {
        let config = RoomConfig {
            max_name_len: 10,
            ..RoomConfig::default()
        };
        let name = config.default_name_for("bartholomew");
        assert_eq!(name.chars().count(), 10);
    }
}
