//! Config schema types (database, publishing, channels).

use std::{collections::BTreeMap, fmt, path::PathBuf, time::Duration};

use {
    reshare_common::Channel,
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReshareConfig {
    pub database: DatabaseConfig,
    pub publishing: PublishingConfig,
    /// Output channels keyed by channel name (e.g. "telegram").
    pub channels: BTreeMap<String, ChannelSettings>,
}

impl ReshareConfig {
    /// Snapshot of the active channels, sorted by name.
    #[must_use]
    pub fn active_channels(&self) -> Vec<Channel> {
        self.channels
            .iter()
            .filter(|(_, settings)| settings.active)
            .map(|(name, settings)| settings.to_channel(name))
            .collect()
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelSettings> {
        self.channels.get(name)
    }
}

/// Durable store location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file. Defaults to `<data_dir>/reshare.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| crate::loader::data_dir().join("reshare.db"))
    }
}

/// Timeouts applied by the publication coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishingConfig {
    /// Upper bound for a single channel delivery. Defaults to 30.
    pub delivery_timeout_secs: u64,
    /// Upper bound for a single credential check. Defaults to 15.
    pub validation_timeout_secs: u64,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            delivery_timeout_secs: 30,
            validation_timeout_secs: 15,
        }
    }
}

impl PublishingConfig {
    #[must_use]
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    #[must_use]
    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation_timeout_secs)
    }
}

/// Settings for one output channel.
///
/// Keys other than `active` and `account_ref` are plug-in specific and are
/// handed to the plug-in as a JSON object.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ChannelSettings {
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_ref: Option<String>,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl ChannelSettings {
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    /// Plug-in specific options as a JSON object.
    #[must_use]
    pub fn plugin_config(&self) -> Value {
        Value::Object(self.options.clone())
    }

    #[must_use]
    pub fn to_channel(&self, name: &str) -> Channel {
        Channel {
            name: name.to_string(),
            active: self.active,
            account_ref: self.account_ref.clone(),
        }
    }
}

// Option values routinely hold tokens; only key names are printed.
impl fmt::Debug for ChannelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSettings")
            .field("active", &self.active)
            .field("account_ref", &self.account_ref)
            .field("options", &self.options.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[database]
path = "/tmp/reshare-test.db"

[publishing]
delivery_timeout_secs = 10

[channels.telegram]
active = true
account_ref = "@events_bot"
chat_id = "-100123"
token = "123:ABC"
username = "events_bot"

[channels.zulip]
active = false
chat_id = "events"
"#;

    #[test]
    fn parses_channels_with_plugin_options() {
        let cfg: ReshareConfig = toml::from_str(SAMPLE).unwrap();
        let telegram = cfg.channel("telegram").unwrap();
        assert!(telegram.active);
        assert_eq!(telegram.account_ref.as_deref(), Some("@events_bot"));
        assert_eq!(telegram.option_str("chat_id"), Some("-100123"));
        assert!(!telegram.options.contains_key("active"));
        assert_eq!(cfg.publishing.delivery_timeout(), Duration::from_secs(10));
        // unspecified fields keep their defaults
        assert_eq!(cfg.publishing.validation_timeout_secs, 15);
    }

    #[test]
    fn active_channels_skips_inactive() {
        let cfg: ReshareConfig = toml::from_str(SAMPLE).unwrap();
        let active = cfg.active_channels();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "telegram");
        assert_eq!(active[0].account_ref.as_deref(), Some("@events_bot"));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: ReshareConfig = toml::from_str("").unwrap();
        assert!(cfg.channels.is_empty());
        assert_eq!(cfg.publishing.delivery_timeout_secs, 30);
        assert!(cfg.database.path.is_none());
    }

    #[test]
    fn debug_hides_option_values() {
        let cfg: ReshareConfig = toml::from_str(SAMPLE).unwrap();
        let rendered = format!("{:?}", cfg.channel("telegram").unwrap());
        assert!(rendered.contains("token"));
        assert!(!rendered.contains("123:ABC"));
    }
}
