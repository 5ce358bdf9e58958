//! Session-scoped editor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::memory::layout::timing;

/// Settings handed to each tag editor session at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Poke the whole tag after every field edit
    pub auto_poke: bool,
    /// Interval between target discovery scans
    #[serde(with = "duration_secs")]
    pub refresh_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_poke: false,
            refresh_interval: Duration::from_secs(timing::TARGET_REFRESH_INTERVAL_SECS),
        }
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

/// Builder for SessionConfig
#[derive(Debug, Clone, Default)]
pub struct SessionConfigBuilder {
    auto_poke: Option<bool>,
    refresh_interval: Option<Duration>,
}

impl SessionConfigBuilder {
    pub fn auto_poke(mut self, enabled: bool) -> Self {
        self.auto_poke = Some(enabled);
        self
    }

    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    pub fn build(self) -> SessionConfig {
        let default = SessionConfig::default();
        SessionConfig {
            auto_poke: self.auto_poke.unwrap_or(default.auto_poke),
            refresh_interval: self.refresh_interval.unwrap_or(default.refresh_interval),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
