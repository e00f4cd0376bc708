//! Engine settings

use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;

/// Default Art-Net destination (limited broadcast)
pub const DEFAULT_ARTNET_TARGET: &str = "255.255.255.255:6454";

/// Where DMX frames go
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputSettings {
    /// Art-Net over UDP
    ArtNet {
        #[serde(default = "default_target")]
        target: String,
        #[serde(default)]
        universe: u16,
    },
    /// Frames are computed but not sent
    #[default]
    Null,
}

fn default_target() -> String {
    DEFAULT_ARTNET_TARGET.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Sampling ticks per second
    pub tick_rate_hz: u32,
    pub output: OutputSettings,
    pub log: LogConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            output: OutputSettings::default(),
            log: LogConfig::default(),
        }
    }
}

impl EngineSettings {
    /// Tick rate, never zero
    pub fn effective_tick_rate(&self) -> u32 {
        self.tick_rate_hz.max(1)
    }
}
