use std::time::Duration;

use serde::Deserialize;

/// Knobs for the interactive layer. Every field has a default, so an empty
/// config file is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Pause between a v1 decision and its reveal.
    pub reveal_delay_v1_ms: u64,
    /// Pause between a v2 decision and its reveal.
    pub reveal_delay_v2_ms: u64,
    /// Skip the reveal pause entirely.
    pub instant_reveal: bool,
    /// How deep display widgets re-parse nested bodies before falling back to prose.
    pub max_render_depth: usize,
    /// Longest excerpt of offending source shown on a diagnostic card.
    pub diagnostic_excerpt_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            reveal_delay_v1_ms: 500,
            reveal_delay_v2_ms: 800,
            instant_reveal: false,
            max_render_depth: 8,
            diagnostic_excerpt_chars: 240,
        }
    }
}

impl EngineConfig {
    /// Same settings with the reveal pause removed.
    pub fn instant() -> Self {
        EngineConfig {
            instant_reveal: true,
            ..EngineConfig::default()
        }
    }

    pub fn reveal_delay_v1(&self) -> Duration {
        self.delay(self.reveal_delay_v1_ms)
    }

    pub fn reveal_delay_v2(&self) -> Duration {
        self.delay(self.reveal_delay_v2_ms)
    }

    fn delay(&self, ms: u64) -> Duration {
        if self.instant_reveal {
            Duration::ZERO
        } else {
            Duration::from_millis(ms)
        }
    }
}
