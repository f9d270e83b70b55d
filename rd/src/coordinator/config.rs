//! Coordinator configuration

use serde::{Deserialize, Serialize};

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Channel buffer size for coordinator requests
    #[serde(rename = "channel-buffer")]
    pub channel_buffer: usize,

    /// Seed for the reviewer-selection rng. Unset draws from OS entropy;
    /// set it to make assignment deterministic (tests, reproducing runs).
    #[serde(rename = "rng-seed")]
    pub rng_seed: Option<u64>,
}

fn default_channel_buffer() -> usize {
    64
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            channel_buffer: default_channel_buffer(),
            rng_seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.channel_buffer, 64);
        assert_eq!(config.rng_seed, None);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: CoordinatorConfig = serde_yaml::from_str("rng-seed: 7").unwrap();
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.channel_buffer, 64);
    }
}
