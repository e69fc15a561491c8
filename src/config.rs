//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the consolidation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Whether to synthesize the conservative fallback evidence message when
    /// no adapter answers.
    ///
    /// With fallback disabled the zero-responder result keeps an empty
    /// evidence list, so callers can distinguish "nothing reachable" from a
    /// synthesized explanation.
    pub fallback_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fallback_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Loads engine configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("CROSSCHECK_FALLBACK_ENABLED") {
            if let Ok(enabled) = v.parse::<bool>() {
                self.fallback_enabled = enabled;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert!(EngineConfig::default().fallback_enabled);
    }
}
