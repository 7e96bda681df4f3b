//! Registry configuration.

use serde::Deserialize;

/// Configuration shared by every endpoint created against one
/// [`Registry`](crate::registry::Registry).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Queue size given to subscribers that do not pick one (0 = unbounded).
    pub default_queue_size: usize,
    /// Seed for the `rand`/`wait_fst` generators. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_queue_size: 1,
            seed: None,
        }
    }
}

impl RegistryConfig {
    /// Parses a configuration from JSON. Missing fields keep their defaults.
    ///
    /// # Errors
    /// Returns the parse error if `json` is not a valid configuration object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Sets the default subscriber queue size.
    #[must_use]
    pub fn with_default_queue_size(mut self, size: usize) -> Self {
        self.default_queue_size = size;
        self
    }

    /// Sets a fixed seed for random distribution.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.default_queue_size, 1);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_from_json_partial() {
        let config = RegistryConfig::from_json(r#"{"seed": 7}"#).unwrap();
        assert_eq!(config.default_queue_size, 1);
        assert_eq!(config.seed, Some(7));

        let config = RegistryConfig::from_json(r#"{"default_queue_size": 0}"#).unwrap();
        assert_eq!(config.default_queue_size, 0);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(RegistryConfig::from_json(r#"{"default_queue_size": "big"}"#).is_err());
    }

    #[test]
    fn test_builder() {
        let config = RegistryConfig::default()
            .with_default_queue_size(16)
            .with_seed(3);
        assert_eq!(config.default_queue_size, 16);
        assert_eq!(config.seed, Some(3));
    }
}
