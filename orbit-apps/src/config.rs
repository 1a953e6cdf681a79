//! Registry configuration with sensible defaults.
//!
//! [`RegistryConfig`] controls the scan cache lifetime, the fuzzy match
//! cut-off and which names are hidden as system components.

use serde::{Deserialize, Serialize};

use crate::error::AppsError;

/// Names containing any of these keywords are treated as system components
/// and never offered as candidates.
pub const DEFAULT_SYSTEM_KEYWORDS: &[&str] = &[
    "runtime",
    "framework",
    "vclibs",
    "sdk",
    "host",
    "bridge",
    "update",
    "redistributable",
];

/// Configuration for the application registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// How long a successful scan stays fresh, in seconds.
    pub cache_ttl_seconds: u64,
    /// Minimum similarity ratio for a fuzzy-only candidate, in `(0, 1]`.
    pub fuzzy_threshold: f64,
    /// Lowercase keywords that mark a name as a system component.
    pub system_keywords: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 300,
            fuzzy_threshold: 0.6,
            system_keywords: DEFAULT_SYSTEM_KEYWORDS
                .iter()
                .map(|k| (*k).to_owned())
                .collect(),
        }
    }
}

impl RegistryConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `cache_ttl_seconds` must be greater than 0
    /// - `fuzzy_threshold` must be within `(0, 1]`
    pub fn validate(&self) -> Result<(), AppsError> {
        if self.cache_ttl_seconds == 0 {
            return Err(AppsError::Config(
                "cache_ttl_seconds must be greater than 0".into(),
            ));
        }
        if !(self.fuzzy_threshold > 0.0 && self.fuzzy_threshold <= 1.0) {
            return Err(AppsError::Config(
                "fuzzy_threshold must be within (0, 1]".into(),
            ));
        }
        Ok(())
    }
}
