//! Configuration for the cache store

use serde::{Deserialize, Serialize};

/// How strictly sector headers are checked during a chain walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderPolicy {
    /// Reject sectors whose owner or chunk number disagree with the request.
    #[default]
    Strict,
    /// Follow the next-sector links without checking owner or sequence.
    Lenient,
}

/// Configuration for a [`CacheStore`](crate::CacheStore).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Sector header validation applied to every chain walk
    #[serde(default)]
    pub header_policy: HeaderPolicy,
}

impl StoreConfig {
    /// Create a configuration with strict header checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header validation policy.
    #[must_use]
    pub const fn with_header_policy(mut self, policy: HeaderPolicy) -> Self {
        self.header_policy = policy;
        self
    }

    /// Whether owner and sequence fields are validated.
    pub const fn validates_headers(&self) -> bool {
        matches!(self.header_policy, HeaderPolicy::Strict)
    }
}
