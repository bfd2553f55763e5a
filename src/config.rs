//! Encoder and decoder configuration.

use serde::{Deserialize, Serialize};

/// Default nesting limit for both directions.
///
/// Only containers and records nested inside a single object count; every
/// arena object starts again from zero.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// How the linearizer maps table ids to stream positions.
///
/// Either way the root is written last and every `Reference` number equals
/// the position of its target in the stream. The policies only differ in
/// which slots get the small, cheap-to-encode numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdPolicy {
    /// Slots are written in descending discovery order. The most recently
    /// discovered slot gets position 0, the root the largest position.
    #[default]
    DiscoveryOrder,
    /// Slots are written by descending incoming reference count, ties broken
    /// by descending discovery order. The root is still written last.
    ReferenceCount,
}

/// Settings shared by a serialize or deserialize call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reference numbering policy used when writing.
    pub id_policy: IdPolicy,
    /// Maximum nesting of containers and records within one object before
    /// the call fails with
    /// [`GraphcodeError::DepthLimitExceeded`](crate::GraphcodeError::DepthLimitExceeded).
    ///
    /// Chains of arena objects do not count against it.
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id_policy: IdPolicy::DiscoveryOrder,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Config {
    /// Returns a copy with a different numbering policy.
    pub fn with_id_policy(mut self, id_policy: IdPolicy) -> Self {
        self.id_policy = id_policy;
        self
    }

    /// Returns a copy with a different recursion limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
