//! Codec configuration types
//!
//! The codec needs very little configuration. The one real choice is what to
//! do with a schema that describes more bits than its frame holds.

use serde::{Deserialize, Serialize};

/// How the padder treats a schema that runs past the end of its frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddingPolicy {
    /// Fail with `OverflowError`
    #[default]
    Strict,
    /// Build the layout anyway, record a warning and decode what fits
    Lenient,
}

/// Configuration for frame runtimes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Overflow handling for padded layouts (default: strict)
    #[serde(default)]
    pub padding_policy: PaddingPolicy,
}

impl CodecConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the padding policy
    pub fn with_padding_policy(mut self, policy: PaddingPolicy) -> Self {
        self.padding_policy = policy;
        self
    }

    /// Builder method: tolerate schemas that overflow their frame
    pub fn lenient(self) -> Self {
        self.with_padding_policy(PaddingPolicy::Lenient)
    }

    pub fn is_strict(&self) -> bool {
        self.padding_policy == PaddingPolicy::Strict
    }
}
