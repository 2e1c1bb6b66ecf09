//! # Serializer Configuration
//!
//! Options recognized by the facade. Deserializable so the app layer can
//! load them from a TOML file; every field has a default.

use crate::constants::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};

/// Options for one `Serializer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerConfig {
    /// Removed-property bytes are consumed and dropped silently.
    ///
    /// When false, every dropped removed property is logged at `warn`.
    pub ignore_removed_properties: bool,

    /// Removed-property values are retained on the resolver's `Modified`
    /// entries for diagnostic preview.
    pub preview_removed_properties: bool,

    /// Depth limit for planning and decoding.
    pub max_depth: usize,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            ignore_removed_properties: true,
            preview_removed_properties: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SerializerConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ignore_removed_properties(mut self, ignore: bool) -> Self {
        self.ignore_removed_properties = ignore;
        self
    }

    #[must_use]
    pub fn preview_removed_properties(mut self, preview: bool) -> Self {
        self.preview_removed_properties = preview;
        self
    }

    #[must_use]
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
