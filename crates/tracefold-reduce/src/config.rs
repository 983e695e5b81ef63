//! Combined configuration for both reduction engines

use crate::{codec::CodecConfig, error::ReduceError, segmenter::SegmenterConfig};
use serde::{Deserialize, Serialize};

/// Codec and segmenter settings, as loaded from a config file.
///
/// Both sections are optional in serialized form and fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceConfig {
    /// LZW codec parameters
    pub codec: CodecConfig,
    /// Content-defined chunking parameters
    pub segmenter: SegmenterConfig,
}

impl ReduceConfig {
    /// Validate both sections
    pub fn validate(&self) -> Result<(), ReduceError> {
        self.codec.validate()?;
        self.segmenter.validate()
    }
}
