//! Engine configuration types.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::ArchiveFormat;

/// Configuration for the operation engine.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Format used when compressing.
    #[builder(default)]
    #[serde(default)]
    pub archive_format: ArchiveFormat,

    /// Capacity of each request's progress channel.
    #[builder(default = "100")]
    #[serde(default = "default_channel_size")]
    pub channel_size: usize,

    /// Reject Windows-hostile names on every platform.
    #[builder(default = "false")]
    #[serde(default)]
    pub strict_names: bool,

    /// Prefix of the hidden staging directory used while extracting.
    #[builder(default = "default_staging_prefix()")]
    #[serde(default = "default_staging_prefix")]
    pub staging_prefix: String,
}

fn default_channel_size() -> usize {
    100
}

fn default_staging_prefix() -> String {
    ".haul-extract".to_string()
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.channel_size == Some(0) {
            return Err("Channel size must be greater than zero".to_string());
        }
        if let Some(prefix) = &self.staging_prefix {
            if prefix.is_empty() || prefix.contains(['/', '\\']) {
                return Err("Staging prefix must be a plain, non-empty name".to_string());
            }
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new engine config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            archive_format: ArchiveFormat::default(),
            channel_size: default_channel_size(),
            strict_names: false,
            staging_prefix: default_staging_prefix(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::builder()
            .archive_format(ArchiveFormat::TarGz)
            .channel_size(8usize)
            .strict_names(true)
            .build()
            .unwrap();

        assert_eq!(config.archive_format, ArchiveFormat::TarGz);
        assert_eq!(config.channel_size, 8);
        assert!(config.strict_names);
        assert_eq!(config.staging_prefix, ".haul-extract");
    }

    #[test]
    fn test_config_builder_rejects_zero_channel() {
        assert!(EngineConfig::builder().channel_size(0usize).build().is_err());
        assert!(EngineConfig::builder().staging_prefix("a/b").build().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.archive_format, ArchiveFormat::Zip);
        assert_eq!(config.channel_size, 100);
        assert!(!config.strict_names);
    }
}
