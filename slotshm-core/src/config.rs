// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict schema validation.
//!
//! Both endpoints of a channel must agree on name and payload size out of
//! band; a shared config file is the usual way to do that.
//! Any invalid field results in a HardValidationError that prevents startup.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{HardValidationError, SlotshmError, SlotshmResult};
use crate::types::{ChannelName, PayloadSize};

/// Raw channel configuration as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
struct RawChannelConfig {
    name: Option<String>,
    payload_size: Option<usize>,
    #[serde(default)]
    reclaim_stale: bool,
}

/// Raw reader configuration.
#[derive(Debug, Deserialize)]
struct RawReaderConfig {
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,
    #[serde(default = "default_attach_timeout_ms")]
    attach_timeout_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_attach_timeout_ms() -> u64 {
    5000
}

impl Default for RawReaderConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            attach_timeout_ms: default_attach_timeout_ms(),
        }
    }
}

/// Raw root configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    channel: RawChannelConfig,
    #[serde(default)]
    reader: RawReaderConfig,
}

/// Validated channel settings shared by Writer and Reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub name: ChannelName,
    pub payload_size: PayloadSize,
    /// Unlink objects left by a previous writer before creating them.
    pub reclaim_stale: bool,
}

impl ChannelConfig {
    pub fn new(name: ChannelName, payload_size: PayloadSize) -> Self {
        Self {
            name,
            payload_size,
            reclaim_stale: false,
        }
    }
}

/// Validated polling settings for a Reader process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    pub poll_interval: Duration,
    pub attach_timeout: Duration,
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub channel: ChannelConfig,
    pub reader: ReaderConfig,
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> SlotshmResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SlotshmError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| SlotshmError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> SlotshmResult<Config> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| SlotshmError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        Ok(Config {
            channel: Self::validate_channel(raw.channel)?,
            reader: Self::validate_reader(raw.reader)?,
        })
    }

    fn validate_channel(raw: RawChannelConfig) -> Result<ChannelConfig, HardValidationError> {
        let name = raw
            .name
            .ok_or_else(|| HardValidationError::MissingRequiredField {
                field: "name",
                context: "channel".to_string(),
            })?;
        let payload_size = raw
            .payload_size
            .ok_or_else(|| HardValidationError::MissingRequiredField {
                field: "payload_size",
                context: "channel".to_string(),
            })?;

        Ok(ChannelConfig {
            name: ChannelName::new(name)?,
            payload_size: PayloadSize::new(payload_size)?,
            reclaim_stale: raw.reclaim_stale,
        })
    }

    fn validate_reader(raw: RawReaderConfig) -> Result<ReaderConfig, HardValidationError> {
        if raw.poll_interval_ms == 0 || raw.poll_interval_ms > 60_000 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "poll_interval_ms",
                value: raw.poll_interval_ms.to_string(),
                reason: "Must be between 1 and 60000".to_string(),
            });
        }

        // 10 minutes max
        if raw.attach_timeout_ms > 600_000 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "attach_timeout_ms",
                value: raw.attach_timeout_ms.to_string(),
                reason: "Attach timeout must not exceed 600000ms".to_string(),
            });
        }

        Ok(ReaderConfig {
            poll_interval: Duration::from_millis(raw.poll_interval_ms),
            attach_timeout: Duration::from_millis(raw.attach_timeout_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_CONFIG: &str = r#"
channel:
  name: frames
  payload_size: 256
  reclaim_stale: true

reader:
  poll_interval_ms: 5
  attach_timeout_ms: 1000
"#;

    #[test]
    fn test_valid_config() {
        let config = ConfigLoader::load_string(VALID_CONFIG).unwrap();
        assert_eq!(config.channel.name.as_str(), "frames");
        assert_eq!(config.channel.payload_size.bytes(), 256);
        assert!(config.channel.reclaim_stale);
        assert_eq!(config.reader.poll_interval, Duration::from_millis(5));
        assert_eq!(config.reader.attach_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_defaults_applied() {
        let yaml = r#"
channel:
  name: frames
  payload_size: 64
"#;
        let config = ConfigLoader::load_string(yaml).unwrap();
        assert!(!config.channel.reclaim_stale);
        assert_eq!(config.reader.poll_interval, Duration::from_millis(10));
        assert_eq!(config.reader.attach_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_missing_payload_size() {
        let yaml = r#"
channel:
  name: frames
"#;
        let err = ConfigLoader::load_string(yaml).unwrap_err();
        assert!(matches!(
            err,
            SlotshmError::HardValidation(HardValidationError::MissingRequiredField {
                field: "payload_size",
                ..
            })
        ));
    }

    #[test]
    fn test_missing_channel_section() {
        let yaml = r#"
reader:
  poll_interval_ms: 5
"#;
        let result = ConfigLoader::load_string(yaml);
        assert!(matches!(result, Err(SlotshmError::ConfigParse { .. })));
    }

    #[test]
    fn test_invalid_channel_name() {
        let yaml = r#"
channel:
  name: "a/b"
  payload_size: 64
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_zero_payload_size() {
        let yaml = r#"
channel:
  name: frames
  payload_size: 0
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_poll_interval_zero() {
        let yaml = r#"
channel:
  name: frames
  payload_size: 64
reader:
  poll_interval_ms: 0
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_attach_timeout_too_high() {
        let yaml = r#"
channel:
  name: frames
  payload_size: 64
reader:
  attach_timeout_ms: 900000
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }
}
