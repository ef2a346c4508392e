// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict schema validation.
//!
//! Describes one frame exchange: the segment name, the header layout and the
//! frame geometry. Any invalid field results in a HardValidationError.

use std::path::Path;

use serde::Deserialize;

use crate::error::{HardValidationError, ShmFrameError, ShmFrameResult};
use crate::header::HeaderMode;
use crate::shm::ExchangeLayout;
use crate::types::TypeCode;

/// Longest accepted segment name.
const MAX_NAME_LEN: usize = 64;

/// Highest accepted publish rate.
const MAX_RATE_HZ: f64 = 1000.0;

/// Raw segment section as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
struct RawSegmentConfig {
    #[serde(default = "default_segment_name")]
    name: String,
    #[serde(default = "default_slots")]
    slots: usize,
}

fn default_segment_name() -> String {
    "shmframe".to_string()
}

fn default_slots() -> usize {
    2 // one being read, one being written
}

impl Default for RawSegmentConfig {
    fn default() -> Self {
        Self {
            name: default_segment_name(),
            slots: default_slots(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawHeaderConfig {
    #[serde(default)]
    mode: HeaderMode,
}

#[derive(Debug, Deserialize)]
struct RawFrameConfig {
    rows: u64,
    cols: u64,
    type_code: i32,
    #[serde(default = "default_rate_hz")]
    rate_hz: f64,
}

fn default_rate_hz() -> f64 {
    30.0
}

/// Raw root configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    segment: RawSegmentConfig,
    #[serde(default)]
    header: RawHeaderConfig,
    frame: RawFrameConfig,
}

/// Validated segment settings.
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    pub name: String,
    pub slots: usize,
}

/// Validated frame geometry.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    pub rows: u64,
    pub cols: u64,
    pub type_code: TypeCode,
    pub rate_hz: f64,
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub segment: SegmentConfig,
    pub header_mode: HeaderMode,
    pub frame: FrameConfig,
    /// Placement derived from the fields above.
    pub layout: ExchangeLayout,
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> ShmFrameResult<ExchangeConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ShmFrameError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ShmFrameError::Io {
            context: "reading config file",
            source: e,
        })?;

        let config = Self::load_string(&content)?;
        tracing::debug!(
            path = %path.display(),
            segment = %config.segment.name,
            mode = %config.header_mode,
            "Loaded exchange configuration"
        );
        Ok(config)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> ShmFrameResult<ExchangeConfig> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| ShmFrameError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> ShmFrameResult<ExchangeConfig> {
        let segment = Self::validate_segment(raw.segment)?;
        let frame = Self::validate_frame(raw.frame)?;
        let header_mode = raw.header.mode;

        let layout = ExchangeLayout::for_frame(
            header_mode,
            frame.rows,
            frame.cols,
            frame.type_code,
            segment.slots,
        )
        .map_err(|e| HardValidationError::InvalidFieldValue {
            field: "frame",
            value: format!("{}x{} type {}", frame.rows, frame.cols, frame.type_code),
            reason: e.to_string(),
        })?;

        Ok(ExchangeConfig {
            segment,
            header_mode,
            frame,
            layout,
        })
    }

    fn validate_segment(raw: RawSegmentConfig) -> ShmFrameResult<SegmentConfig> {
        if raw.name.is_empty() {
            return Err(HardValidationError::MissingRequiredField {
                field: "name",
                context: "segment".to_string(),
            }
            .into());
        }

        if raw.name.len() > MAX_NAME_LEN {
            return Err(HardValidationError::InvalidFieldValue {
                field: "name",
                value: raw.name.clone(),
                reason: format!(
                    "Segment name too long: {} chars (max {})",
                    raw.name.len(),
                    MAX_NAME_LEN
                ),
            }
            .into());
        }

        if !raw
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(HardValidationError::InvalidFieldValue {
                field: "name",
                value: raw.name,
                reason: "Segment name must contain only alphanumeric characters, hyphens, and underscores".to_string(),
            }
            .into());
        }

        if raw.slots == 0 || raw.slots > ExchangeLayout::MAX_SLOTS {
            return Err(HardValidationError::InvalidFieldValue {
                field: "slots",
                value: raw.slots.to_string(),
                reason: format!("Must be between 1 and {}", ExchangeLayout::MAX_SLOTS),
            }
            .into());
        }

        Ok(SegmentConfig {
            name: raw.name,
            slots: raw.slots,
        })
    }

    fn validate_frame(raw: RawFrameConfig) -> ShmFrameResult<FrameConfig> {
        if raw.rows == 0 || raw.cols == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "rows/cols",
                value: format!("{}x{}", raw.rows, raw.cols),
                reason: "Frame dimensions must be non-zero".to_string(),
            }
            .into());
        }

        let type_code = TypeCode::from_raw(raw.type_code);
        if type_code.decode().is_none() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "type_code",
                value: raw.type_code.to_string(),
                reason: "Not a depth/channel type code".to_string(),
            }
            .into());
        }

        if !raw.rate_hz.is_finite() || raw.rate_hz <= 0.0 || raw.rate_hz > MAX_RATE_HZ {
            return Err(HardValidationError::InvalidFieldValue {
                field: "rate_hz",
                value: raw.rate_hz.to_string(),
                reason: format!("Must be in (0, {}]", MAX_RATE_HZ),
            }
            .into());
        }

        Ok(FrameConfig {
            rows: raw.rows,
            cols: raw.cols,
            type_code,
            rate_hz: raw.rate_hz,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_CONFIG: &str = r#"
segment:
  name: camera-0
  slots: 3
header:
  mode: fields
frame:
  rows: 480
  cols: 640
  type_code: 16
  rate_hz: 60.0
"#;

    #[test]
    fn test_valid_config() {
        let config = ConfigLoader::load_string(VALID_CONFIG).unwrap();
        assert_eq!(config.segment.name, "camera-0");
        assert_eq!(config.segment.slots, 3);
        assert_eq!(config.header_mode, HeaderMode::Fields);
        assert_eq!(config.frame.type_code, TypeCode::U8C3);
        assert_eq!(config.layout.payload_len(), 480 * 640 * 3);
        assert_eq!(config.layout.slots(), 3);
    }

    #[test]
    fn test_defaults_applied() {
        let yaml = r#"
frame:
  rows: 2
  cols: 2
  type_code: 0
"#;
        let config = ConfigLoader::load_string(yaml).unwrap();
        assert_eq!(config.segment.name, "shmframe");
        assert_eq!(config.segment.slots, 2);
        assert_eq!(config.header_mode, HeaderMode::Seqlock);
        assert_eq!(config.frame.rate_hz, 30.0);
    }

    #[test]
    fn test_missing_frame_section() {
        let yaml = r#"
segment:
  name: camera-0
"#;
        assert!(matches!(
            ConfigLoader::load_string(yaml),
            Err(ShmFrameError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_unknown_header_mode() {
        let yaml = r#"
header:
  mode: mutex
frame:
  rows: 2
  cols: 2
  type_code: 0
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_invalid_segment_name() {
        let yaml = r#"
segment:
  name: "cam/0"
frame:
  rows: 2
  cols: 2
  type_code: 0
"#;
        assert!(matches!(
            ConfigLoader::load_string(yaml),
            Err(ShmFrameError::HardValidation(_))
        ));
    }

    #[test]
    fn test_zero_dimension() {
        let yaml = r#"
frame:
  rows: 0
  cols: 640
  type_code: 16
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_undecodable_type_code() {
        let yaml = r#"
frame:
  rows: 4
  cols: 4
  type_code: -2
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_rate_out_of_range() {
        for rate in ["0.0", "-5.0", "5000.0"] {
            let yaml = format!(
                "frame:\n  rows: 4\n  cols: 4\n  type_code: 0\n  rate_hz: {}\n",
                rate
            );
            assert!(ConfigLoader::load_string(&yaml).is_err(), "rate {}", rate);
        }
    }

    #[test]
    fn test_too_many_slots() {
        let yaml = r#"
segment:
  slots: 9
frame:
  rows: 4
  cols: 4
  type_code: 0
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_frame_too_large_for_region() {
        let yaml = r#"
frame:
  rows: 100000
  cols: 100000
  type_code: 16
"#;
        assert!(matches!(
            ConfigLoader::load_string(yaml),
            Err(ShmFrameError::HardValidation(_))
        ));
    }
}
