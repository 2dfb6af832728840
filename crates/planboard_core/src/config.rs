//! Planning studio configuration.
//!
//! # Invariants
//! - Distances are finite and non-negative.
//! - Missing JSON keys fall back to defaults.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Pointer (mouse/pen) drag activation: travel distance before a drag starts.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MouseActivation {
    pub distance_px: f64,
}

impl Default for MouseActivation {
    fn default() -> Self {
        Self { distance_px: 8.0 }
    }
}

/// Touch drag activation: press-and-hold delay with movement tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TouchActivation {
    pub delay_ms: u64,
    pub tolerance_px: f64,
}

impl Default for TouchActivation {
    fn default() -> Self {
        Self {
            delay_ms: 250,
            tolerance_px: 5.0,
        }
    }
}

/// Top-level studio configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub mouse_activation: MouseActivation,
    pub touch_activation: TouchActivation,
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    InvalidDistance { field: &'static str, value: f64 },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid studio config: {err}"),
            Self::InvalidDistance { field, value } => {
                write!(f, "`{field}` must be a finite non-negative distance, got {value}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::InvalidDistance { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl StudioConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_distance(
            "mouse_activation.distance_px",
            self.mouse_activation.distance_px,
        )?;
        check_distance(
            "touch_activation.tolerance_px",
            self.touch_activation.tolerance_px,
        )
    }
}

fn check_distance(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidDistance { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, StudioConfig};

    #[test]
    fn empty_document_yields_defaults() {
        let config = StudioConfig::from_json_str("{}").unwrap();
        assert_eq!(config, StudioConfig::default());
        assert_eq!(config.mouse_activation.distance_px, 8.0);
        assert_eq!(config.touch_activation.delay_ms, 250);
    }

    #[test]
    fn partial_document_overrides_given_keys() {
        let config =
            StudioConfig::from_json_str(r#"{"touch_activation": {"delay_ms": 400}}"#).unwrap();
        assert_eq!(config.touch_activation.delay_ms, 400);
        assert_eq!(config.touch_activation.tolerance_px, 5.0);
    }

    #[test]
    fn rejects_negative_distance_and_bad_json() {
        let err = StudioConfig::from_json_str(r#"{"mouse_activation": {"distance_px": -1}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDistance { .. }));
        assert!(matches!(
            StudioConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
