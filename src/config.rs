//! Configuration loading for the teleop console

use crate::controls::{velocity_scale_for, ActionMode, DEFAULT_VELOCITY_SCALE};
use crate::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// JSON lines on stdout
    #[default]
    Stdout,
    /// Zenoh pub/sub (requires the `zenoh-integration` feature)
    Zenoh,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub controls: ControlsConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransportConfig {
    pub kind: Option<TransportKind>,
    pub key_prefix: Option<String>,
    pub pretty: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ControlsConfig {
    /// Velocity preset label (Slowest, Slow, Medium, Fast, Fastest)
    pub velocity_scale: Option<String>,
    pub action_mode: Option<ActionMode>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecorderConfig {
    pub max_recordings: Option<usize>,
}

impl BridgeConfig {
    pub fn load(config_path: &str) -> Result<Self> {
        let contents = fs::read_to_string(config_path)
            .map_err(|e| BridgeError::Config(format!("Failed to read {}: {}", config_path, e)))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: BridgeConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that only fail later, at first use
    pub fn validate(&self) -> Result<()> {
        if let Some(label) = &self.controls.velocity_scale {
            velocity_scale_for(label)
                .map_err(|_| BridgeError::Config(format!("Unknown velocity scale '{}'", label)))?;
        }
        if self.recorder.max_recordings == Some(0) {
            return Err(BridgeError::Config("recorder.max_recordings must be at least 1".to_string()));
        }
        if let Some(prefix) = &self.transport.key_prefix {
            if prefix.is_empty() || prefix.ends_with('/') {
                return Err(BridgeError::Config(format!("Invalid key prefix '{}'", prefix)));
            }
        }
        Ok(())
    }
}

impl TransportConfig {
    pub fn kind(&self) -> TransportKind {
        self.kind.unwrap_or_default()
    }

    pub fn key_prefix(&self) -> String {
        self.key_prefix.clone().unwrap_or_else(|| "teleop/robot".to_string())
    }

    pub fn pretty(&self) -> bool {
        self.pretty.unwrap_or(false)
    }
}

impl ControlsConfig {
    /// Scale of the configured preset, default Medium
    pub fn velocity_scale(&self) -> f64 {
        self.velocity_scale
            .as_deref()
            .and_then(|label| velocity_scale_for(label).ok())
            .unwrap_or(DEFAULT_VELOCITY_SCALE)
    }

    pub fn action_mode(&self) -> ActionMode {
        self.action_mode.unwrap_or_default()
    }
}

impl RecorderConfig {
    /// `None` means unbounded
    pub fn max_recordings(&self) -> Option<usize> {
        self.max_recordings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = BridgeConfig::from_yaml("{}").unwrap();
        assert_eq!(config.transport.kind(), TransportKind::Stdout);
        assert_eq!(config.transport.key_prefix(), "teleop/robot");
        assert!(!config.transport.pretty());
        assert_eq!(config.controls.velocity_scale(), DEFAULT_VELOCITY_SCALE);
        assert_eq!(config.controls.action_mode(), ActionMode::StepActuate);
        assert_eq!(config.recorder.max_recordings(), None);
    }

    #[test]
    fn test_full_document() {
        let yaml = r#"
transport:
  kind: zenoh
  key_prefix: lab/stretch
  pretty: true
controls:
  velocity_scale: Fast
  action_mode: press-release
recorder:
  max_recordings: 10
"#;
        let config = BridgeConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.transport.kind(), TransportKind::Zenoh);
        assert_eq!(config.transport.key_prefix(), "lab/stretch");
        assert_eq!(config.controls.velocity_scale(), 1.2);
        assert_eq!(config.controls.action_mode(), ActionMode::PressRelease);
        assert_eq!(config.recorder.max_recordings(), Some(10));
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for yaml in [
            "controls:\n  velocity_scale: Warp\n",
            "recorder:\n  max_recordings: 0\n",
            "transport:\n  key_prefix: \"teleop/\"\n",
        ] {
            assert!(matches!(BridgeConfig::from_yaml(yaml), Err(BridgeError::Config(_))), "{}", yaml);
        }
        assert!(matches!(BridgeConfig::from_yaml("transport: [1, 2"), Err(BridgeError::Yaml(_))));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        assert!(matches!(
            BridgeConfig::load("/nonexistent/teleop.yaml"),
            Err(BridgeError::Config(_))
        ));
    }
}
