//! Error types for the teleoperation bridge

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// Operation called without the state it requires (no active recording,
    /// no such recording index, ...)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Tag outside the closed vocabulary (joint, camera, mode, console verb)
    #[error("Unknown variant: {0}")]
    UnknownVariant(String),

    /// Operator input with missing or unparsable arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
