use thiserror::Error;

/// Errors surfaced at the edges of the crate (configuration, scenario setup).
///
/// The per-tick controller never returns these; its failures are state transitions.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ControlError>;
