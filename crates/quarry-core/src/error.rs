//! Error types for Quarry

use thiserror::Error;

/// Result type alias using Quarry's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Quarry error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Builder errors (E001-E099)
    #[error("Query builder is not initialized. Call `init` before mutating the criteria tree.")]
    BuilderNotInitialized,

    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    // Encoding errors (E100-E199)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to decode search tree: {0}")]
    Decode(String),

    // Collaborator errors (E200-E299)
    #[error("Label loading failed: {0}")]
    LabelLoad(String),

    #[error("Search failed: {0}")]
    SearchFailed(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::BuilderNotInitialized => "E001",
            Self::InvalidCriteria(_) => "E002",
            Self::Serialization(_) => "E100",
            Self::Decode(_) => "E101",
            Self::LabelLoad(_) => "E200",
            Self::SearchFailed(_) => "E201",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::BuilderNotInitialized => Some("QueryBuilder::init".to_string()),
            Self::Decode(_) => Some("quarry encode <file>".to_string()),
            Self::ConfigError(_) => Some("quarry config list".to_string()),
            _ => None,
        }
    }
}
