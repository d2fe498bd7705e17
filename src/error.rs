//! Custom error types for Concess.
//!
//! This module provides a centralized error handling system with specific error types
//! for different parts of the application. Domain-rule violations (already in
//! service, absence already decided, ...) live next to their ledgers as small
//! typed enums; this type covers the infrastructure concerns.

use std::fmt;

/// Main error type for Concess operations.
#[derive(Debug)]
pub enum ConcessError {
    /// Configuration errors (missing env vars, invalid values)
    Config(String),
    /// Persistence document errors
    Storage(String),
    /// FiveM endpoint errors (bad status, malformed payload)
    FivemApi(String),
    /// Network/HTTP errors
    Network(String),
    /// Discord bot errors
    Discord(String),
    /// Validation errors (invalid ids, etc.)
    Validation(String),
    /// Generic I/O errors
    Io(std::io::Error),
    /// Invalid input errors
    InvalidInput(String),
}

impl fmt::Display for ConcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Storage(msg) => write!(f, "Storage error: {}", msg),
            Self::FivemApi(msg) => write!(f, "FiveM API error: {}", msg),
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Discord(msg) => write!(f, "Discord error: {}", msg),
            Self::Validation(msg) => write!(f, "Validation error: {}", msg),
            Self::Io(err) => write!(f, "I/O error: {}", err),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for ConcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConcessError::Io(err) => Some(err),
            _ => None,
        }
    }
}

// Implement From traits for automatic error conversion
impl From<std::io::Error> for ConcessError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<reqwest::Error> for ConcessError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ConcessError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("JSON error: {}", err))
    }
}

impl From<std::env::VarError> for ConcessError {
    fn from(err: std::env::VarError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for Concess operations.
pub type Result<T> = std::result::Result<T, ConcessError>;
