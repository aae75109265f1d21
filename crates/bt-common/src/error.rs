//! Error types for the bowtie network engine.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//!
//! Only structural errors are meant to reach callers of the engine. Input,
//! dependency, and validation problems are logged and met with a documented
//! fallback by the code that detects them; the variants exist so those call
//! sites can still describe what went wrong in a uniform way.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for bowtie network operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed or empty bowtie rows.
    Input,
    /// Internal graph/CPT inconsistency or an intractable structure.
    Structure,
    /// Inference backend missing or unable to produce a result.
    Dependency,
    /// Recoverable value problems (negative risk, too few levels).
    Validation,
    /// Configuration file errors.
    Config,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Structure => write!(f, "structure"),
            ErrorCategory::Dependency => write!(f, "dependency"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for the bowtie network engine.
#[derive(Error, Debug)]
pub enum Error {
    // Input errors (10-19)
    #[error("invalid bowtie input: {0}")]
    InputData(String),

    // Structure errors (20-29)
    #[error("inconsistent network structure: {0}")]
    Structure(String),

    #[error("edge {from} -> {to} references unknown node {missing}")]
    DanglingReference {
        from: String,
        to: String,
        missing: String,
    },

    #[error("{what} exceeds limit: {actual} > {limit}")]
    ComplexityLimit {
        what: String,
        actual: usize,
        limit: usize,
    },

    // Dependency errors (30-39)
    #[error("inference backend unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("inference failed: {0}")]
    Inference(String),

    // Validation errors (40-49)
    #[error("invalid value for {field}: {message}")]
    Validation { field: String, message: String },

    // Configuration errors (50-59)
    #[error("configuration error: {0}")]
    Config(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Input errors
    /// - 20-29: Structure errors
    /// - 30-39: Dependency errors
    /// - 40-49: Validation errors
    /// - 50-59: Configuration errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::InputData(_) => 10,
            Error::Structure(_) => 20,
            Error::DanglingReference { .. } => 21,
            Error::ComplexityLimit { .. } => 22,
            Error::DependencyUnavailable(_) => 30,
            Error::Inference(_) => 31,
            Error::Validation { .. } => 40,
            Error::Config(_) => 50,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InputData(_) => ErrorCategory::Input,
            Error::Structure(_) | Error::DanglingReference { .. } | Error::ComplexityLimit { .. } => {
                ErrorCategory::Structure
            }
            Error::DependencyUnavailable(_) | Error::Inference(_) => ErrorCategory::Dependency,
            Error::Validation { .. } => ErrorCategory::Validation,
            Error::Config(_) => ErrorCategory::Config,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Shorthand for a validation error on a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::InputData(_) => "Invalid Bowtie Input",
            Error::Structure(_) => "Structure Error",
            Error::DanglingReference { .. } => "Dangling Node Reference",
            Error::ComplexityLimit { .. } => "Network Too Large",
            Error::DependencyUnavailable(_) => "Inference Unavailable",
            Error::Inference(_) => "Inference Error",
            Error::Validation { .. } => "Validation Warning",
            Error::Config(_) => "Configuration Error",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
        }
    }
}
