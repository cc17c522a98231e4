//! # Error Handling
//!
//! Provides the unified `AppError` enum used across the pipeline.

use derive_more::{Display, From};

/// The Global Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// Wrapper for standard IO errors.
    #[display("IO Error: {_0}")]
    Io(std::io::Error),

    /// An endpoint or companion file could not be parsed.
    #[from(ignore)]
    #[display("Parse Error in {path}: {message}")]
    Parse {
        /// Display form of the offending file path.
        path: String,
        /// Parser diagnostic.
        message: String,
    },

    /// A schema expression the resolver does not understand.
    #[from(ignore)]
    #[display("Unsupported schema expression: {_0}")]
    UnsupportedSchema(String),

    /// The generated artifact failed to re-parse or format.
    #[from(ignore)]
    #[display("Codegen Error: {_0}")]
    Codegen(String),

    /// Configuration file errors.
    #[from(ignore)]
    #[display("Config Error: {_0}")]
    Config(String),

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

impl AppError {
    /// Builds a `Parse` error for `path`.
    pub fn parse(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        AppError::Parse {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;
