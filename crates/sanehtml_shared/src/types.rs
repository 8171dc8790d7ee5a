//! Error results that can be returned from the tree builder and its drivers

use crate::location::Location;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parser error that defines an error (message) on the given position
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    /// Parse error message
    pub message: String,
    /// Location of the error
    pub location: Location,
}

/// Serious errors and errors from third-party libraries. Malformed markup never ends up here,
/// it is recorded as a [`ParseError`] instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    IO(#[from] std::io::Error),

    #[error("token source error: {0}")]
    TokenSource(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("there was a problem: {0}")]
    Generic(String),
}

/// Result that can be returned which holds either T or an Error
pub type Result<T> = std::result::Result<T, anyhow::Error>;
