//! Errors surfaced to the top-level handler.

use thiserror::Error;
use todo_core::{ApiError, ConfigError, FieldError};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("invalid date {0:?}: supported formats are YYYY-MM-DD, YYYY-MM-DDTHH:MM[:SS], MM/DD/YYYY, MM-DD-YYYY")]
    InvalidDate(String),

    #[error("invalid todo id {0:?}: expected a UUID")]
    InvalidId(String),

    #[error("no todos match {0:?}")]
    NoMatch(String),

    #[error("{query:?} matches {} todos; pass the id instead", .candidates.len())]
    Ambiguous {
        query: String,
        candidates: Vec<(Uuid, String)>,
    },

    #[error("selection cancelled")]
    Cancelled,

    #[error("could not read input: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Stable tag used in machine-readable error output.
    pub fn kind(&self) -> &'static str {
        match self {
            CliError::Config(_) => "config",
            CliError::Api(err) => err.kind(),
            CliError::InvalidDate(_) | CliError::InvalidId(_) => "invalid_input",
            CliError::NoMatch(_) => "no_match",
            CliError::Ambiguous { .. } => "ambiguous",
            CliError::Cancelled => "cancelled",
            CliError::Io(_) => "io",
        }
    }

    pub fn fields(&self) -> &[FieldError] {
        match self {
            CliError::Api(err) => err.fields(),
            _ => &[],
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CliError::Api(err) if err.is_retryable())
    }
}

impl From<FieldError> for CliError {
    fn from(value: FieldError) -> Self {
        CliError::Api(ApiError::Validation(vec![value]))
    }
}

impl From<Vec<FieldError>> for CliError {
    fn from(value: Vec<FieldError>) -> Self {
        CliError::Api(ApiError::Validation(value))
    }
}
