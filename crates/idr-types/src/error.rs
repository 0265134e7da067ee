use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown link precedence: {0}")]
    UnknownPrecedence(String),

    #[error("invalid contact id: {0}")]
    InvalidContactId(String),
}
