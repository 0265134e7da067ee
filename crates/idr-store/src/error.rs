use idr_types::ContactId;

/// Errors from contact store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested record was not found.
    #[error("contact not found: {0}")]
    NotFound(ContactId),

    /// An insert would break group linkage (chained or dangling link).
    #[error("invalid link: {0}")]
    InvalidLink(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The journal contains an entry that cannot be applied.
    #[error("corrupt journal at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    /// A journal append failed and could not be rolled back; the store
    /// refuses further writes until it is reopened.
    #[error("journal write failed at offset {offset} and was not rolled back; reopen the store")]
    Wedged { offset: u64 },

    /// A lock guarding store state was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    Poisoned(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
