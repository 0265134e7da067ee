use thiserror::Error;

/// Errors from identity resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Neither an email nor a phone number was given.
    #[error("at least one of email or phoneNumber is required")]
    EmptyIdentifier,

    /// Consolidation was asked for over zero records.
    #[error("no contacts found")]
    NotFound,

    /// A member set has no primary record: stored linkage is corrupt.
    #[error("no primary contact among {member_count} group members")]
    MissingPrimary { member_count: usize },

    /// Failure in the underlying contact store.
    #[error("store error: {0}")]
    Store(#[from] idr_store::StoreError),
}

impl ResolveError {
    /// Returns `true` for failures the caller did not cause: broken linkage
    /// or a store fault.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::MissingPrimary { .. } | Self::Store(_))
    }
}

/// Result alias for resolver operations.
pub type ResolveResult<T> = Result<T, ResolveError>;
