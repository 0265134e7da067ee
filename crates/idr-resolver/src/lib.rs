//! Identity resolution over a [`ContactStore`](idr_store::ContactStore).
//!
//! Given an email and/or phone number, the [`IdentityResolver`] finds the
//! identity groups those identifiers already belong to, links the pair into
//! the canonical group when it carries new information, and returns a
//! [`ConsolidatedContact`](idr_types::ConsolidatedContact) for that group.
//!
//! # Pipeline
//!
//! 1. Look up every live record sharing the email or the phone number.
//! 2. Nothing found: insert a new primary and return it alone.
//! 3. Expand the matches to the full membership of every touched group.
//! 4. Pick the earliest-created primary as canonical.
//! 5. Decide whether the pair adds an email or phone the group lacks.
//! 6. If so, insert a secondary under the canonical primary and re-read the group.
//! 7. Consolidate emails, phone numbers, and secondary ids in creation order.
//!
//! At most one record is inserted per call. Nothing is ever updated or deleted.
//!
//! An identifier with neither an email nor a phone number is refused with
//! [`ResolveError::EmptyIdentifier`] and never reaches the store. A caller
//! that forwarded it would otherwise get an empty primary created for it.
//!
//! # Concurrency
//!
//! The resolver takes no locks. Two concurrent calls for the same unseen
//! identifier can both miss in step 1 and both insert a primary. Callers
//! that need one group per identifier must serialize calls (the server does
//! this with a mutex) or enforce uniqueness in the store.

pub mod consolidate;
pub mod error;
pub mod resolver;

pub use consolidate::{consolidate, needs_secondary, select_primary};
pub use error::{ResolveError, ResolveResult};
pub use resolver::{IdentityResolver, Resolution};
