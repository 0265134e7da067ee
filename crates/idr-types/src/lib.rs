//! Foundation types for identity reconciliation.
//!
//! This crate provides the record, identifier, and response types shared by
//! every other `idr` crate. It has no storage or I/O concerns.
//!
//! # Key Types
//!
//! - [`ContactRecord`] — A stored contact point, either primary or secondary
//! - [`LinkPrecedence`] — Whether a record is the canonical root of its group
//! - [`NewContact`] — Field set for a record about to be inserted
//! - [`Identifier`] — An incoming `(email?, phoneNumber?)` pair
//! - [`ConsolidatedContact`] — The canonical view of one identity group

pub mod consolidated;
pub mod contact;
pub mod error;
pub mod identifier;

pub use consolidated::ConsolidatedContact;
pub use contact::{ContactId, ContactRecord, LinkPrecedence, NewContact};
pub use error::TypeError;
pub use identifier::Identifier;
