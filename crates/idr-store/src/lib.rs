//! Contact record storage for identity reconciliation.
//!
//! The resolver only ever talks to a [`ContactStore`]: two lookups and one
//! insert. Everything about how records are kept lives behind that trait.
//!
//! # Storage Backends
//!
//! - [`InMemoryContactStore`] -- `RwLock`-guarded table for tests and embedding
//! - [`JournalContactStore`] -- append-only, CRC-framed journal replayed on open
//!
//! # Design Rules
//!
//! 1. Records are immutable once inserted; the only later change is the
//!    external soft-delete marker.
//! 2. Soft-deleted records never match a lookup.
//! 3. Lookups return records in ascending `(created_at, id)` order.
//! 4. `created_at` is strictly increasing across inserts into one store.
//! 5. A secondary must link directly to a live primary; a primary never links.

pub mod error;
pub mod journal;
pub mod memory;
pub mod seed;
pub mod traits;

mod table;

pub use error::{StoreError, StoreResult};
pub use journal::{JournalConfig, JournalContactStore, JournalEvent, SyncMode};
pub use memory::InMemoryContactStore;
pub use seed::seed_demo;
pub use traits::ContactStore;
