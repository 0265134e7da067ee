use std::collections::BTreeSet;

use idr_types::{ContactId, ContactRecord, NewContact};

use crate::error::StoreResult;

/// Durable home of contact records.
///
/// All implementations must satisfy these invariants:
/// - Lookups exclude soft-deleted records.
/// - Lookups return records ordered by ascending `(created_at, id)`.
/// - Matching is exact string equality; an absent input adds no predicate.
/// - A call observes every insert that completed before it (read-your-writes).
pub trait ContactStore: Send + Sync {
    /// Records whose email equals `email` or whose phone number equals
    /// `phone_number`.
    ///
    /// With both inputs absent there is nothing to match and the result is empty.
    fn find_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> StoreResult<Vec<ContactRecord>>;

    /// Records whose id is in `roots` or whose `linked_id` is in `roots`.
    ///
    /// Given a set of primary ids this is the full membership of their groups.
    fn find_by_ids_or_linked_ids(
        &self,
        roots: &BTreeSet<ContactId>,
    ) -> StoreResult<Vec<ContactRecord>>;

    /// Insert a record, assigning its id and timestamps.
    fn insert(&self, contact: NewContact) -> StoreResult<ContactRecord>;

    /// Read a record by id, soft-deleted or not.
    ///
    /// Returns `Ok(None)` if no record has this id.
    fn get(&self, id: ContactId) -> StoreResult<Option<ContactRecord>>;

    /// Every record in creation order, soft-deleted ones included.
    fn all(&self) -> StoreResult<Vec<ContactRecord>>;

    /// Full membership of the group rooted at `root`.
    fn group(&self, root: ContactId) -> StoreResult<Vec<ContactRecord>> {
        self.find_by_ids_or_linked_ids(&BTreeSet::from([root]))
    }
}
