//! Shared record table behind both store backends.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use idr_types::{ContactId, ContactRecord, LinkPrecedence, NewContact};

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
pub(crate) struct ContactTable {
    /// Kept in insertion order, which is also `(created_at, id)` order.
    records: Vec<ContactRecord>,
    last_id: u64,
    last_created: Option<DateTime<Utc>>,
}

impl ContactTable {
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// Build the record an insert of `contact` would produce, without applying it.
    pub(crate) fn prepare(
        &self,
        contact: NewContact,
        now: DateTime<Utc>,
    ) -> StoreResult<ContactRecord> {
        self.check_link(&contact)?;
        let created_at = match self.last_created {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        Ok(contact.into_record(ContactId::new(self.last_id + 1), created_at))
    }

    /// Append a record produced by [`prepare`](Self::prepare) or replayed
    /// from a journal.
    pub(crate) fn apply_insert(&mut self, record: ContactRecord) {
        self.last_id = self.last_id.max(record.id.get());
        self.last_created = Some(match self.last_created {
            Some(last) => last.max(record.created_at),
            None => record.created_at,
        });
        self.records.push(record);
    }

    /// Never allocate ids up to and including `through`.
    pub(crate) fn reserve_through(&mut self, through: ContactId) {
        self.last_id = self.last_id.max(through.get());
    }

    /// Skip the next id and return it.
    pub(crate) fn reserve_next_id(&mut self) -> ContactId {
        self.last_id += 1;
        ContactId::new(self.last_id)
    }

    pub(crate) fn apply_soft_delete(
        &mut self,
        id: ContactId,
        at: DateTime<Utc>,
    ) -> StoreResult<ContactRecord> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        record.deleted_at = Some(at);
        record.updated_at = at;
        Ok(record.clone())
    }

    pub(crate) fn find_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> Vec<ContactRecord> {
        self.select(|r| {
            email.is_some_and(|e| r.has_email(e))
                || phone_number.is_some_and(|p| r.has_phone_number(p))
        })
    }

    pub(crate) fn find_by_ids_or_linked_ids(
        &self,
        roots: &BTreeSet<ContactId>,
    ) -> Vec<ContactRecord> {
        self.select(|r| {
            roots.contains(&r.id) || r.linked_id.is_some_and(|l| roots.contains(&l))
        })
    }

    pub(crate) fn get(&self, id: ContactId) -> Option<ContactRecord> {
        self.records.iter().find(|r| r.id == id).cloned()
    }

    pub(crate) fn all(&self) -> Vec<ContactRecord> {
        self.records.clone()
    }

    fn select(&self, predicate: impl Fn(&ContactRecord) -> bool) -> Vec<ContactRecord> {
        let mut found: Vec<ContactRecord> = self
            .records
            .iter()
            .filter(|r| !r.is_deleted() && predicate(r))
            .cloned()
            .collect();
        found.sort_by_key(ContactRecord::sort_key);
        found
    }

    fn check_link(&self, contact: &NewContact) -> StoreResult<()> {
        match (contact.link_precedence, contact.linked_id) {
            (LinkPrecedence::Primary, None) => Ok(()),
            (LinkPrecedence::Primary, Some(target)) => Err(StoreError::InvalidLink(format!(
                "primary record cannot link to {target}"
            ))),
            (LinkPrecedence::Secondary, None) => Err(StoreError::InvalidLink(
                "secondary record requires a linked primary".into(),
            )),
            (LinkPrecedence::Secondary, Some(target)) => match self.get(target) {
                Some(root) if root.is_primary() && !root.is_deleted() => Ok(()),
                Some(_) => Err(StoreError::InvalidLink(format!(
                    "{target} is not a live primary"
                ))),
                None => Err(StoreError::NotFound(target)),
            },
        }
    }
}
