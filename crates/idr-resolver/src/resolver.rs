use std::collections::BTreeSet;
use std::sync::Arc;

use idr_store::ContactStore;
use idr_types::{ConsolidatedContact, ContactId, ContactRecord, Identifier, NewContact};
use tracing::{debug, info, warn};

use crate::consolidate::{consolidate, needs_secondary, select_primary};
use crate::error::{ResolveError, ResolveResult};

/// Outcome of a single [`IdentityResolver::resolve_detailed`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Canonical view of the resolved group.
    pub contact: ConsolidatedContact,
    /// The record inserted by this call, if any.
    pub created: Option<ContactRecord>,
    /// Roots of every group the lookup touched, canonical one included.
    pub touched_roots: Vec<ContactId>,
}

/// Resolves identifiers against a contact store.
///
/// The store handle is injected by the caller; the resolver keeps no other
/// state and can be shared freely across threads.
pub struct IdentityResolver<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ContactStore + ?Sized> IdentityResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Resolve `identifier` to the canonical view of its identity group,
    /// creating a primary or linking a secondary when needed.
    pub fn resolve(&self, identifier: &Identifier) -> ResolveResult<ConsolidatedContact> {
        self.resolve_detailed(identifier).map(|r| r.contact)
    }

    /// Like [`resolve`](Self::resolve), also reporting what was written.
    ///
    /// An identifier with neither field is refused with
    /// [`ResolveError::EmptyIdentifier`] before the store is queried, rather
    /// than being passed through to lookup and insert.
    pub fn resolve_detailed(&self, identifier: &Identifier) -> ResolveResult<Resolution> {
        if identifier.is_empty() {
            return Err(ResolveError::EmptyIdentifier);
        }
        let email = identifier.email_str();
        let phone = identifier.phone_str();

        let candidates = self.store.find_by_email_or_phone(email, phone)?;
        debug!(candidates = candidates.len(), "candidate lookup");

        if candidates.is_empty() {
            let created = self.store.insert(NewContact::primary(
                identifier.email.clone(),
                identifier.phone_number.clone(),
            ))?;
            info!(id = %created.id, "new primary contact created");
            return Ok(Resolution {
                contact: consolidate(std::slice::from_ref(&created))?,
                touched_roots: vec![created.id],
                created: Some(created),
            });
        }

        let roots = group_roots(&candidates);
        let members = self.store.find_by_ids_or_linked_ids(&roots)?;
        debug!(roots = roots.len(), members = members.len(), "group expansion");

        let primary = select_primary(&members)?.clone();
        if roots.len() > 1 {
            warn!(
                canonical = %primary.id,
                roots = ?roots,
                "identifier spans several groups; answering for the earliest primary"
            );
        }

        if !needs_secondary(&primary, &members, identifier) {
            return Ok(Resolution {
                contact: consolidate(&members)?,
                created: None,
                touched_roots: roots.into_iter().collect(),
            });
        }

        let created = self.store.insert(NewContact::secondary(
            primary.id,
            identifier.email.clone(),
            identifier.phone_number.clone(),
        ))?;
        info!(id = %created.id, primary = %primary.id, "secondary contact linked");

        let refreshed = self.store.group(primary.id)?;
        Ok(Resolution {
            contact: consolidate(&refreshed)?,
            created: Some(created),
            touched_roots: roots.into_iter().collect(),
        })
    }
}

impl<S: ?Sized> Clone for IdentityResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ?Sized> std::fmt::Debug for IdentityResolver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver").finish_non_exhaustive()
    }
}

/// Distinct group roots of `candidates`.
fn group_roots(candidates: &[ContactRecord]) -> BTreeSet<ContactId> {
    candidates
        .iter()
        .filter_map(|r| {
            let root = r.group_root();
            if root.is_none() {
                warn!(id = %r.id, "secondary contact without linked primary; ignoring");
            }
            root
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use idr_store::{InMemoryContactStore, StoreError, StoreResult};
    use proptest::prelude::*;

    fn resolver() -> IdentityResolver<InMemoryContactStore> {
        IdentityResolver::new(Arc::new(InMemoryContactStore::new()))
    }

    fn ids(raw: &[u64]) -> Vec<ContactId> {
        raw.iter().copied().map(ContactId::new).collect()
    }

    #[test]
    fn new_identifier_creates_primary() {
        let r = resolver();
        let view = r.resolve(&Identifier::both("a@x.com", "111")).unwrap();

        assert_eq!(view.primary_contact_id, ContactId::new(1));
        assert_eq!(view.emails, vec!["a@x.com"]);
        assert_eq!(view.phone_numbers, vec!["111"]);
        assert!(view.secondary_contact_ids.is_empty());

        let all = r.store().all().unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_primary());
        assert_eq!(all[0].linked_id, None);
    }

    #[test]
    fn partial_identifier_stores_null_for_absent_field() {
        let r = resolver();
        let view = r.resolve(&Identifier::phone_number("111")).unwrap();
        assert!(view.emails.is_empty());
        let record = r.store().get(view.primary_contact_id).unwrap().unwrap();
        assert_eq!(record.email, None);
        assert_eq!(record.phone_number.as_deref(), Some("111"));
    }

    #[test]
    fn exact_duplicate_creates_nothing() {
        let r = resolver();
        let first = r.resolve(&Identifier::both("a@x.com", "111")).unwrap();
        let second = r.resolve_detailed(&Identifier::both("a@x.com", "111")).unwrap();
        assert_eq!(second.contact, first);
        assert!(second.created.is_none());
        assert_eq!(r.store().all().unwrap().len(), 1);
    }

    #[test]
    fn new_phone_links_secondary() {
        let r = resolver();
        r.resolve(&Identifier::both("a@x.com", "111")).unwrap();
        let res = r.resolve_detailed(&Identifier::both("a@x.com", "222")).unwrap();

        let created = res.created.expect("secondary created");
        assert!(created.is_secondary());
        assert_eq!(created.linked_id, Some(ContactId::new(1)));

        assert_eq!(res.contact.primary_contact_id, ContactId::new(1));
        assert_eq!(res.contact.emails, vec!["a@x.com"]);
        assert_eq!(res.contact.phone_numbers, vec!["111", "222"]);
        assert_eq!(res.contact.secondary_contact_ids, ids(&[2]));
    }

    #[test]
    fn covered_identifiers_do_not_grow_group() {
        let r = resolver();
        r.resolve(&Identifier::both("a@x.com", "111")).unwrap();
        r.resolve(&Identifier::both("b@x.com", "111")).unwrap();
        let before = r.resolve(&Identifier::email("a@x.com")).unwrap();

        for identifier in [
            Identifier::email("b@x.com"),
            Identifier::phone_number("111"),
            Identifier::both("b@x.com", "111"),
            Identifier::both("a@x.com", "111"),
        ] {
            let view = r.resolve(&identifier).unwrap();
            assert_eq!(view, before, "{identifier:?} changed the group");
        }
        assert_eq!(r.store().all().unwrap().len(), 2);
    }

    #[test]
    fn lookup_by_secondary_field_reaches_whole_group() {
        let r = resolver();
        r.resolve(&Identifier::both("a@x.com", "111")).unwrap();
        r.resolve(&Identifier::both("b@x.com", "111")).unwrap();
        r.resolve(&Identifier::both("b@x.com", "222")).unwrap();

        let view = r.resolve(&Identifier::phone_number("222")).unwrap();
        assert_eq!(view.primary_contact_id, ContactId::new(1));
        assert_eq!(view.emails, vec!["a@x.com", "b@x.com"]);
        assert_eq!(view.phone_numbers, vec!["111", "222"]);
        assert_eq!(view.secondary_contact_ids, ids(&[2, 3]));
    }

    #[test]
    fn primary_id_is_stable_as_group_grows() {
        let r = resolver();
        let first = r.resolve(&Identifier::both("a@x.com", "111")).unwrap();
        for n in 0..5 {
            let view = r
                .resolve(&Identifier::both("a@x.com", format!("9{n}")))
                .unwrap();
            assert_eq!(view.primary_contact_id, first.primary_contact_id);
        }
        let view = r.resolve(&Identifier::email("a@x.com")).unwrap();
        assert_eq!(view.secondary_contact_ids, ids(&[2, 3, 4, 5, 6]));
        assert_eq!(view.phone_numbers[0], "111");
    }

    #[test]
    fn cross_group_request_links_under_earliest_primary() {
        let r = resolver();
        r.resolve(&Identifier::both("a@x.com", "111")).unwrap();
        r.resolve(&Identifier::both("b@x.com", "222")).unwrap();

        let res = r.resolve_detailed(&Identifier::both("a@x.com", "222")).unwrap();
        assert_eq!(res.touched_roots, ids(&[1, 2]));
        let created = res.created.expect("bridging secondary created");
        assert_eq!(created.linked_id, Some(ContactId::new(1)));

        // The later group keeps its own primary.
        let later = r.store().get(ContactId::new(2)).unwrap().unwrap();
        assert!(later.is_primary());

        // Response reflects the re-read canonical group only.
        assert_eq!(res.contact.primary_contact_id, ContactId::new(1));
        assert_eq!(res.contact.emails, vec!["a@x.com"]);
        assert_eq!(res.contact.phone_numbers, vec!["111", "222"]);
        assert_eq!(res.contact.secondary_contact_ids, ids(&[3]));
    }

    #[test]
    fn soft_deleted_records_are_invisible() {
        let store = Arc::new(InMemoryContactStore::new());
        let r = IdentityResolver::new(Arc::clone(&store));
        let first = r.resolve(&Identifier::both("a@x.com", "111")).unwrap();
        store.soft_delete(first.primary_contact_id, Utc::now()).unwrap();

        let view = r.resolve(&Identifier::both("a@x.com", "111")).unwrap();
        assert_eq!(view.primary_contact_id, ContactId::new(2));
        assert!(view.secondary_contact_ids.is_empty());
    }

    #[test]
    fn secondary_outliving_its_deleted_primary_is_internal_error() {
        let store = Arc::new(InMemoryContactStore::new());
        let r = IdentityResolver::new(Arc::clone(&store));
        r.resolve(&Identifier::both("a@x.com", "111")).unwrap();
        r.resolve(&Identifier::both("b@x.com", "111")).unwrap();
        store.soft_delete(ContactId::new(1), Utc::now()).unwrap();

        // The secondary is not promoted and nothing is written.
        let err = r.resolve(&Identifier::email("b@x.com")).unwrap_err();
        assert!(
            matches!(err, ResolveError::MissingPrimary { member_count: 1 }),
            "{err:?}"
        );
        assert!(err.is_internal());
        let secondary = store.get(ContactId::new(2)).unwrap().unwrap();
        assert!(secondary.is_secondary());
        assert_eq!(secondary.linked_id, Some(ContactId::new(1)));
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn empty_identifier_is_rejected_without_writes() {
        let r = resolver();
        let err = r.resolve(&Identifier::default()).unwrap_err();
        assert!(matches!(err, ResolveError::EmptyIdentifier));
        assert!(!err.is_internal());
        assert!(r.store().is_empty().unwrap());
    }

    #[test]
    fn works_through_a_trait_object() {
        let store: Arc<dyn ContactStore> = Arc::new(InMemoryContactStore::new());
        let r = IdentityResolver::new(store);
        let view = r.resolve(&Identifier::email("a@x.com")).unwrap();
        assert_eq!(view.primary_contact_id, ContactId::new(1));
    }

    /// Store whose lookups hit but whose group expansion finds no primary.
    struct OrphanStore {
        orphan: ContactRecord,
    }

    impl ContactStore for OrphanStore {
        fn find_by_email_or_phone(
            &self,
            _email: Option<&str>,
            _phone_number: Option<&str>,
        ) -> StoreResult<Vec<ContactRecord>> {
            Ok(vec![self.orphan.clone()])
        }

        fn find_by_ids_or_linked_ids(
            &self,
            _roots: &BTreeSet<ContactId>,
        ) -> StoreResult<Vec<ContactRecord>> {
            Ok(vec![self.orphan.clone()])
        }

        fn insert(&self, _contact: NewContact) -> StoreResult<ContactRecord> {
            Err(StoreError::Serialization("read-only".into()))
        }

        fn get(&self, _id: ContactId) -> StoreResult<Option<ContactRecord>> {
            Ok(None)
        }

        fn all(&self) -> StoreResult<Vec<ContactRecord>> {
            Ok(vec![self.orphan.clone()])
        }
    }

    #[test]
    fn group_without_primary_is_internal_error() {
        let orphan = NewContact::secondary(ContactId::new(1), Some("a@x.com".into()), None)
            .into_record(ContactId::new(2), Utc::now());
        let r = IdentityResolver::new(Arc::new(OrphanStore { orphan }));
        let err = r.resolve(&Identifier::email("a@x.com")).unwrap_err();
        assert!(matches!(err, ResolveError::MissingPrimary { .. }));
        assert!(err.is_internal());
    }

    fn identifier_strategy() -> impl Strategy<Value = Identifier> {
        let email = prop::option::of(prop::sample::select(vec!["a@x.com", "b@x.com", "c@x.com"]));
        let phone = prop::option::of(prop::sample::select(vec!["111", "222", "333"]));
        (email, phone)
            .prop_filter("one field required", |(e, p)| e.is_some() || p.is_some())
            .prop_map(|(e, p)| Identifier::new(e.map(Into::into), p.map(Into::into)))
    }

    proptest! {
        #[test]
        fn resolve_preserves_group_invariants(
            calls in prop::collection::vec(identifier_strategy(), 1..24)
        ) {
            let r = resolver();
            for identifier in &calls {
                let before = r.store().all().unwrap();
                let view = r.resolve(identifier).unwrap();
                let after = r.store().all().unwrap();

                // At most one insert, and existing records are untouched.
                prop_assert!(after.len() <= before.len() + 1);
                prop_assert_eq!(&after[..before.len()], &before[..]);

                // Repeating the call writes nothing and keeps the primary.
                let again = r.resolve(identifier).unwrap();
                prop_assert_eq!(r.store().all().unwrap().len(), after.len());
                prop_assert_eq!(again.primary_contact_id, view.primary_contact_id);

                // The answer names a primary and lists secondaries oldest first.
                let primary = r.store().get(view.primary_contact_id).unwrap().unwrap();
                prop_assert!(primary.is_primary());
                let mut sorted = view.secondary_contact_ids.clone();
                sorted.sort();
                prop_assert_eq!(&sorted, &view.secondary_contact_ids);
                if let Some(email) = &primary.email {
                    prop_assert_eq!(view.emails.first(), Some(email));
                }
                if let Some(phone) = &primary.phone_number {
                    prop_assert_eq!(view.phone_numbers.first(), Some(phone));
                }
            }

            // Every group has exactly one primary, and it is the oldest member.
            let all = r.store().all().unwrap();
            for record in all.iter().filter(|r| r.is_secondary()) {
                let root = all
                    .iter()
                    .find(|p| Some(p.id) == record.linked_id)
                    .expect("linked primary exists");
                prop_assert!(root.is_primary());
                prop_assert!(root.created_at < record.created_at);
            }
        }
    }
}
