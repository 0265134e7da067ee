//! Pure functions over a group's member set.

use std::iter;

use idr_types::{ConsolidatedContact, ContactRecord, Identifier};

use crate::error::{ResolveError, ResolveResult};

/// The canonical primary of a member set: the earliest-created primary.
///
/// A member set spanning two groups has two primaries; the older one wins.
pub fn select_primary(members: &[ContactRecord]) -> ResolveResult<&ContactRecord> {
    members
        .iter()
        .filter(|r| r.is_primary())
        .min_by_key(|r| r.sort_key())
        .ok_or(ResolveError::MissingPrimary {
            member_count: members.len(),
        })
}

/// Build the canonical view of a member set.
///
/// The canonical primary's email and phone come first; secondaries follow in
/// creation order with duplicates and nulls dropped. Primaries other than the
/// canonical one do not contribute.
pub fn consolidate(members: &[ContactRecord]) -> ResolveResult<ConsolidatedContact> {
    if members.is_empty() {
        return Err(ResolveError::NotFound);
    }
    let primary = select_primary(members)?;

    let mut secondaries: Vec<&ContactRecord> =
        members.iter().filter(|r| r.is_secondary()).collect();
    secondaries.sort_by_key(|r| r.sort_key());

    let mut emails: Vec<String> = Vec::new();
    let mut phone_numbers: Vec<String> = Vec::new();
    for record in iter::once(primary).chain(secondaries.iter().copied()) {
        if let Some(email) = &record.email {
            push_unique(&mut emails, email);
        }
        if let Some(phone) = &record.phone_number {
            push_unique(&mut phone_numbers, phone);
        }
    }

    Ok(ConsolidatedContact {
        primary_contact_id: primary.id,
        emails,
        phone_numbers,
        secondary_contact_ids: secondaries.iter().map(|r| r.id).collect(),
    })
}

/// Whether `identifier` carries an email or phone number the group lacks.
///
/// Coverage is checked against the canonical primary and every secondary in
/// `members`; other primaries in a cross-group member set do not count.
pub fn needs_secondary(
    primary: &ContactRecord,
    members: &[ContactRecord],
    identifier: &Identifier,
) -> bool {
    if identifier.is_empty() {
        return false;
    }
    let email = identifier.email_str();
    let phone = identifier.phone_str();

    let exact_match = members
        .iter()
        .any(|r| r.email.as_deref() == email && r.phone_number.as_deref() == phone);
    if exact_match {
        return false;
    }

    let primary_has_email = email.map_or(true, |e| primary.has_email(e));
    let primary_has_phone = phone.map_or(true, |p| primary.has_phone_number(p));
    if primary_has_email && primary_has_phone {
        return false;
    }

    let covering = || iter::once(primary).chain(members.iter().filter(|r| r.is_secondary()));
    let email_covered = email.map_or(true, |e| covering().any(|r| r.has_email(e)));
    let phone_covered = phone.map_or(true, |p| covering().any(|r| r.has_phone_number(p)));

    !(email_covered && phone_covered)
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use idr_types::{ContactId, NewContact};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn primary(id: u64, secs: i64, email: Option<&str>, phone: Option<&str>) -> ContactRecord {
        NewContact::primary(email.map(Into::into), phone.map(Into::into))
            .into_record(ContactId::new(id), at(secs))
    }

    fn secondary(
        id: u64,
        root: u64,
        secs: i64,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> ContactRecord {
        NewContact::secondary(ContactId::new(root), email.map(Into::into), phone.map(Into::into))
            .into_record(ContactId::new(id), at(secs))
    }

    #[test]
    fn lone_primary_consolidates_to_itself() {
        let view = consolidate(&[primary(1, 0, Some("a@x.com"), Some("111"))]).unwrap();
        assert_eq!(view.primary_contact_id, ContactId::new(1));
        assert_eq!(view.emails, vec!["a@x.com"]);
        assert_eq!(view.phone_numbers, vec!["111"]);
        assert!(view.secondary_contact_ids.is_empty());
    }

    #[test]
    fn primary_values_come_first_then_creation_order() {
        // Member set handed over out of order.
        let members = vec![
            secondary(3, 1, 20, Some("c@x.com"), Some("333")),
            primary(1, 0, Some("a@x.com"), Some("111")),
            secondary(2, 1, 10, Some("b@x.com"), Some("111")),
            secondary(4, 1, 30, Some("a@x.com"), None),
        ];
        let view = consolidate(&members).unwrap();
        assert_eq!(view.primary_contact_id, ContactId::new(1));
        assert_eq!(view.emails, vec!["a@x.com", "b@x.com", "c@x.com"]);
        assert_eq!(view.phone_numbers, vec!["111", "333"]);
        assert_eq!(
            view.secondary_contact_ids,
            vec![ContactId::new(2), ContactId::new(3), ContactId::new(4)]
        );
    }

    #[test]
    fn primary_without_email_does_not_lead_emails() {
        let members = vec![
            primary(1, 0, None, Some("111")),
            secondary(2, 1, 10, Some("b@x.com"), None),
        ];
        let view = consolidate(&members).unwrap();
        assert_eq!(view.emails, vec!["b@x.com"]);
        assert_eq!(view.phone_numbers, vec!["111"]);
    }

    #[test]
    fn empty_member_set_is_not_found() {
        assert!(matches!(consolidate(&[]), Err(ResolveError::NotFound)));
    }

    #[test]
    fn member_set_without_primary_is_internal_error() {
        let err = consolidate(&[secondary(2, 1, 10, Some("b@x.com"), None)]).unwrap_err();
        assert!(matches!(err, ResolveError::MissingPrimary { member_count: 1 }));
        assert!(err.is_internal());
    }

    #[test]
    fn earliest_primary_wins_across_groups() {
        let members = vec![
            primary(5, 50, Some("late@x.com"), Some("555")),
            primary(1, 0, Some("early@x.com"), Some("111")),
            secondary(6, 5, 60, None, Some("666")),
        ];
        assert_eq!(select_primary(&members).unwrap().id, ContactId::new(1));

        // The losing primary's own values are left out of the view.
        let view = consolidate(&members).unwrap();
        assert_eq!(view.primary_contact_id, ContactId::new(1));
        assert_eq!(view.emails, vec!["early@x.com"]);
        assert_eq!(view.phone_numbers, vec!["111", "666"]);
        assert_eq!(view.secondary_contact_ids, vec![ContactId::new(6)]);
    }

    #[test]
    fn no_secondary_for_exact_match() {
        let p = primary(1, 0, Some("a@x.com"), Some("111"));
        let members = vec![p.clone(), secondary(2, 1, 10, Some("b@x.com"), Some("222"))];
        assert!(!needs_secondary(&p, &members, &Identifier::both("b@x.com", "222")));
        assert!(!needs_secondary(&p, &members, &Identifier::both("a@x.com", "111")));
    }

    #[test]
    fn no_secondary_when_primary_has_given_field() {
        let p = primary(1, 0, Some("a@x.com"), Some("111"));
        let members = vec![p.clone()];
        assert!(!needs_secondary(&p, &members, &Identifier::email("a@x.com")));
        assert!(!needs_secondary(&p, &members, &Identifier::phone_number("111")));
    }

    #[test]
    fn no_secondary_when_fields_covered_by_different_members() {
        let p = primary(1, 0, Some("a@x.com"), Some("111"));
        let members = vec![p.clone(), secondary(2, 1, 10, Some("b@x.com"), None)];
        assert!(!needs_secondary(&p, &members, &Identifier::both("b@x.com", "111")));
    }

    #[test]
    fn secondary_needed_for_new_phone() {
        let p = primary(1, 0, Some("a@x.com"), Some("111"));
        assert!(needs_secondary(&p, &[p.clone()], &Identifier::both("a@x.com", "222")));
    }

    #[test]
    fn losing_primary_does_not_cover() {
        let p = primary(1, 0, Some("a@x.com"), Some("111"));
        let other = primary(2, 10, Some("b@x.com"), Some("222"));
        let members = vec![p.clone(), other];
        assert!(needs_secondary(&p, &members, &Identifier::both("a@x.com", "222")));
    }

    #[test]
    fn empty_identifier_never_needs_secondary() {
        let p = primary(1, 0, Some("a@x.com"), None);
        assert!(!needs_secondary(&p, &[p.clone()], &Identifier::default()));
    }
}
