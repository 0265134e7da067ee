//! Demo dataset for local runs.

use idr_types::{ContactRecord, NewContact};
use tracing::info;

use crate::error::StoreResult;
use crate::traits::ContactStore;

/// Insert one demo identity group: a primary with two secondaries, one adding
/// an email and one adding a phone number.
pub fn seed_demo(store: &dyn ContactStore) -> StoreResult<Vec<ContactRecord>> {
    let primary = store.insert(NewContact::primary(
        Some("john@example.com".into()),
        Some("9999999999".into()),
    ))?;
    let alt_email = store.insert(NewContact::secondary(
        primary.id,
        Some("john.alt@example.com".into()),
        None,
    ))?;
    let alt_phone = store.insert(NewContact::secondary(
        primary.id,
        None,
        Some("8888888888".into()),
    ))?;

    info!(primary = %primary.id, "demo contacts seeded");
    Ok(vec![primary, alt_email, alt_phone])
}
