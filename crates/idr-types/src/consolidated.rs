use serde::{Deserialize, Serialize};

use crate::contact::ContactId;

/// Canonical view of one identity group.
///
/// `emails` and `phone_numbers` start with the primary's own value (when it
/// has one) followed by secondaries' values in creation order, deduplicated.
/// `secondary_contact_ids` lists secondaries in creation order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedContact {
    pub primary_contact_id: ContactId,
    pub emails: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub secondary_contact_ids: Vec<ContactId>,
}

impl ConsolidatedContact {
    /// Number of records in the group, primary included.
    pub fn member_count(&self) -> usize {
        1 + self.secondary_contact_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_are_camel_case() {
        let view = ConsolidatedContact {
            primary_contact_id: ContactId::new(1),
            emails: vec!["a@x.com".into()],
            phone_numbers: vec!["111".into(), "222".into()],
            secondary_contact_ids: vec![ContactId::new(2)],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "primaryContactId": 1,
                "emails": ["a@x.com"],
                "phoneNumbers": ["111", "222"],
                "secondaryContactIds": [2],
            })
        );
        assert_eq!(view.member_count(), 2);
    }
}
