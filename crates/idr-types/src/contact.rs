use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Store-assigned identifier of a contact record.
///
/// Ids are allocated by the contact store on insert and never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(u64);

impl ContactId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContactId({})", self.0)
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ContactId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl FromStr for ContactId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| TypeError::InvalidContactId(s.to_string()))
    }
}

/// Position of a record within its identity group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPrecedence {
    /// The canonical, earliest-created record of a group.
    Primary,
    /// An additional identifier combination linked to a primary.
    Secondary,
}

impl LinkPrecedence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl fmt::Display for LinkPrecedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkPrecedence {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Self::Primary),
            "secondary" => Ok(Self::Secondary),
            other => Err(TypeError::UnknownPrecedence(other.to_string())),
        }
    }
}

/// A stored contact point.
///
/// A group is a primary record plus every record whose `linked_id` names it.
/// Secondaries always point straight at their primary; there are no chains.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    pub id: ContactId,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub linked_id: Option<ContactId>,
    pub link_precedence: LinkPrecedence,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ContactRecord {
    pub fn is_primary(&self) -> bool {
        self.link_precedence == LinkPrecedence::Primary
    }

    pub fn is_secondary(&self) -> bool {
        self.link_precedence == LinkPrecedence::Secondary
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Id of the primary this record belongs to.
    ///
    /// Returns `None` for a secondary without a link, which only happens
    /// when the stored linkage is corrupt.
    pub fn group_root(&self) -> Option<ContactId> {
        match self.link_precedence {
            LinkPrecedence::Primary => Some(self.id),
            LinkPrecedence::Secondary => self.linked_id,
        }
    }

    /// Ordering key used everywhere records are sorted: creation time, then id.
    pub fn sort_key(&self) -> (DateTime<Utc>, ContactId) {
        (self.created_at, self.id)
    }

    pub fn has_email(&self, email: &str) -> bool {
        self.email.as_deref() == Some(email)
    }

    pub fn has_phone_number(&self, phone_number: &str) -> bool {
        self.phone_number.as_deref() == Some(phone_number)
    }
}

/// Fields of a record about to be inserted. The store assigns id and timestamps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub linked_id: Option<ContactId>,
    pub link_precedence: LinkPrecedence,
}

impl NewContact {
    /// A new group root.
    pub fn primary(email: Option<String>, phone_number: Option<String>) -> Self {
        Self {
            email,
            phone_number,
            linked_id: None,
            link_precedence: LinkPrecedence::Primary,
        }
    }

    /// A new member of the group rooted at `root`.
    pub fn secondary(
        root: ContactId,
        email: Option<String>,
        phone_number: Option<String>,
    ) -> Self {
        Self {
            email,
            phone_number,
            linked_id: Some(root),
            link_precedence: LinkPrecedence::Secondary,
        }
    }

    /// Materialize into a full record with store-assigned id and timestamp.
    pub fn into_record(self, id: ContactId, created_at: DateTime<Utc>) -> ContactRecord {
        ContactRecord {
            id,
            email: self.email,
            phone_number: self.phone_number,
            linked_id: self.linked_id,
            link_precedence: self.link_precedence,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        }
    }
}
