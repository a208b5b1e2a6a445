use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Semantic role of a span, derived from its visual prominence.
///
/// Declaration order doubles as the canonical ordering used when a set of
/// roles is serialized (e.g. the `text_types` column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Title,
    Heading1,
    Heading2,
    Heading3,
    Body,
    Bold,
    Bullet,
    NumberedList,
    Caption,
    Footnote,
}

impl Role {
    pub const ALL: [Role; 10] = [
        Role::Title,
        Role::Heading1,
        Role::Heading2,
        Role::Heading3,
        Role::Body,
        Role::Bold,
        Role::Bullet,
        Role::NumberedList,
        Role::Caption,
        Role::Footnote,
    ];

    /// Roles that carry a weight in multi-field scoring.
    pub const WEIGHTED: [Role; 6] = [
        Role::Title,
        Role::Heading1,
        Role::Heading2,
        Role::Heading3,
        Role::Body,
        Role::Bold,
    ];

    pub const HEADINGS: [Role; 3] = [Role::Heading1, Role::Heading2, Role::Heading3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Title => "title",
            Role::Heading1 => "heading1",
            Role::Heading2 => "heading2",
            Role::Heading3 => "heading3",
            Role::Body => "body",
            Role::Bold => "bold",
            Role::Bullet => "bullet",
            Role::NumberedList => "numbered_list",
            Role::Caption => "caption",
            Role::Footnote => "footnote",
        }
    }

    /// Name of the searchable index field holding this role's text.
    pub fn field_name(&self) -> String {
        format!("{}_content", self.as_str())
    }

    /// Name of the stored weight field for this role, if the role is weighted.
    pub fn weight_field_name(&self) -> Option<String> {
        self.weight().map(|_| format!("{}_weight", self.as_str()))
    }

    /// Fixed query-time boost for the role. Identical for every document.
    pub fn weight(&self) -> Option<u32> {
        match self {
            Role::Title => Some(7),
            Role::Heading1 => Some(6),
            Role::Heading2 => Some(5),
            Role::Heading3 => Some(4),
            Role::Body => Some(3),
            Role::Bold => Some(4),
            _ => None,
        }
    }

    pub fn is_heading(&self) -> bool {
        Role::HEADINGS.contains(self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown text role: '{0}'")]
pub struct InvalidRole(pub String);

impl FromStr for Role {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| InvalidRole(s.to_string()))
    }
}

/// Join a set of roles into the comma-separated `text_types` representation.
pub fn join_roles<'a>(roles: impl IntoIterator<Item = &'a Role>) -> String {
    roles
        .into_iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a comma-separated `text_types` value. Empty segments are skipped.
pub fn split_roles(value: &str) -> Result<Vec<Role>, InvalidRole> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Role::from_str)
        .collect()
}
