//! Typed reference records parsed from loosely-shaped API responses
//!
//! The facilities API is not consistent about field names across
//! deployments, so every field is read through an ordered alias table and the
//! first present, non-null value wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Field names holding a site's display name, in lookup order
pub const SITE_NAME_ALIASES: &[&str] = &["name", "site_name", "title"];
/// Field names holding a floor's display name
pub const FLOOR_NAME_ALIASES: &[&str] = &["name", "floor_name", "title"];
/// Field names holding a space's display name
pub const SPACE_NAME_ALIASES: &[&str] = &["name", "space_name", "title"];
/// Field names holding a user's login name
pub const USER_NAME_ALIASES: &[&str] = &["user_name", "username", "name"];
/// Field names holding a user's email address
pub const USER_EMAIL_ALIASES: &[&str] = &["email"];

/// Known aliases for the floor -> site foreign key
pub const FLOOR_SITE_ALIASES: &[&str] = &["siteId", "site_id", "location_id"];
/// Known aliases for the space -> floor foreign key
pub const SPACE_FLOOR_ALIASES: &[&str] = &["floorId", "floor_id"];

/// Entity types held by the reference index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Site,
    Floor,
    Space,
    User,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Site,
        EntityKind::Floor,
        EntityKind::Space,
        EntityKind::User,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Site => "site",
            EntityKind::Floor => "floor",
            EntityKind::Space => "space",
            EntityKind::User => "user",
        }
    }

    pub fn name_aliases(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Site => SITE_NAME_ALIASES,
            EntityKind::Floor => FLOOR_NAME_ALIASES,
            EntityKind::Space => SPACE_NAME_ALIASES,
            EntityKind::User => USER_NAME_ALIASES,
        }
    }

    /// Aliases of the foreign key pointing at the parent entity (empty for flat kinds)
    pub fn parent_aliases(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Floor => FLOOR_SITE_ALIASES,
            EntityKind::Space => SPACE_FLOOR_ALIASES,
            EntityKind::Site | EntityKind::User => &[],
        }
    }

    pub fn parent_kind(&self) -> Option<EntityKind> {
        match self {
            EntityKind::Floor => Some(EntityKind::Site),
            EntityKind::Space => Some(EntityKind::Floor),
            EntityKind::Site | EntityKind::User => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A site, floor, space or user as known to the facilities system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ReferenceRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            parent_id: None,
            email: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Parse one raw API entry.
    ///
    /// Returns `None` for entries that are not objects or carry no usable `id`;
    /// the caller counts those as dropped.
    pub fn from_value(kind: EntityKind, value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }

        let id = value.get("id").and_then(scalar_to_string)?;

        let email = if kind == EntityKind::User {
            first_present(value, USER_EMAIL_ALIASES)
        } else {
            None
        };

        Some(Self {
            id,
            name: first_present(value, kind.name_aliases()),
            parent_id: first_present(value, kind.parent_aliases()),
            email,
        })
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Render a scalar JSON value the way ids and names appear in CSV files.
///
/// Blank strings, nulls, arrays and objects yield `None`.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First alias carrying a present, non-null value
pub fn first_present(value: &Value, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .find_map(|key| value.get(*key).and_then(scalar_to_string))
}
