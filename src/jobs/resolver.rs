//! Per-row resolution of site, floor, space and owner references
//!
//! The resolver turns whatever the sheet author wrote (an id or a name) into
//! a canonical id. It never checks that an explicit id exists; that is left to
//! the validator so the same resolver can back best-effort payload assembly.

use crate::reference::{EntityKind, ReferenceIndex};

use super::row::{JobRow, ResolvedIds, present};

/// Maximum number of names listed when a site name is not found
const SAMPLE_NAME_LIMIT: usize = 5;

/// Outcome of resolving one reference column pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    /// Nothing provided (only possible for optional references)
    Absent,
    Failed(String),
}

impl Resolution {
    pub fn id(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(id) => Some(id.as_str()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Resolution::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn into_id(self) -> Option<String> {
        match self {
            Resolution::Resolved(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Resolution::Failed(_))
    }
}

/// Resolves the references of one row against a reference index
#[derive(Debug, Clone, Copy)]
pub struct RowResolver<'a> {
    index: &'a ReferenceIndex,
}

impl<'a> RowResolver<'a> {
    pub fn new(index: &'a ReferenceIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &'a ReferenceIndex {
        self.index
    }

    pub fn resolve_site(&self, row: &JobRow) -> Resolution {
        if let Some(id) = present(&row.site_id) {
            return Resolution::Resolved(id.to_string());
        }

        let Some(name) = present(&row.site_name) else {
            return Resolution::Failed("Neither site_id nor site_name provided".to_string());
        };

        match self.index.resolve_name(EntityKind::Site, name, None) {
            Some(id) => Resolution::Resolved(id.to_string()),
            None => {
                let available = self.index.sample_names(EntityKind::Site, SAMPLE_NAME_LIMIT);
                Resolution::Failed(format!(
                    "Site name '{}' not found. Available: {}",
                    name,
                    available.join(", ")
                ))
            }
        }
    }

    /// Floor is optional; a name is looked up in the site's scope first
    pub fn resolve_floor(&self, row: &JobRow, site_id: Option<&str>) -> Resolution {
        if let Some(id) = present(&row.floor_id) {
            return Resolution::Resolved(id.to_string());
        }

        let Some(name) = present(&row.floor_name) else {
            return Resolution::Absent;
        };

        match self.index.resolve_name(EntityKind::Floor, name, site_id) {
            Some(id) => Resolution::Resolved(id.to_string()),
            None => Resolution::Failed(format!(
                "Floor name '{}' not found in site {}",
                name,
                site_id.unwrap_or("(none)")
            )),
        }
    }

    /// Space is optional; a name is looked up in the floor's scope first
    pub fn resolve_space(&self, row: &JobRow, floor_id: Option<&str>) -> Resolution {
        if let Some(id) = present(&row.space_id) {
            return Resolution::Resolved(id.to_string());
        }

        let Some(name) = present(&row.space_name) else {
            return Resolution::Absent;
        };

        match self.index.resolve_name(EntityKind::Space, name, floor_id) {
            Some(id) => Resolution::Resolved(id.to_string()),
            None => Resolution::Failed(format!("Space name '{}' not found", name)),
        }
    }

    /// Owner is required: explicit id, then user name, then email
    pub fn resolve_owner(&self, row: &JobRow) -> Resolution {
        if let Some(id) = present(&row.owner_employee_id) {
            return Resolution::Resolved(id.to_string());
        }

        let by_lookup = [present(&row.owner_name), present(&row.owner_email)]
            .into_iter()
            .flatten()
            .find_map(|key| self.index.resolve_name(EntityKind::User, key, None));

        match by_lookup {
            Some(id) => Resolution::Resolved(id.to_string()),
            None => Resolution::Failed("Owner not found by ID, name, or email".to_string()),
        }
    }

    /// Best-effort resolution of every reference, ignoring failures
    pub fn resolve_all(&self, row: &JobRow) -> ResolvedIds {
        let site = self.resolve_site(row).into_id();
        let floor = self.resolve_floor(row, site.as_deref()).into_id();
        let space = self.resolve_space(row, floor.as_deref()).into_id();
        let owner = self.resolve_owner(row).into_id();

        ResolvedIds { site, floor, space, owner }
    }
}
