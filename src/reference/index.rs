//! Lookup tables over the reference data of one tenant

use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use super::record::{EntityKind, ReferenceRecord};

/// Raw reference lists as fetched from the API, one list per entity kind
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub sites: Vec<Value>,
    pub floors: Vec<Value>,
    pub spaces: Vec<Value>,
    pub users: Vec<Value>,
}

impl ReferenceData {
    pub fn list(&self, kind: EntityKind) -> &[Value] {
        match kind {
            EntityKind::Site => &self.sites,
            EntityKind::Floor => &self.floors,
            EntityKind::Space => &self.spaces,
            EntityKind::User => &self.users,
        }
    }
}

/// Per-kind counts collected while building the index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindDiagnostics {
    pub loaded: usize,
    pub dropped: usize,
    pub names: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexDiagnostics {
    pub sites: KindDiagnostics,
    pub floors: KindDiagnostics,
    pub spaces: KindDiagnostics,
    pub users: KindDiagnostics,
}

impl IndexDiagnostics {
    pub fn total_dropped(&self) -> usize {
        self.sites.dropped + self.floors.dropped + self.spaces.dropped + self.users.dropped
    }
}

#[derive(Debug, Default)]
struct KindIndex {
    records: HashMap<String, ReferenceRecord>,
    /// Record ids in first-seen order
    order: Vec<String>,
    by_name: HashMap<String, String>,
    /// Keyed by `parent_id|name`
    by_scoped_name: HashMap<String, String>,
    parents: HashMap<String, String>,
    dropped: usize,
}

impl KindIndex {
    fn build(kind: EntityKind, raw: &[Value]) -> Self {
        let mut index = KindIndex::default();

        for value in raw {
            let Some(record) = ReferenceRecord::from_value(kind, value) else {
                index.dropped += 1;
                continue;
            };

            if let Some(name) = record.name.as_deref() {
                let key = normalize_name(name);
                if !key.is_empty() {
                    if let Some(parent) = record.parent_id.as_deref() {
                        index.by_scoped_name.insert(scoped_key(parent, &key), record.id.clone());
                    }
                    // Last writer wins: the source data may repeat names
                    index.by_name.insert(key, record.id.clone());
                }
            }

            if let Some(email) = record.email.as_deref() {
                let key = normalize_name(email);
                if !key.is_empty() {
                    index.by_name.insert(key, record.id.clone());
                }
            }

            if let Some(parent) = record.parent_id.as_deref() {
                index.parents.insert(record.id.clone(), parent.to_string());
            }

            if !index.records.contains_key(&record.id) {
                index.order.push(record.id.clone());
            }
            index.records.insert(record.id.clone(), record);
        }

        if index.dropped > 0 {
            warn!("Dropped {} malformed {} record(s)", index.dropped, kind);
        }
        debug!(
            "Indexed {} {} record(s), {} name key(s), {} scoped key(s)",
            index.records.len(),
            kind,
            index.by_name.len(),
            index.by_scoped_name.len()
        );

        index
    }

    fn diagnostics(&self) -> KindDiagnostics {
        KindDiagnostics {
            loaded: self.records.len(),
            dropped: self.dropped,
            names: self.by_name.len(),
        }
    }
}

/// Read-only lookup structure over sites, floors, spaces and users.
///
/// Built in one pass from raw API lists and never updated incrementally;
/// reloading reference data means building a new index.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    sites: KindIndex,
    floors: KindIndex,
    spaces: KindIndex,
    users: KindIndex,
}

impl ReferenceIndex {
    /// Build the index. Malformed entries are skipped, never fatal.
    pub fn build(data: &ReferenceData) -> Self {
        Self {
            sites: KindIndex::build(EntityKind::Site, &data.sites),
            floors: KindIndex::build(EntityKind::Floor, &data.floors),
            spaces: KindIndex::build(EntityKind::Space, &data.spaces),
            users: KindIndex::build(EntityKind::User, &data.users),
        }
    }

    fn kind(&self, kind: EntityKind) -> &KindIndex {
        match kind {
            EntityKind::Site => &self.sites,
            EntityKind::Floor => &self.floors,
            EntityKind::Space => &self.spaces,
            EntityKind::User => &self.users,
        }
    }

    pub fn by_id(&self, kind: EntityKind, id: &str) -> Option<&ReferenceRecord> {
        self.kind(kind).records.get(id.trim())
    }

    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        self.by_id(kind, id).is_some()
    }

    /// Resolve a human-entered name to an id.
    ///
    /// With a `parent_id` the parent-scoped table is searched first, then the
    /// flat table. Matching is case-insensitive and ignores surrounding
    /// whitespace. For users the flat table holds both names and emails.
    pub fn resolve_name(&self, kind: EntityKind, name: &str, parent_id: Option<&str>) -> Option<&str> {
        let key = normalize_name(name);
        if key.is_empty() {
            return None;
        }

        let index = self.kind(kind);
        if let Some(parent) = parent_id.map(str::trim).filter(|p| !p.is_empty()) {
            if let Some(id) = index.by_scoped_name.get(&scoped_key(parent, &key)) {
                return Some(id.as_str());
            }
        }

        index.by_name.get(&key).map(String::as_str)
    }

    /// Parent id of a floor (its site) or of a space (its floor)
    pub fn parent_of(&self, kind: EntityKind, child_id: &str) -> Option<&str> {
        self.kind(kind).parents.get(child_id.trim()).map(String::as_str)
    }

    /// Up to `limit` display names, in load order, for "did you mean" messages
    pub fn sample_names(&self, kind: EntityKind, limit: usize) -> Vec<&str> {
        let index = self.kind(kind);
        index
            .order
            .iter()
            .filter_map(|id| index.records.get(id))
            .filter_map(|record| record.name.as_deref())
            .take(limit)
            .collect()
    }

    /// Records of one kind in load order
    pub fn records(&self, kind: EntityKind) -> Vec<&ReferenceRecord> {
        let index = self.kind(kind);
        index
            .order
            .iter()
            .filter_map(|id| index.records.get(id))
            .collect()
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.kind(kind).records.len()
    }

    pub fn is_empty(&self) -> bool {
        EntityKind::ALL.iter().all(|kind| self.len(*kind) == 0)
    }

    pub fn diagnostics(&self) -> IndexDiagnostics {
        IndexDiagnostics {
            sites: self.sites.diagnostics(),
            floors: self.floors.diagnostics(),
            spaces: self.spaces.diagnostics(),
            users: self.users.diagnostics(),
        }
    }
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn scoped_key(parent_id: &str, normalized_name: &str) -> String {
    format!("{}|{}", parent_id, normalized_name)
}
