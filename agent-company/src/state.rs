//! In-memory record of what each role contributed during a session.

use serde::Serialize;
use serde::ser::SerializeMap;

use crate::roles::RoleKey;

pub const FINAL_PROJECT: &str = "final_project";
pub const REFINED_PROJECT: &str = "refined_project";

/// Ordered key/value record. Writing an existing key replaces its value in
/// place; nothing is ever removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectState {
    entries: Vec<(String, String)>,
}

impl ProjectState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pretty JSON object of all entries, in insertion order.
    pub fn dump(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl Serialize for ProjectState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Which kind of pass produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Develop,
    Refine,
}

impl PassKind {
    /// State key for a role's contribution in this pass.
    pub fn contribution_key(self, role: RoleKey) -> String {
        match self {
            PassKind::Develop => role.as_str().to_string(),
            PassKind::Refine => format!("{}_refinement", role.as_str()),
        }
    }

    /// State key for the pass deliverable.
    pub fn deliverable_key(self) -> &'static str {
        match self {
            PassKind::Develop => FINAL_PROJECT,
            PassKind::Refine => REFINED_PROJECT,
        }
    }
}

impl std::fmt::Display for PassKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassKind::Develop => write!(f, "develop"),
            PassKind::Refine => write!(f, "refine"),
        }
    }
}
