//! Default-valued metric tables keyed `project → user`.
//!
//! Every metric in the output is a map from project to user to a value. The
//! original accumulation idiom was insert-if-absent-else-update at every call
//! site; [`MetricTable::entry`] replaces that with a single total operation,
//! and [`MetricTable::ensure`] is what the completion pass uses to make the
//! table total over `projects × cohort`.
//!
//! `BTreeMap`-backed so iteration and JSON serialization are deterministic.

use std::collections::BTreeMap;

use serde::Serialize;

/// A `project → user → V` table with get-or-default insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MetricTable<V>(BTreeMap<String, BTreeMap<String, V>>);

impl<V> Default for MetricTable<V> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<V: Default> MetricTable<V> {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable access to `(project, user)`, inserting `V::default()` if the
    /// slot does not exist yet.
    pub fn entry(&mut self, project: &str, user: &str) -> &mut V {
        self.0
            .entry(project.to_string())
            .or_default()
            .entry(user.to_string())
            .or_default()
    }

    /// Insert `V::default()` at `(project, user)` unless already present.
    pub fn ensure(&mut self, project: &str, user: &str) {
        let _ = self.entry(project, user);
    }

    /// Overwrite the value at `(project, user)`.
    pub fn set(&mut self, project: &str, user: &str, value: V) {
        *self.entry(project, user) = value;
    }

    /// Read the value at `(project, user)`, if present.
    #[must_use]
    pub fn get(&self, project: &str, user: &str) -> Option<&V> {
        self.0.get(project).and_then(|users| users.get(user))
    }

    /// Whether `(project, user)` has an entry.
    #[must_use]
    pub fn contains(&self, project: &str, user: &str) -> bool {
        self.get(project, user).is_some()
    }

    /// Iterate projects with their user maps, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, V>)> {
        self.0.iter()
    }

    /// The user map for one project, if any rows landed there.
    #[must_use]
    pub fn project(&self, project: &str) -> Option<&BTreeMap<String, V>> {
        self.0.get(project)
    }

    /// Total number of `(project, user)` entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    /// Whether the table has no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }
}
