//! Agent workspace
//!
//! The per-request scratch store: named tables produced by fetch and
//! transform steps, read by describe/transform/synthesis. One workspace per
//! request; never shared across requests.

use std::collections::BTreeMap;

use tracing::debug;

use crate::table::{Table, TableError, ValueKind};

/// Named-table store acting as the agent's short-term memory.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    tables: BTreeMap<String, Table>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or overwrite a table.
    pub fn add(&mut self, name: impl Into<String>, table: Table) {
        let name = name.into();
        debug!(table = %name, rows = table.len(), "workspace: adding table");
        self.tables.insert(name, table);
    }

    /// Fetch a table by name.
    pub fn get(&self, name: &str) -> Result<&Table, TableError> {
        self.tables
            .get(name)
            .ok_or_else(|| TableError::NotFound(name.to_string(), self.names().join(", ")))
    }

    pub fn names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Table)> {
        self.tables.iter()
    }

    /// Table names mapped to their column lists. This is what the planner
    /// sees when writing follow-up transform steps.
    pub fn list(&self) -> BTreeMap<String, Vec<String>> {
        self.tables
            .iter()
            .map(|(name, t)| (name.clone(), t.columns().to_vec()))
            .collect()
    }

    /// Schema of one table: columns with their value kinds.
    pub fn describe(&self, name: &str) -> Result<Vec<(String, ValueKind)>, TableError> {
        Ok(self.get(name)?.schema())
    }

    /// One-line summary of the whole workspace, for correction prompts and
    /// intervention context.
    pub fn summary(&self) -> String {
        if self.tables.is_empty() {
            return "(workspace is empty)".to_string();
        }
        self.tables
            .iter()
            .map(|(name, t)| format!("{}: [{}]", name, t.columns().join(", ")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}
