use crate::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub(super) struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Result<usize, String> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| format!("no column {name}"))
    }
}

/// The shared state behind every connection of one database: tables,
/// sequences, and the count of cursors not yet released.
#[derive(Debug, Default)]
pub(super) struct Store {
    pub tables: BTreeMap<String, Table>,
    pub sequences: BTreeMap<String, i64>,
    pub open_cursors: usize,
}

impl Store {
    pub fn table(&self, name: &str) -> Result<&Table, String> {
        self.tables
            .get(name)
            .ok_or_else(|| format!("no table {name}"))
    }

    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table, String> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| format!("no table {name}"))
    }
}
