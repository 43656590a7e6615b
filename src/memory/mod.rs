//! An in process storage backend speaking exactly the SQL this crate
//! emits. Tables and sequences are declared up front, rows live in
//! plain vectors behind a mutex, and every open cursor is counted so
//! tests can assert that resources are released.

mod connection;
mod eval;
mod lexer;
mod parser;
mod store;

pub use connection::{MemoryConnection, MemoryCursor};

use connection::lock;
use std::sync::{Arc, Mutex};
use store::{Store, Table};

/// A named, empty relational store. Clone handles via [`connect`]
/// (MemoryDatabase::connect) as needed, all connections share the same
/// tables.
pub struct MemoryDatabase {
    store: Arc<Mutex<Store>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(Store::default())),
        }
    }

    /// Declare a table and its column names. Redefining a table drops
    /// its rows.
    pub fn define_table(&self, name: &str, columns: &[&str]) {
        let mut store = lock(&self.store);
        store.tables.insert(
            name.to_owned(),
            Table {
                columns: columns.iter().map(|c| (*c).to_owned()).collect(),
                rows: Vec::new(),
            },
        );
    }

    /// Declare a sequence starting at one.
    pub fn define_sequence(&self, name: &str) {
        let mut store = lock(&self.store);
        store.sequences.insert(name.to_owned(), 1);
    }

    pub fn connect(&self) -> MemoryConnection {
        MemoryConnection::new(self.store.clone())
    }

    /// The number of cursors handed out and not yet released, across
    /// all connections.
    pub fn open_cursors(&self) -> usize {
        lock(&self.store).open_cursors
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}
