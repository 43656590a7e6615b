use super::eval::{run, Outcome};
use super::parser::parse;
use super::store::{Store, Table};
use crate::{Connection, Error, Result, RowCursor, RowLabeled, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

pub(super) fn lock(store: &Mutex<Store>) -> MutexGuard<'_, Store> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Snapshot {
    tables: BTreeMap<String, Table>,
    sequences: BTreeMap<String, i64>,
}

/// One connection into a [`MemoryDatabase`](super::MemoryDatabase).
/// Transactions snapshot the whole store on begin and restore it on
/// rollback, which is all the isolation a single writer needs.
pub struct MemoryConnection {
    store: Arc<Mutex<Store>>,
    snapshot: Option<Snapshot>,
    closed: bool,
}

impl MemoryConnection {
    pub(super) fn new(store: Arc<Mutex<Store>>) -> Self {
        Self {
            store,
            snapshot: None,
            closed: false,
        }
    }

    fn guard(&self) -> Result<()> {
        if self.closed {
            Err(Error::ClosedConnection)
        } else {
            Ok(())
        }
    }

    fn run(&mut self, sql: &str, params: &[Value]) -> Result<Outcome> {
        self.guard()?;
        let statement = parse(sql).map_err(|message| Error::Execution {
            sql: sql.to_owned(),
            message,
        })?;
        let mut store = lock(&self.store);
        run(&mut store, &statement, params).map_err(|message| Error::Execution {
            sql: sql.to_owned(),
            message,
        })
    }
}

impl Connection for MemoryConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        match self.run(sql, params)? {
            Outcome::Affected(count) => Ok(count),
            Outcome::Rows { .. } => Err(Error::Execution {
                sql: sql.to_owned(),
                message: "statement produces rows, use query".to_owned(),
            }),
        }
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Box<dyn RowCursor>> {
        match self.run(sql, params)? {
            Outcome::Rows { labels, rows } => {
                lock(&self.store).open_cursors += 1;
                Ok(Box::new(MemoryCursor {
                    store: self.store.clone(),
                    labels,
                    rows: rows.into_iter(),
                    open: true,
                }))
            }
            Outcome::Affected(..) => Err(Error::Execution {
                sql: sql.to_owned(),
                message: "statement produces no rows, use execute".to_owned(),
            }),
        }
    }

    fn begin(&mut self) -> Result<()> {
        self.guard()?;
        if self.snapshot.is_none() {
            let store = lock(&self.store);
            self.snapshot = Some(Snapshot {
                tables: store.tables.clone(),
                sequences: store.sequences.clone(),
            });
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.guard()?;
        self.snapshot = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.guard()?;
        if let Some(snapshot) = self.snapshot.take() {
            let mut store = lock(&self.store);
            store.tables = snapshot.tables;
            store.sequences = snapshot.sequences;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// A fully materialized result set. The rows are copied out of the
/// store at query time, so later writes through the same connection do
/// not disturb an open cursor.
pub struct MemoryCursor {
    store: Arc<Mutex<Store>>,
    labels: Arc<[String]>,
    rows: std::vec::IntoIter<Box<[Value]>>,
    open: bool,
}

impl RowCursor for MemoryCursor {
    fn fetch(&mut self) -> Result<Option<RowLabeled>> {
        if !self.open {
            return Ok(None);
        }
        Ok(self
            .rows
            .next()
            .map(|values| RowLabeled::new(self.labels.clone(), values)))
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            let mut store = lock(&self.store);
            store.open_cursors = store.open_cursors.saturating_sub(1);
        }
    }
}

impl Drop for MemoryCursor {
    fn drop(&mut self) {
        self.close();
    }
}
