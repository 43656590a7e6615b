use crate::{Result, Value};
use std::sync::Arc;

/// A fetched row whose values can be addressed by label.
///
/// The labels are shared between all rows of one result set, the values
/// are owned per row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLabeled {
    pub labels: Arc<[String]>,
    pub values: Box<[Value]>,
}

impl RowLabeled {
    pub fn new(labels: Arc<[String]>, values: Box<[Value]>) -> Self {
        Self { labels, values }
    }

    /// The value under the given label, `None` when the result set does
    /// not carry that label at all.
    pub fn get_column(&self, label: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|l| l.eq_ignore_ascii_case(label))
            .map(|i| &self.values[i])
    }
}

/// One live result set. Dropping a cursor without calling `close` is
/// legal, implementations release their resources either way.
pub trait RowCursor: Send {
    /// The next row, or `None` once the result set is exhausted.
    fn fetch(&mut self) -> Result<Option<RowLabeled>>;
    /// Release the result set. Safe to call more than once.
    fn close(&mut self);
}

/// A database connection as the persistence layer sees it. One
/// connection serves one unit of work at a time, so all methods take
/// `&mut self` and implementations need no interior locking for
/// statement execution.
pub trait Connection: Send {
    /// Run a statement that returns no rows, yielding the affected row
    /// count.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64>;
    /// Run a query and hand back a cursor over its rows.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Box<dyn RowCursor>>;
    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;
    /// Close the connection. Further calls fail with
    /// [`Error::ClosedConnection`](crate::Error::ClosedConnection).
    fn close(&mut self);
    fn is_closed(&self) -> bool;
}
