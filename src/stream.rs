use crate::{
    row::{Connection, RowCursor},
    runner::SqlRunner,
    Error, Result, Value,
};
use log::debug;

/// A pull driven result stream. Nothing touches the database until the
/// first entity is asked for, and the underlying cursor is released as
/// soon as the stream is exhausted, closed, or dropped.
///
/// The stream holds the connection exclusively for its lifetime, child
/// and join hydration run through it between pulls.
pub struct EntityStream<'c, E> {
    conn: &'c mut dyn Connection,
    sql: String,
    params: Vec<Value>,
    runner: SqlRunner<E>,
    cursor: Option<Box<dyn RowCursor>>,
    done: bool,
}

impl<'c, E> EntityStream<'c, E> {
    pub(crate) fn new(
        conn: &'c mut dyn Connection,
        sql: String,
        params: Vec<Value>,
        runner: SqlRunner<E>,
    ) -> Self {
        Self {
            conn,
            sql,
            params,
            runner,
            cursor: None,
            done: false,
        }
    }

    /// Release the underlying cursor. Safe to call any number of times,
    /// and implied by dropping the stream.
    pub fn close(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
        self.done = true;
    }
}

impl<E> Iterator for EntityStream<'_, E> {
    type Item = Result<E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.cursor.is_none() {
            if self.conn.is_closed() {
                self.done = true;
                return Some(Err(Error::ClosedConnection));
            }
            debug!("Running `{}`", self.sql);
            match self.conn.query(&self.sql, &self.params) {
                Ok(cursor) => self.cursor = Some(cursor),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        let fetched = match self.cursor.as_mut() {
            Some(cursor) => cursor.fetch(),
            None => return None,
        };
        match fetched {
            Ok(Some(row)) => match self.runner.hydrate_graph(self.conn, &row) {
                Ok(entity) => Some(Ok(entity)),
                Err(e) => {
                    self.close();
                    Some(Err(e))
                }
            },
            Ok(None) => {
                self.close();
                None
            }
            Err(e) => {
                self.close();
                Some(Err(e))
            }
        }
    }
}

impl<E> Drop for EntityStream<'_, E> {
    fn drop(&mut self) {
        self.close();
    }
}
