use crate::{descriptor::ROOT_ALIAS, row::Connection, Descriptor, Error, Result, RowLabeled, Value};
use log::debug;
use std::sync::Arc;

/// Runs assembled statements for one entity type: binds parameters in
/// the descriptor's bind order, drains result sets, and turns rows back
/// into entities.
pub(crate) struct SqlRunner<E> {
    descriptor: Arc<Descriptor<E>>,
}

impl<E> SqlRunner<E> {
    pub fn new(descriptor: Arc<Descriptor<E>>) -> Self {
        Self { descriptor }
    }

    pub fn execute(&self, conn: &mut dyn Connection, sql: &str, params: &[Value]) -> Result<u64> {
        debug!("Running `{sql}`");
        conn.execute(sql, params)
    }

    /// Run a query and drain the whole result set before returning, so
    /// no cursor stays open into the hydration phase.
    pub fn rows(
        &self,
        conn: &mut dyn Connection,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<RowLabeled>> {
        debug!("Running `{sql}`");
        let mut cursor = conn.query(sql, params)?;
        let mut rows = Vec::new();
        loop {
            match cursor.fetch() {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => break,
                Err(e) => {
                    cursor.close();
                    return Err(e);
                }
            }
        }
        cursor.close();
        Ok(rows)
    }

    /// Insert one entity, binding every slot of the bind order.
    pub fn insert(&self, conn: &mut dyn Connection, sql: &str, entity: &E) -> Result<()> {
        let mut params = Vec::new();
        for slot in self.descriptor.bind_order() {
            params.push(slot.bind(entity)?);
        }
        self.execute(conn, sql, &params)?;
        Ok(())
    }

    /// Update one entity. The key slot moves from the front of the bind
    /// order to the end, matching its position in the update text.
    pub fn update(&self, conn: &mut dyn Connection, sql: &str, entity: &E) -> Result<()> {
        let order = self.descriptor.bind_order();
        let mut params = Vec::new();
        for slot in order.iter().filter(|s| !s.is_key()) {
            params.push(slot.bind(entity)?);
        }
        if let Some(key) = order.iter().find(|s| s.is_key()) {
            params.push(key.bind(entity)?);
        }
        self.execute(conn, sql, &params)?;
        Ok(())
    }

    /// Read entities with their directly mapped and joined columns
    /// filled in. Children and the finishing transformation are left to
    /// the caller, the cascade engine layers them on per row.
    pub fn select_raw(
        &self,
        conn: &mut dyn Connection,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<E>> {
        let rows = self.rows(conn, sql, params)?;
        let mut entities = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut entity = (self.descriptor.ctor)();
            self.descriptor.populate(&mut entity, row, ROOT_ALIAS)?;
            for hydrator in &self.descriptor.join_hydrators {
                hydrator(&mut entity, row, conn)?;
            }
            entities.push(entity);
        }
        Ok(entities)
    }

    /// Turn one already fetched row into a fully built entity: columns,
    /// joins, children, then the finishing transformation.
    pub fn hydrate_graph(&self, conn: &mut dyn Connection, row: &RowLabeled) -> Result<E> {
        let mut entity = (self.descriptor.ctor)();
        self.descriptor.populate(&mut entity, row, ROOT_ALIAS)?;
        for hydrator in &self.descriptor.join_hydrators {
            hydrator(&mut entity, row, conn)?;
        }
        for child in &self.descriptor.children {
            child.populate_children(conn, &mut entity)?;
        }
        Ok((self.descriptor.finish)(entity))
    }

    /// The single value of a single row query, `None` when the query
    /// matches nothing or the backend reports an untyped null.
    pub fn scalar(
        &self,
        conn: &mut dyn Connection,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<Value>> {
        let rows = self.rows(conn, sql, params)?;
        match rows.into_iter().next() {
            None => Ok(None),
            Some(row) => match row.values.first() {
                None | Some(Value::Null) => Ok(None),
                Some(value) if value.is_null() => Ok(None),
                Some(value) => Ok(Some(value.clone())),
            },
        }
    }

    /// Draw the next value from a key sequence.
    pub fn next_sequence_value(&self, conn: &mut dyn Connection, sql: &str) -> Result<i64> {
        match self.scalar(conn, sql, &[])? {
            Some(Value::Int64(Some(id))) => Ok(id),
            other => Err(Error::Execution {
                sql: sql.to_owned(),
                message: format!("Sequence produced {other:?} instead of an id"),
            }),
        }
    }
}
