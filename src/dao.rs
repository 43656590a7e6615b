use crate::{
    row::Connection,
    runner::SqlRunner,
    sql_writer::{SqlFunction, SqlWriter},
    value::FromValue,
    Descriptor, EntityStream, Error, Result, Transactor, Value, Where,
};
use rust_decimal::Decimal;
use std::sync::Arc;

/// The data access object for one entity type: the full create, read,
/// update, delete surface over a descriptor, cascading through the
/// entity's declared children on every write and read.
///
/// A `Dao` holds no connection. Every call takes one, so a single dao
/// can serve any number of sequential units of work.
pub struct Dao<E> {
    descriptor: Arc<Descriptor<E>>,
    writer: SqlWriter<E>,
    runner: SqlRunner<E>,
}

impl<E: 'static> Dao<E> {
    pub fn new(descriptor: &Arc<Descriptor<E>>) -> Self {
        Self {
            descriptor: descriptor.clone(),
            writer: SqlWriter::new(descriptor.clone()),
            runner: SqlRunner::new(descriptor.clone()),
        }
    }

    pub fn descriptor(&self) -> &Arc<Descriptor<E>> {
        &self.descriptor
    }

    fn singleton(&self, mut found: Vec<E>) -> Result<Option<E>> {
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            n => Err(Error::Configuration(format!(
                "Expected one row of table {}, found {n}",
                self.descriptor.table()
            ))),
        }
    }

    fn select_graph(&self, conn: &mut dyn Connection, sql: &str, params: &[Value]) -> Result<Vec<E>> {
        let rows = self.runner.rows(conn, sql, params)?;
        let mut entities = Vec::with_capacity(rows.len());
        for row in &rows {
            entities.push(self.runner.hydrate_graph(conn, row)?);
        }
        Ok(entities)
    }

    /// Persist a transient entity: draw a key from the sequence, set it
    /// on the entity, insert the row, then cascade into the children.
    /// Returns the assigned key.
    pub fn insert(&self, conn: &mut dyn Connection, entity: &mut E) -> Result<i64> {
        let key = self.descriptor.key_required()?;
        let id = self
            .runner
            .next_sequence_value(conn, &self.writer.next_sequence()?)?;
        (key.set)(entity, id);
        self.runner.insert(conn, &self.writer.insert(), entity)?;
        for child in &self.descriptor.children {
            child.save_children(conn, entity)?;
        }
        Ok(id)
    }

    /// Insert a row for an entity type with no primary key. Append only
    /// tables support nothing else on the write side.
    pub fn append(&self, conn: &mut dyn Connection, entity: &E) -> Result<()> {
        if self.descriptor.key().is_some() {
            return Err(Error::Configuration(format!(
                "Table {} has a primary key, insert assigns it",
                self.descriptor.table()
            )));
        }
        self.runner.insert(conn, &self.writer.insert(), entity)
    }

    /// Rewrite the row of an already persistent entity and cascade into
    /// its children, deleting child rows the entity no longer lists.
    pub fn update(&self, conn: &mut dyn Connection, entity: &mut E) -> Result<()> {
        self.runner.update(conn, &self.writer.update()?, entity)?;
        for child in &self.descriptor.children {
            child.save_children(conn, entity)?;
        }
        Ok(())
    }

    /// Remove the entity's row and, first, every descendant row.
    pub fn delete(&self, conn: &mut dyn Connection, entity: &E) -> Result<()> {
        let key = self.descriptor.key_required()?;
        let id = (key.get)(entity).ok_or_else(|| {
            Error::Configuration(format!(
                "Deleting a transient entity of table {}",
                self.descriptor.table()
            ))
        })?;
        for child in &self.descriptor.children {
            child.delete_children(conn, id)?;
        }
        self.runner
            .execute(conn, &self.writer.delete()?, &[Value::Int64(Some(id))])?;
        Ok(())
    }

    /// [`insert`](Self::insert) inside its own transaction.
    pub fn atomic_insert(&self, conn: &mut dyn Connection, entity: &mut E) -> Result<i64> {
        Transactor::run_and_commit(conn, |c| self.insert(c, entity))
    }

    /// [`update`](Self::update) inside its own transaction.
    pub fn atomic_update(&self, conn: &mut dyn Connection, entity: &mut E) -> Result<()> {
        Transactor::run_and_commit(conn, |c| self.update(c, entity))
    }

    /// [`delete`](Self::delete) inside its own transaction.
    pub fn atomic_delete(&self, conn: &mut dyn Connection, entity: &E) -> Result<()> {
        Transactor::run_and_commit(conn, |c| self.delete(c, entity))
    }

    /// The entity with the given primary key, fully hydrated, or `None`.
    pub fn select_one(&self, conn: &mut dyn Connection, id: i64) -> Result<Option<E>> {
        let key = self.descriptor.key_required()?;
        let sql = self.writer.select_by_columns(&[key.name()]);
        let found = self.select_graph(conn, &sql, &[Value::Int64(Some(id))])?;
        self.singleton(found)
    }

    pub fn select_all(&self, conn: &mut dyn Connection) -> Result<Vec<E>> {
        self.select_graph(conn, &self.writer.select(), &[])
    }

    pub fn select_where(&self, conn: &mut dyn Connection, clause: &Where) -> Result<Vec<E>> {
        self.select_graph(conn, &self.writer.select_where(clause), &clause.params())
    }

    /// Entities whose named columns equal the corresponding fields of
    /// the template entity.
    pub fn select_by_columns(
        &self,
        conn: &mut dyn Connection,
        template: &E,
        columns: &[&str],
    ) -> Result<Vec<E>> {
        let sql = self.writer.select_by_columns(columns);
        let params = self.template_params(template, columns)?;
        self.select_graph(conn, &sql, &params)
    }

    pub fn select_one_by_columns(
        &self,
        conn: &mut dyn Connection,
        template: &E,
        columns: &[&str],
    ) -> Result<Option<E>> {
        let found = self.select_by_columns(conn, template, columns)?;
        self.singleton(found)
    }

    fn template_params(&self, template: &E, columns: &[&str]) -> Result<Vec<Value>> {
        let order = self.descriptor.bind_order();
        let mut params = Vec::with_capacity(columns.len());
        for name in columns {
            let slot = order
                .iter()
                .find(|slot| slot.name() == *name)
                .ok_or_else(|| {
                    Error::Configuration(format!(
                        "Table {} has no column named {name}",
                        self.descriptor.table()
                    ))
                })?;
            params.push(slot.bind(template)?);
        }
        Ok(params)
    }

    /// All entities as a lazy stream. The database is not touched until
    /// the first pull.
    pub fn stream_all<'c>(&self, conn: &'c mut dyn Connection) -> EntityStream<'c, E> {
        EntityStream::new(
            conn,
            self.writer.select(),
            Vec::new(),
            SqlRunner::new(self.descriptor.clone()),
        )
    }

    pub fn stream_where<'c>(
        &self,
        conn: &'c mut dyn Connection,
        clause: &Where,
    ) -> EntityStream<'c, E> {
        EntityStream::new(
            conn,
            self.writer.select_where(clause),
            clause.params(),
            SqlRunner::new(self.descriptor.clone()),
        )
    }

    /// Consume the matching entities one at a time without collecting
    /// them, folding each into the accumulator.
    pub fn fold<T>(
        &self,
        conn: &mut dyn Connection,
        identity: T,
        mut accumulate: impl FnMut(T, E) -> T,
        clause: &Where,
    ) -> Result<T> {
        let mut acc = identity;
        for entity in self.stream_where(conn, clause) {
            acc = accumulate(acc, entity?);
        }
        Ok(acc)
    }

    fn function_value<T>(
        &self,
        conn: &mut dyn Connection,
        function: SqlFunction,
        column: &str,
        clause: &Where,
    ) -> Result<Option<T>>
    where
        Option<T>: FromValue,
    {
        let sql = self.writer.select_function(function, column, clause);
        match self.runner.scalar(conn, &sql, &clause.params())? {
            None => Ok(None),
            Some(value) => <Option<T>>::from_value(value).map_err(|e| match e {
                Error::Conversion {
                    expected, found, ..
                } => Error::Conversion {
                    column: column.to_owned(),
                    expected,
                    found,
                },
                other => other,
            }),
        }
    }

    /// An aggregate producing an integer, `None` when no row matched.
    pub fn run_long_function(
        &self,
        conn: &mut dyn Connection,
        function: SqlFunction,
        column: &str,
        clause: &Where,
    ) -> Result<Option<i64>> {
        self.function_value(conn, function, column, clause)
    }

    /// An aggregate producing a decimal, `None` when no row matched.
    pub fn run_decimal_function(
        &self,
        conn: &mut dyn Connection,
        function: SqlFunction,
        column: &str,
        clause: &Where,
    ) -> Result<Option<Decimal>> {
        self.function_value(conn, function, column, clause)
    }
}
