use crate::{
    column::{KeyColumn, ParentColumn},
    row::Connection,
    runner::SqlRunner,
    sql_writer::SqlWriter,
    Descriptor, Error, Result, Value,
};
use std::collections::HashSet;
use std::sync::Arc;

/// One parent to child relation, erased over the child type so a parent
/// descriptor can own children of any mix of types.
///
/// All methods work row by row through the supplied connection. The ids
/// handed to `delete_orphans` are rows the caller has decided are no
/// longer reachable from their parent.
pub(crate) trait ChildRelation<P>: Send + Sync {
    fn save_children(&self, conn: &mut dyn Connection, parent: &mut P) -> Result<()>;
    fn populate_children(&self, conn: &mut dyn Connection, parent: &mut P) -> Result<()>;
    fn delete_children(&self, conn: &mut dyn Connection, parent_id: i64) -> Result<()>;
    fn existing_ids(&self, conn: &mut dyn Connection, parent_id: i64) -> Result<HashSet<i64>>;
    fn delete_orphans(&self, conn: &mut dyn Connection, ids: HashSet<i64>) -> Result<()>;
}

type ChildLens<P, C> = Arc<dyn for<'a> Fn(&'a mut P) -> &'a mut Vec<C> + Send + Sync>;

/// The concrete binding of a parent type to one of its child types. All
/// statement text is generated once here, the per row work only binds
/// and runs it.
pub(crate) struct ChildBinding<P, C> {
    relation: Arc<Descriptor<C>>,
    parent_key: KeyColumn<P>,
    child_key: KeyColumn<C>,
    child_parent: ParentColumn<C>,
    lens: ChildLens<P, C>,
    runner: SqlRunner<C>,
    select_by_fk: String,
    insert: String,
    update: String,
    delete: String,
    select_ids: String,
    next_sequence: String,
}

impl<P, C: 'static> ChildBinding<P, C> {
    pub fn new(
        parent_key: KeyColumn<P>,
        relation: Arc<Descriptor<C>>,
        lens: ChildLens<P, C>,
    ) -> Result<Self> {
        let child_key = relation.key_required()?.clone();
        let child_parent = relation
            .parent
            .clone()
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "Child table {} declares no parent column",
                    relation.table
                ))
            })?;
        let writer = SqlWriter::new(relation.clone());
        let select_by_fk = writer.select_by_columns(&[child_parent.name()]);
        let insert = writer.insert();
        let update = writer.update()?;
        let delete = writer.delete()?;
        let select_ids = writer.select_child_ids(child_parent.name())?;
        let next_sequence = writer.next_sequence()?;
        Ok(Self {
            runner: SqlRunner::new(relation.clone()),
            relation,
            parent_key,
            child_key,
            child_parent,
            lens,
            select_by_fk,
            insert,
            update,
            delete,
            select_ids,
            next_sequence,
        })
    }

    fn parent_id(&self, parent: &P) -> Result<i64> {
        (self.parent_key.get)(parent).ok_or_else(|| {
            Error::Configuration(format!(
                "Cascading into table {} from a transient parent",
                self.relation.table
            ))
        })
    }
}

impl<P, C: 'static> ChildRelation<P> for ChildBinding<P, C> {
    /// Bring the persisted child rows in line with the parent's current
    /// child list: insert the transient ones, update the persistent
    /// ones, then delete whatever persisted row the list no longer
    /// reaches.
    fn save_children(&self, conn: &mut dyn Connection, parent: &mut P) -> Result<()> {
        let parent_id = self.parent_id(parent)?;
        let mut existing = self.existing_ids(conn, parent_id)?;
        let children = (self.lens)(parent);
        for child in children.iter_mut() {
            self.child_parent.set_parent_id(child, parent_id);
            match (self.child_key.get)(child) {
                None => {
                    let id = self.runner.next_sequence_value(conn, &self.next_sequence)?;
                    (self.child_key.set)(child, id);
                    self.runner.insert(conn, &self.insert, child)?;
                }
                Some(id) => {
                    self.runner.update(conn, &self.update, child)?;
                    existing.remove(&id);
                }
            }
            for grandchild in &self.relation.children {
                grandchild.save_children(conn, child)?;
            }
        }
        self.delete_orphans(conn, existing)
    }

    fn populate_children(&self, conn: &mut dyn Connection, parent: &mut P) -> Result<()> {
        let parent_id = self.parent_id(parent)?;
        let mut loaded = self.runner.select_raw(
            conn,
            &self.select_by_fk,
            &[Value::Int64(Some(parent_id))],
        )?;
        for child in loaded.iter_mut() {
            for grandchild in &self.relation.children {
                grandchild.populate_children(conn, child)?;
            }
        }
        let finish = &self.relation.finish;
        *(self.lens)(parent) = loaded.into_iter().map(|c| finish(c)).collect();
        Ok(())
    }

    fn delete_children(&self, conn: &mut dyn Connection, parent_id: i64) -> Result<()> {
        let ids = self.existing_ids(conn, parent_id)?;
        self.delete_orphans(conn, ids)
    }

    fn existing_ids(&self, conn: &mut dyn Connection, parent_id: i64) -> Result<HashSet<i64>> {
        let rows = self
            .runner
            .rows(conn, &self.select_ids, &[Value::Int64(Some(parent_id))])?;
        let mut ids = HashSet::new();
        for row in rows {
            match row.values.first() {
                Some(Value::Int64(Some(id))) => {
                    ids.insert(*id);
                }
                other => {
                    return Err(Error::Execution {
                        sql: self.select_ids.clone(),
                        message: format!("Expected an id, found {other:?}"),
                    })
                }
            }
        }
        Ok(ids)
    }

    /// Depth first removal: each orphan's own descendants go before the
    /// orphan row itself.
    fn delete_orphans(&self, conn: &mut dyn Connection, ids: HashSet<i64>) -> Result<()> {
        for id in ids {
            for grandchild in &self.relation.children {
                grandchild.delete_children(conn, id)?;
            }
            self.runner
                .execute(conn, &self.delete, &[Value::Int64(Some(id))])?;
        }
        Ok(())
    }
}
