use crate::{descriptor::ROOT_ALIAS, Descriptor, Result, Where};
use std::fmt::Write;
use std::sync::Arc;

/// Aggregate functions usable through
/// [`run_long_function`](crate::Dao::run_long_function) and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlFunction {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl SqlFunction {
    pub fn name(&self) -> &'static str {
        match self {
            SqlFunction::Count => "COUNT",
            SqlFunction::Sum => "SUM",
            SqlFunction::Min => "MIN",
            SqlFunction::Max => "MAX",
            SqlFunction::Avg => "AVG",
        }
    }
}

/// Generates the statement text for one entity type.
///
/// The shapes are stable and deliberately plain, hand authored schemas
/// and tests depend on the exact text. Every piece of column order comes
/// from the descriptor's single bind order, so the placeholders always
/// line up with the values the runner binds.
pub struct SqlWriter<E> {
    descriptor: Arc<Descriptor<E>>,
}

impl<E> SqlWriter<E> {
    pub fn new(descriptor: Arc<Descriptor<E>>) -> Self {
        Self { descriptor }
    }

    fn root_columns(&self) -> Vec<&str> {
        let mut columns = Vec::new();
        if let Some(key) = &self.descriptor.key {
            columns.push(key.name());
        }
        for column in &self.descriptor.data {
            columns.push(column.name());
        }
        if let Some(parent) = &self.descriptor.parent {
            columns.push(parent.name());
        }
        columns
    }

    /// The full graph select: root columns and every transitively joined
    /// table's columns, each aliased as `<alias><column>`, anchored with
    /// `where 1=1` so callers can append further `AND` fragments
    /// uniformly.
    pub fn select(&self) -> String {
        let mut buf = String::from("select ");
        let projected: Vec<String> = self
            .root_columns()
            .iter()
            .map(|c| format!("{ROOT_ALIAS}.{c} as {ROOT_ALIAS}{c}"))
            .chain(self.descriptor.join_specs.iter().flat_map(|spec| {
                let alias = spec.alias.clone();
                spec.columns
                    .iter()
                    .map(move |c| format!("{alias}.{c} as {alias}{c}"))
            }))
            .collect();
        buf.push_str(&projected.join(", "));
        let _ = write!(buf, " from {} {ROOT_ALIAS}", self.descriptor.table);
        for spec in &self.descriptor.join_specs {
            let _ = write!(
                buf,
                " LEFT JOIN {} {} ON {}.{}={}.{}",
                spec.table, spec.alias, spec.owner_alias, spec.fk, spec.alias, spec.pk
            );
        }
        buf.push_str(" where 1=1 ");
        buf
    }

    pub fn select_where(&self, clause: &Where) -> String {
        if clause.is_empty() {
            self.select()
        } else {
            format!("{} AND {}", self.select(), clause.render("a."))
        }
    }

    /// The full select restricted by equality on the named columns, in
    /// the order given.
    pub fn select_by_columns(&self, columns: &[&str]) -> String {
        let mut buf = self.select();
        for column in columns {
            let _ = write!(buf, " and {ROOT_ALIAS}.{column} = ? ");
        }
        buf
    }

    /// The bare id query the cascade engine uses to find the persisted
    /// children of one parent row.
    pub fn select_child_ids(&self, parent_column: &str) -> Result<String> {
        let key = self.descriptor.key_required()?;
        Ok(format!(
            "select {} from {} where {} = ?",
            key.name(),
            self.descriptor.table,
            parent_column
        ))
    }

    pub fn insert(&self) -> String {
        let order = self.descriptor.bind_order();
        let names: Vec<&str> = order.iter().map(|slot| slot.name()).collect();
        let mut buf = format!(
            "insert into {} ( {} ) values ( ",
            self.descriptor.table,
            names.join(", ")
        );
        for _ in 1..names.len() {
            buf.push_str("?, ");
        }
        buf.push_str("? ");
        buf.push_str(" ) ");
        buf
    }

    /// Update of every non key column, restricted to the primary key,
    /// which binds last.
    pub fn update(&self) -> Result<String> {
        let key = self.descriptor.key_required()?;
        let mut buf = format!("update {} set ", self.descriptor.table);
        let mut assignments = Vec::new();
        for column in &self.descriptor.data {
            assignments.push(format!("{}= ?", column.name()));
        }
        if let Some(parent) = &self.descriptor.parent {
            assignments.push(format!("{}= ?", parent.name()));
        }
        buf.push_str(&assignments.join(", "));
        for join in &self.descriptor.joins {
            let _ = write!(buf, ", {} = ? ", join.name());
        }
        let _ = write!(buf, " where {} = ?", key.name());
        Ok(buf)
    }

    pub fn delete(&self) -> Result<String> {
        let key = self.descriptor.key_required()?;
        Ok(format!(
            "delete from {} where {} = ?",
            self.descriptor.table,
            key.name()
        ))
    }

    /// An aggregate over one column, optionally restricted.
    pub fn select_function(&self, function: SqlFunction, column: &str, clause: &Where) -> String {
        let mut buf = format!(
            "select {} ( {} )  from {} {ROOT_ALIAS}",
            function.name(),
            column,
            self.descriptor.table
        );
        if !clause.is_empty() {
            let _ = write!(buf, " where {}", clause.render("a."));
        }
        buf
    }

    /// The query that draws the next primary key from the descriptor's
    /// sequence.
    pub fn next_sequence(&self) -> Result<String> {
        let key = self.descriptor.key_required()?;
        Ok(format!("select nextval('{}')", key.sequence()))
    }
}
