use crate::{
    descriptor::{AliasAllocator, Descriptor},
    row::Connection,
    Error, Result, RowLabeled, Value,
};
use std::sync::Arc;

/// Attach the column name to a conversion error raised by a setter, which
/// only knows the value it was handed.
fn name_conversion(column: &str, err: Error) -> Error {
    match err {
        Error::Conversion {
            expected, found, ..
        } => Error::Conversion {
            column: column.to_owned(),
            expected,
            found,
        },
        other => other,
    }
}

fn missing_label(label: &str) -> Error {
    Error::Configuration(format!("Result set carries no column labeled {label}"))
}

/// A directly mapped column: one field of the entity, one column of its
/// table. The accessors are explicit closures supplied when the
/// descriptor is built, nothing is discovered at run time.
pub struct DataColumn<E> {
    pub(crate) name: String,
    pub(crate) nullable: bool,
    pub(crate) get: Arc<dyn Fn(&E) -> Value + Send + Sync>,
    pub(crate) set: Arc<dyn Fn(&mut E, Value) -> Result<()> + Send + Sync>,
}

impl<E> Clone for DataColumn<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            nullable: self.nullable,
            get: self.get.clone(),
            set: self.set.clone(),
        }
    }
}

impl<E> DataColumn<E> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value to bind for this column, checking the not-null
    /// constraint before the statement ever reaches the backend.
    pub(crate) fn bind(&self, entity: &E) -> Result<Value> {
        let value = (self.get)(entity);
        if !self.nullable && value.is_null() {
            return Err(Error::NullBinding {
                column: self.name.clone(),
            });
        }
        Ok(value)
    }

    /// Copy this column out of a fetched row into the entity. The row
    /// labels its values with the table alias prepended, so the same
    /// column set can be read under any alias.
    pub(crate) fn populate(&self, entity: &mut E, row: &RowLabeled, alias: &str) -> Result<()> {
        let label = format!("{alias}{}", self.name);
        let value = row
            .get_column(&label)
            .ok_or_else(|| missing_label(&label))?
            .clone();
        (self.set)(entity, value).map_err(|e| name_conversion(&self.name, e))
    }
}

/// The primary key column. Keys are always sequence assigned 64 bit
/// integers, held as `Option<i64>` on the entity so a transient instance
/// is distinguishable from a persistent one.
pub struct KeyColumn<E> {
    pub(crate) name: String,
    pub(crate) sequence: String,
    pub(crate) get: Arc<dyn Fn(&E) -> Option<i64> + Send + Sync>,
    pub(crate) set: Arc<dyn Fn(&mut E, i64) + Send + Sync>,
}

impl<E> Clone for KeyColumn<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            sequence: self.sequence.clone(),
            get: self.get.clone(),
            set: self.set.clone(),
        }
    }
}

impl<E> KeyColumn<E> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub(crate) fn bind(&self, entity: &E) -> Result<Value> {
        match (self.get)(entity) {
            Some(id) => Ok(Value::Int64(Some(id))),
            None => Err(Error::NullBinding {
                column: self.name.clone(),
            }),
        }
    }

    pub(crate) fn populate(&self, entity: &mut E, row: &RowLabeled, alias: &str) -> Result<()> {
        let label = format!("{alias}{}", self.name);
        let value = row
            .get_column(&label)
            .ok_or_else(|| missing_label(&label))?;
        match value {
            Value::Int64(Some(id)) => {
                (self.set)(entity, *id);
                Ok(())
            }
            other => Err(Error::Conversion {
                column: self.name.clone(),
                expected: "int64",
                found: other.type_name(),
            }),
        }
    }
}

/// The foreign key a child table holds back to its parent. The child
/// entity never exposes the raw id, the cascade engine writes it through
/// this column right before the child is saved.
pub struct ParentColumn<E> {
    pub(crate) name: String,
    pub(crate) get: Arc<dyn Fn(&E) -> Option<i64> + Send + Sync>,
    pub(crate) set: Arc<dyn Fn(&mut E, i64) + Send + Sync>,
}

impl<E> Clone for ParentColumn<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            get: self.get.clone(),
            set: self.set.clone(),
        }
    }
}

impl<E> ParentColumn<E> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_parent_id(&self, entity: &mut E, id: i64) {
        (self.set)(entity, id)
    }

    pub(crate) fn bind(&self, entity: &E) -> Result<Value> {
        match (self.get)(entity) {
            Some(id) => Ok(Value::Int64(Some(id))),
            None => Err(Error::NullBinding {
                column: self.name.clone(),
            }),
        }
    }

    pub(crate) fn populate(&self, entity: &mut E, row: &RowLabeled, alias: &str) -> Result<()> {
        let label = format!("{alias}{}", self.name);
        let value = row
            .get_column(&label)
            .ok_or_else(|| missing_label(&label))?;
        match value {
            Value::Int64(Some(id)) => {
                (self.set)(entity, *id);
                Ok(())
            }
            Value::Int64(None) | Value::Null => Ok(()),
            other => Err(Error::Conversion {
                column: self.name.clone(),
                expected: "int64",
                found: other.type_name(),
            }),
        }
    }
}

/// One joined table in the select plan. The assembler turns these into
/// `LEFT JOIN` clauses and extends the projection with the joined
/// columns under the join alias.
#[derive(Debug, Clone)]
pub(crate) struct JoinSpec {
    pub table: String,
    pub alias: String,
    pub owner_alias: String,
    pub fk: String,
    pub pk: String,
    pub columns: Vec<String>,
}

/// Reads the joined entity out of an already fetched row and attaches it
/// to its owner. Receives the connection so children of the joined
/// entity can be cascaded in.
pub(crate) type JoinHydrator<E> =
    Arc<dyn Fn(&mut E, &RowLabeled, &mut dyn Connection) -> Result<()> + Send + Sync>;

pub(crate) struct JoinPiece<E> {
    pub specs: Vec<JoinSpec>,
    pub hydrate: JoinHydrator<E>,
}

/// A sibling reference: the owning table holds a foreign key to another
/// keyed table, and reads bring the referenced entity back in the same
/// select. Object safe so a descriptor can hold joins to any mix of
/// target types.
pub(crate) trait JoinColumn<E>: Send + Sync {
    fn name(&self) -> &str;
    /// The foreign key value to write for this reference.
    fn bind(&self, entity: &E) -> Result<Value>;
    /// Plan this join and, transitively, the joins of its target.
    fn plan(&self, aliases: &mut AliasAllocator, owner_alias: &str) -> Result<JoinPiece<E>>;
}

pub(crate) struct JoinColumnImpl<E, R> {
    pub name: String,
    pub target: Arc<Descriptor<R>>,
    pub get: Arc<dyn for<'a> Fn(&'a E) -> Option<&'a R> + Send + Sync>,
    pub set: Arc<dyn Fn(&mut E, R) + Send + Sync>,
}

impl<E: 'static, R: 'static> JoinColumn<E> for JoinColumnImpl<E, R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind(&self, entity: &E) -> Result<Value> {
        match (self.get)(entity) {
            Some(referenced) => self
                .target
                .key
                .as_ref()
                .ok_or_else(|| {
                    Error::Configuration(format!(
                        "Join target {} has no primary key",
                        self.target.table
                    ))
                })?
                .bind(referenced),
            None => Ok(Value::Int64(None)),
        }
    }

    fn plan(&self, aliases: &mut AliasAllocator, owner_alias: &str) -> Result<JoinPiece<E>> {
        let key = self.target.key.as_ref().ok_or_else(|| {
            Error::Configuration(format!(
                "Join target {} has no primary key",
                self.target.table
            ))
        })?;
        let alias = aliases.next();

        let mut columns = vec![key.name.clone()];
        if let Some(parent) = &self.target.parent {
            columns.push(parent.name.clone());
        }
        columns.extend(self.target.data.iter().map(|c| c.name.clone()));

        let mut specs = vec![JoinSpec {
            table: self.target.table.clone(),
            alias: alias.clone(),
            owner_alias: owner_alias.to_owned(),
            fk: self.name.clone(),
            pk: key.name.clone(),
            columns,
        }];

        let mut nested: Vec<JoinHydrator<R>> = Vec::new();
        for join in &self.target.joins {
            let piece = join.plan(aliases, &alias)?;
            specs.extend(piece.specs);
            nested.push(piece.hydrate);
        }

        let target = self.target.clone();
        let set = self.set.clone();
        let pk_label = format!("{alias}{}", key.name);
        let hydrate: JoinHydrator<E> = Arc::new(move |entity, row, conn| {
            let pk = row
                .get_column(&pk_label)
                .ok_or_else(|| missing_label(&pk_label))?;
            if pk.is_null() {
                // Left join found no referenced row.
                return Ok(());
            }
            let mut referenced = (target.ctor)();
            target.populate(&mut referenced, row, &alias)?;
            for hydrator in &nested {
                hydrator(&mut referenced, row, conn)?;
            }
            for child in &target.children {
                child.populate_children(conn, &mut referenced)?;
            }
            let referenced = (target.finish)(referenced);
            set(entity, referenced);
            Ok(())
        });

        Ok(JoinPiece {
            specs,
            hydrate,
        })
    }
}
