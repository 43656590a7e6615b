use crate::{
    cascade::{ChildBinding, ChildRelation},
    column::{
        DataColumn, JoinColumn, JoinColumnImpl, JoinHydrator, JoinSpec, KeyColumn, ParentColumn,
    },
    value::{AsValue, FromValue},
    Error, Result, RowLabeled, Value,
};
use std::sync::Arc;

/// Hands out table aliases for the join plan. The root table is always
/// `a`, joined tables get the following letters in the order the plan
/// visits them.
pub(crate) struct AliasAllocator {
    next: usize,
}

pub(crate) const ROOT_ALIAS: &str = "a";

impl AliasAllocator {
    pub fn new() -> Self {
        // Slot zero is the root alias.
        Self { next: 1 }
    }

    pub fn next(&mut self) -> String {
        let mut n = self.next;
        self.next += 1;
        let mut alias = String::new();
        loop {
            alias.insert(0, (b'a' + (n % 26) as u8) as char);
            n /= 26;
            if n == 0 {
                break;
            }
        }
        alias
    }
}

/// One position in the parameter list of an insert or update statement.
///
/// The same slot sequence produces both the column names in the SQL text
/// and the values bound against it, so the two can never drift apart.
pub(crate) enum BindSlot<'a, E> {
    Key(&'a KeyColumn<E>),
    Parent(&'a ParentColumn<E>),
    Data(&'a DataColumn<E>),
    Join(&'a dyn JoinColumn<E>),
}

impl<'a, E> BindSlot<'a, E> {
    pub fn name(&self) -> &str {
        match self {
            BindSlot::Key(c) => c.name(),
            BindSlot::Parent(c) => c.name(),
            BindSlot::Data(c) => c.name(),
            BindSlot::Join(c) => c.name(),
        }
    }

    pub fn bind(&self, entity: &E) -> Result<Value> {
        match self {
            BindSlot::Key(c) => c.bind(entity),
            BindSlot::Parent(c) => c.bind(entity),
            BindSlot::Data(c) => c.bind(entity),
            BindSlot::Join(c) => c.bind(entity),
        }
    }

    pub fn is_key(&self) -> bool {
        matches!(self, BindSlot::Key(..))
    }
}

/// The complete mapping of one entity type onto one table: its columns,
/// its sibling references, and its owned children. Immutable once built,
/// shared behind an `Arc` by every component that works with the type.
pub struct Descriptor<E> {
    pub(crate) table: String,
    pub(crate) ctor: Arc<dyn Fn() -> E + Send + Sync>,
    pub(crate) finish: Arc<dyn Fn(E) -> E + Send + Sync>,
    pub(crate) key: Option<KeyColumn<E>>,
    pub(crate) parent: Option<ParentColumn<E>>,
    pub(crate) data: Vec<DataColumn<E>>,
    pub(crate) joins: Vec<Arc<dyn JoinColumn<E>>>,
    pub(crate) children: Vec<Arc<dyn ChildRelation<E>>>,
    /// Flattened join plan, computed once at build time.
    pub(crate) join_specs: Vec<JoinSpec>,
    pub(crate) join_hydrators: Vec<JoinHydrator<E>>,
}

impl<E> Descriptor<E> {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key(&self) -> Option<&KeyColumn<E>> {
        self.key.as_ref()
    }

    pub(crate) fn key_required(&self) -> Result<&KeyColumn<E>> {
        self.key.as_ref().ok_or_else(|| {
            Error::Configuration(format!("Table {} has no primary key", self.table))
        })
    }

    /// All parameter slots of this entity in statement order: key, data
    /// columns, parent reference, then join references.
    pub(crate) fn bind_order(&self) -> Vec<BindSlot<'_, E>> {
        let mut slots = Vec::new();
        if let Some(key) = &self.key {
            slots.push(BindSlot::Key(key));
        }
        for column in &self.data {
            slots.push(BindSlot::Data(column));
        }
        if let Some(parent) = &self.parent {
            slots.push(BindSlot::Parent(parent));
        }
        for join in &self.joins {
            slots.push(BindSlot::Join(join.as_ref()));
        }
        slots
    }

    /// Read the directly mapped columns of one row into the entity,
    /// using the given table alias as the label prefix. Joins and
    /// children are layered on separately.
    pub(crate) fn populate(&self, entity: &mut E, row: &RowLabeled, alias: &str) -> Result<()> {
        if let Some(key) = &self.key {
            key.populate(entity, row, alias)?;
        }
        if let Some(parent) = &self.parent {
            parent.populate(entity, row, alias)?;
        }
        for column in &self.data {
            column.populate(entity, row, alias)?;
        }
        Ok(())
    }
}

type ChildFactory<E> = Box<dyn FnOnce(&KeyColumn<E>) -> Result<Arc<dyn ChildRelation<E>>>>;

/// Assembles a [`Descriptor`] one column at a time.
///
/// ```no_run
/// # use strata::{Descriptor, DescriptorBuilder};
/// # use std::sync::Arc;
/// #[derive(Default)]
/// struct Ingredient {
///     id: Option<i64>,
///     name: Option<String>,
///     amount: Option<i64>,
/// }
///
/// let descriptor: Arc<Descriptor<Ingredient>> =
///     DescriptorBuilder::new("ingredient", Ingredient::default)
///         .with_primary_key("id", "ingredient_seq", |i| i.id, |i, v| i.id = Some(v))
///         .with_string_column("name", |i| i.name.clone(), |i, v| i.name = v)
///         .not_null()
///         .with_long_column("amount", |i| i.amount, |i, v| i.amount = v)
///         .build()
///         .unwrap();
/// ```
pub struct DescriptorBuilder<E> {
    table: String,
    ctor: Arc<dyn Fn() -> E + Send + Sync>,
    finish: Arc<dyn Fn(E) -> E + Send + Sync>,
    key: Option<KeyColumn<E>>,
    parent: Option<ParentColumn<E>>,
    data: Vec<DataColumn<E>>,
    joins: Vec<Arc<dyn JoinColumn<E>>>,
    children: Vec<ChildFactory<E>>,
    defect: Option<String>,
}

impl<E: 'static> DescriptorBuilder<E> {
    pub fn new(table: &str, ctor: impl Fn() -> E + Send + Sync + 'static) -> Self {
        Self {
            table: table.to_owned(),
            ctor: Arc::new(ctor),
            finish: Arc::new(|e| e),
            key: None,
            parent: None,
            data: Vec::new(),
            joins: Vec::new(),
            children: Vec::new(),
            defect: None,
        }
    }

    fn note_defect(&mut self, message: String) {
        if self.defect.is_none() {
            self.defect = Some(message);
        }
    }

    fn data_column<T, G, S>(mut self, name: &str, get: G, set: S) -> Self
    where
        T: 'static,
        Option<T>: AsValue + FromValue,
        G: Fn(&E) -> Option<T> + Send + Sync + 'static,
        S: Fn(&mut E, Option<T>) + Send + Sync + 'static,
    {
        self.data.push(DataColumn {
            name: name.to_owned(),
            nullable: true,
            get: Arc::new(move |entity| get(entity).as_value()),
            set: Arc::new(move |entity, value| {
                set(entity, FromValue::from_value(value)?);
                Ok(())
            }),
        });
        self
    }

    pub fn with_long_column(
        self,
        name: &str,
        get: impl Fn(&E) -> Option<i64> + Send + Sync + 'static,
        set: impl Fn(&mut E, Option<i64>) + Send + Sync + 'static,
    ) -> Self {
        self.data_column(name, get, set)
    }

    pub fn with_string_column(
        self,
        name: &str,
        get: impl Fn(&E) -> Option<String> + Send + Sync + 'static,
        set: impl Fn(&mut E, Option<String>) + Send + Sync + 'static,
    ) -> Self {
        self.data_column(name, get, set)
    }

    pub fn with_boolean_column(
        self,
        name: &str,
        get: impl Fn(&E) -> Option<bool> + Send + Sync + 'static,
        set: impl Fn(&mut E, Option<bool>) + Send + Sync + 'static,
    ) -> Self {
        self.data_column(name, get, set)
    }

    pub fn with_float_column(
        self,
        name: &str,
        get: impl Fn(&E) -> Option<f64> + Send + Sync + 'static,
        set: impl Fn(&mut E, Option<f64>) + Send + Sync + 'static,
    ) -> Self {
        self.data_column(name, get, set)
    }

    pub fn with_decimal_column(
        self,
        name: &str,
        get: impl Fn(&E) -> Option<rust_decimal::Decimal> + Send + Sync + 'static,
        set: impl Fn(&mut E, Option<rust_decimal::Decimal>) + Send + Sync + 'static,
    ) -> Self {
        self.data_column(name, get, set)
    }

    pub fn with_timestamp_column(
        self,
        name: &str,
        get: impl Fn(&E) -> Option<time::OffsetDateTime> + Send + Sync + 'static,
        set: impl Fn(&mut E, Option<time::OffsetDateTime>) + Send + Sync + 'static,
    ) -> Self {
        self.data_column(name, get, set)
    }

    /// Mark the most recently added data column as not nullable. Binding
    /// a null through it then fails before the statement runs.
    pub fn not_null(mut self) -> Self {
        match self.data.last_mut() {
            Some(column) => column.nullable = false,
            None => self.note_defect(format!(
                "not_null on table {} applies to no column",
                self.table
            )),
        }
        self
    }

    pub fn with_primary_key(
        mut self,
        name: &str,
        sequence: &str,
        get: impl Fn(&E) -> Option<i64> + Send + Sync + 'static,
        set: impl Fn(&mut E, i64) + Send + Sync + 'static,
    ) -> Self {
        if self.key.is_some() {
            self.note_defect(format!("Table {} declares two primary keys", self.table));
        }
        self.key = Some(KeyColumn {
            name: name.to_owned(),
            sequence: sequence.to_owned(),
            get: Arc::new(get),
            set: Arc::new(set),
        });
        self
    }

    /// Declare the foreign key this table holds back to its owning
    /// parent. Only meaningful on descriptors used as children.
    pub fn with_parent_column(
        mut self,
        name: &str,
        get: impl Fn(&E) -> Option<i64> + Send + Sync + 'static,
        set: impl Fn(&mut E, i64) + Send + Sync + 'static,
    ) -> Self {
        if self.parent.is_some() {
            self.note_defect(format!("Table {} declares two parent columns", self.table));
        }
        self.parent = Some(ParentColumn {
            name: name.to_owned(),
            get: Arc::new(get),
            set: Arc::new(set),
        });
        self
    }

    /// Declare a sibling reference held as a foreign key column. Reads
    /// bring the referenced entity back through a left join in the same
    /// select.
    pub fn with_join_column<R: 'static>(
        mut self,
        name: &str,
        target: &Arc<Descriptor<R>>,
        get: impl for<'a> Fn(&'a E) -> Option<&'a R> + Send + Sync + 'static,
        set: impl Fn(&mut E, R) + Send + Sync + 'static,
    ) -> Self {
        self.joins.push(Arc::new(JoinColumnImpl {
            name: name.to_owned(),
            target: target.clone(),
            get: Arc::new(get),
            set: Arc::new(set),
        }));
        self
    }

    /// Declare an owned collection of child entities. The child
    /// descriptor must carry a primary key and a parent column.
    pub fn with_children<C: 'static>(
        mut self,
        child: &Arc<Descriptor<C>>,
        lens: impl for<'a> Fn(&'a mut E) -> &'a mut Vec<C> + Send + Sync + 'static,
    ) -> Self {
        let child = child.clone();
        let lens = Arc::new(lens);
        self.children.push(Box::new(move |parent_key| {
            let binding = ChildBinding::new(parent_key.clone(), child, lens)?;
            Ok(Arc::new(binding) as Arc<dyn ChildRelation<E>>)
        }));
        self
    }

    /// Run a final transformation over each entity after all of its
    /// columns, references, and children have been filled in.
    pub fn finishing(mut self, f: impl Fn(E) -> E + Send + Sync + 'static) -> Self {
        self.finish = Arc::new(f);
        self
    }

    pub fn build(self) -> Result<Arc<Descriptor<E>>> {
        if let Some(defect) = self.defect {
            return Err(Error::Configuration(defect));
        }
        if !self.children.is_empty() && self.key.is_none() {
            return Err(Error::Configuration(format!(
                "Table {} owns children but has no primary key",
                self.table
            )));
        }

        let mut join_specs = Vec::new();
        let mut join_hydrators = Vec::new();
        let mut aliases = AliasAllocator::new();
        for join in &self.joins {
            let piece = join.plan(&mut aliases, ROOT_ALIAS)?;
            join_specs.extend(piece.specs);
            join_hydrators.push(piece.hydrate);
        }

        let mut children = Vec::new();
        if let Some(key) = &self.key {
            for factory in self.children {
                children.push(factory(key)?);
            }
        }

        Ok(Arc::new(Descriptor {
            table: self.table,
            ctor: self.ctor,
            finish: self.finish,
            key: self.key,
            parent: self.parent,
            data: self.data,
            joins: self.joins,
            children,
            join_specs,
            join_hydrators,
        }))
    }
}
