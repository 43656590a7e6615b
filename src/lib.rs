//! Hierarchical relational persistence.
//!
//! An entity type is described once, by hand, through a
//! [`DescriptorBuilder`]: its table, its columns with explicit accessor
//! and mutator closures, an optional sequence assigned primary key,
//! sibling references fetched through left joins, and owned child
//! collections persisted, loaded, and pruned together with their parent.
//! The resulting [`Descriptor`] drives a [`Dao`] that generates all SQL
//! itself and binds parameters in a single fixed column order, so no
//! query language is needed on the caller's side.
//!
//! Storage is reached through the [`Connection`] trait. The crate ships
//! an in process implementation in [`memory`] for tests and examples.

mod cascade;
mod column;
mod dao;
mod descriptor;
mod error;
pub mod memory;
mod predicate;
mod row;
mod runner;
mod sql_writer;
mod stream;
mod transaction;
mod value;

pub use column::{DataColumn, KeyColumn, ParentColumn};
pub use dao::Dao;
pub use descriptor::{Descriptor, DescriptorBuilder};
pub use error::{Error, Result};
pub use predicate::{Operator, Where};
pub use row::{Connection, RowCursor, RowLabeled};
pub use sql_writer::{SqlFunction, SqlWriter};
pub use stream::EntityStream;
pub use transaction::Transactor;
pub use value::{AsValue, FromValue, Value};
