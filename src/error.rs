use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while describing entities or moving them
/// through a connection. `Execution` keeps the SQL that failed so a log
/// line is enough to reproduce the problem.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The descriptor is inconsistent, a requested operation does not
    /// apply to it, or a result violated a cardinality expectation.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A column declared not-null produced a null value at bind time.
    #[error("Column {column} may not be null")]
    NullBinding { column: String },
    /// A fetched value did not match the type the column expects.
    #[error("Column {column} expected {expected}, found {found}")]
    Conversion {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
    /// The backend rejected a statement.
    #[error("Error while executing `{sql}`: {message}")]
    Execution { sql: String, message: String },
    /// The connection was closed while a statement or stream still
    /// needed it.
    #[error("Connection is closed")]
    ClosedConnection,
}
