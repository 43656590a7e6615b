use crate::{row::Connection, Result};
use log::warn;

/// Runs a unit of work inside a transaction.
///
/// On success the transaction commits and the connection stays usable.
/// On failure the transaction rolls back, the connection is closed, and
/// the original error propagates. A connection whose transactional state
/// is unknown is not worth keeping.
pub struct Transactor;

impl Transactor {
    pub fn run_and_commit<T>(
        conn: &mut dyn Connection,
        action: impl FnOnce(&mut dyn Connection) -> Result<T>,
    ) -> Result<T> {
        conn.begin()?;
        match action(conn) {
            Ok(value) => {
                conn.commit()?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback) = conn.rollback() {
                    warn!("Rollback failed after `{error}`: {rollback}");
                }
                conn.close();
                Err(error)
            }
        }
    }
}
