//! SQL registry error conversion.

use fl_registry::RegistryError;
use sqlx::Error as SqlxError;

/// Converts a `SQLx` error to a registry error.
#[allow(clippy::needless_pass_by_value)]
pub fn from_sqlx_error(err: SqlxError) -> RegistryError {
    match err {
        SqlxError::Database(db_err) => RegistryError::Io(db_err.to_string()),
        SqlxError::PoolTimedOut => RegistryError::Connection("Connection pool timeout".to_string()),
        SqlxError::PoolClosed => RegistryError::Connection("Connection pool closed".to_string()),
        SqlxError::Io(io) => RegistryError::Connection(io.to_string()),
        SqlxError::ColumnDecode { .. } | SqlxError::Decode(_) => {
            RegistryError::Serialization(err.to_string())
        }
        _ => RegistryError::Internal(err.to_string()),
    }
}
