use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(rusqlite::Error),

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// A UNIQUE constraint rejected the write. Carries SQLite's message,
    /// e.g. `UNIQUE constraint failed: blogs.slug`.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// JSON column encoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            rusqlite::Error::SqliteFailure(err, msg)
                if err.code == rusqlite::ErrorCode::ConstraintViolation
                    && msg.as_deref().is_some_and(|m| m.starts_with("UNIQUE")) =>
            {
                StoreError::Conflict(msg.unwrap_or_default())
            }
            other => StoreError::Sqlite(other),
        }
    }
}

impl StoreError {
    /// The column named in a UNIQUE violation (`blogs.slug` → `slug`).
    pub fn conflicting_column(&self) -> Option<&str> {
        match self {
            StoreError::Conflict(msg) => msg.rsplit('.').next().map(str::trim),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rows_maps_to_not_found() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn test_conflicting_column() {
        let err = StoreError::Conflict("UNIQUE constraint failed: blogs.slug".into());
        assert_eq!(err.conflicting_column(), Some("slug"));
        assert_eq!(StoreError::NotFound.conflicting_column(), None);
    }
}
