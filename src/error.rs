use rusqlite::ffi;
use thiserror::Error;

/// Which database constraint rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    PrimaryKey,
    ForeignKey,
    NotNull,
    Check,
    Other,
}

impl ConstraintKind {
    fn from_extended_code(code: i32) -> Self {
        match code {
            ffi::SQLITE_CONSTRAINT_UNIQUE => ConstraintKind::Unique,
            ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_ROWID => {
                ConstraintKind::PrimaryKey
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintKind::ForeignKey,
            ffi::SQLITE_CONSTRAINT_NOTNULL => ConstraintKind::NotNull,
            ffi::SQLITE_CONSTRAINT_CHECK => ConstraintKind::Check,
            _ => ConstraintKind::Other,
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind:?} constraint violated: {message}")]
    Constraint { kind: ConstraintKind, message: String },

    #[error("no {entity} matching {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("invalid NUMERIC(12,2) value: {0}")]
    InvalidNumeric(String),

    #[error("failed to hash password")]
    PasswordHash,

    #[error("cookie stream has already been consumed")]
    StreamConsumed,

    #[error("failed to load store configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("sqlite error: {0}")]
    Sqlite(#[source] rusqlite::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// The constraint kind, if this error is a constraint violation.
    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        match self {
            StoreError::Constraint { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Constraint {
                    kind: ConstraintKind::from_extended_code(failure.extended_code),
                    message: message.unwrap_or_else(|| failure.to_string()),
                }
            }
            other => StoreError::Sqlite(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn classifies_unique_and_not_null_failures() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT NOT NULL UNIQUE);")
            .unwrap();
        conn.execute("INSERT INTO t (name) VALUES ('a')", []).unwrap();

        let dup: StoreError = conn
            .execute("INSERT INTO t (name) VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert_eq!(dup.constraint_kind(), Some(ConstraintKind::Unique));

        let null: StoreError = conn
            .execute("INSERT INTO t (name) VALUES (NULL)", [])
            .unwrap_err()
            .into();
        assert_eq!(null.constraint_kind(), Some(ConstraintKind::NotNull));
    }

    #[test]
    fn non_constraint_failures_stay_sqlite_errors() {
        let conn = Connection::open_in_memory().unwrap();
        let err: StoreError = conn.execute("SELECT * FROM missing", []).unwrap_err().into();
        assert!(matches!(err, StoreError::Sqlite(_)));
        assert_eq!(err.constraint_kind(), None);
    }
}
