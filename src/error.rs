use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Backend temporarily refused the request (rate limit, connection reset).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppError {
    /// Whether retrying the same storage call may succeed.
    ///
    /// Parse, configuration and data errors are never transient.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Database(db_err) => matches!(
                db_err,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_)
            ),
            AppError::Io(_) => true,
            AppError::Unavailable(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AppError::Unavailable("429".to_string()).is_transient());
        assert!(AppError::Io(std::io::Error::other("reset")).is_transient());
        assert!(AppError::Database(sqlx::Error::PoolTimedOut).is_transient());

        assert!(!AppError::InvalidData("bad".to_string()).is_transient());
        assert!(!AppError::Storage("denied".to_string()).is_transient());
        assert!(!AppError::Database(sqlx::Error::RowNotFound).is_transient());
    }
}
