/// Structured error types for isoctl-core.
///
/// The binary (isoctl-cli) wraps these in `anyhow` for reporting; library
/// callers get composable errors.
use thiserror::Error;

/// Errors raised by the account query helpers.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("account '{holder}' not found")]
    AccountNotFound { holder: String },

    #[error("balance cannot be negative: {holder} with {amount:.2}")]
    NegativeAmount { holder: String, amount: f64 },

    #[error("accounts table is empty")]
    EmptyTable,
}

/// Main error type for isoctl-core operations
#[derive(Error, Debug)]
pub enum IsoError {
    #[error(transparent)]
    Db(#[from] DbError),

    /// Isolation level string did not name one of the four SQL levels
    #[error("Unsupported isolation level: {0}")]
    UnsupportedIsolationLevel(String),

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// A transaction task panicked or was cancelled
    #[error("transaction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type alias for isoctl-core operations
pub type Result<T> = std::result::Result<T, IsoError>;

impl From<sqlx::Error> for IsoError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(DbError::Sqlx(err))
    }
}

impl IsoError {
    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

impl DbError {
    pub fn account_not_found(holder: impl Into<String>) -> Self {
        Self::AccountNotFound {
            holder: holder.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::account_not_found("Alice");
        assert_eq!(err.to_string(), "account 'Alice' not found");

        let err = DbError::NegativeAmount {
            holder: "Michael".into(),
            amount: -5.0,
        };
        assert_eq!(
            err.to_string(),
            "balance cannot be negative: Michael with -5.00"
        );

        let err = IsoError::UnsupportedIsolationLevel("SNAPSHOT".into());
        assert!(err.to_string().contains("SNAPSHOT"));
    }

    #[test]
    fn test_db_error_is_transparent() {
        let err: IsoError = DbError::EmptyTable.into();
        assert!(matches!(err, IsoError::Db(DbError::EmptyTable)));
        assert_eq!(err.to_string(), "accounts table is empty");
    }

    #[test]
    fn test_config_helper() {
        let err = IsoError::config("bad port");
        assert_eq!(err.to_string(), "Configuration error: bad port");
    }
}
