//! Session management
//!
//! One dedicated MySQL connection per transaction. Pooling would hand the
//! session-scoped isolation level to whoever borrows the connection next, so
//! every session is opened fresh and closed when its transaction ends.

use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection, Executor, Transaction};
use tracing::{debug, error, info};

use crate::error::DbError;
use crate::isolation::IsolationLevel;

/// Open a session and apply `level` to every transaction it starts.
///
/// # Errors
///
/// Returns an error if the connection or the `SET SESSION` statement fails.
///
/// # Example
///
/// ```ignore
/// let mut conn = open_session(&options, IsolationLevel::ReadCommitted).await?;
/// let mut tx = conn.begin().await?;
/// ```
pub async fn open_session(
    options: &MySqlConnectOptions,
    level: IsolationLevel,
) -> Result<MySqlConnection, DbError> {
    let mut conn = options.connect().await?;
    set_isolation_level(&mut conn, level).await?;
    debug!(level = %level, "session opened");
    Ok(conn)
}

/// Apply `level` to the remainder of the session.
pub async fn set_isolation_level(
    conn: &mut MySqlConnection,
    level: IsolationLevel,
) -> Result<(), DbError> {
    conn.execute(level.set_session_statement().as_str()).await?;
    Ok(())
}

/// Read the level the server reports for this session.
pub async fn current_isolation_level(
    conn: &mut MySqlConnection,
) -> Result<String, DbError> {
    let level: String = sqlx::query_scalar("SELECT @@SESSION.transaction_isolation")
        .fetch_one(&mut *conn)
        .await?;
    Ok(level)
}

/// Close the session, logging instead of failing: by the time a session is
/// closed its transaction has already committed or rolled back.
pub async fn close_session(conn: MySqlConnection, label: &str) {
    if let Err(e) = conn.close().await {
        debug!(label, error = %e, "error while closing session");
    }
}

/// Commit on success, roll back on failure.
///
/// A failed rollback is logged; the error that caused it is the one returned.
pub async fn finish(
    tx: Transaction<'_, MySql>,
    result: Result<(), DbError>,
) -> Result<(), DbError> {
    match result {
        Ok(()) => {
            tx.commit().await?;
            info!("Transaction committed");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Transaction failed");
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %rollback_err, "Rollback failed");
            } else {
                info!("Transaction rolled back");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    // Integration tests require a real database
    // Run with: DATABASE_URL=mysql://... cargo test -p isoctl-core -- --ignored

    #[tokio::test]
    #[ignore = "requires database"]
    async fn session_reports_requested_level() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let options = MySqlConnectOptions::from_str(&url).expect("bad DATABASE_URL");

        for level in IsolationLevel::ALL {
            let mut conn = open_session(&options, level).await.expect("connect failed");
            let reported = current_isolation_level(&mut conn).await.expect("query failed");
            // MySQL reports e.g. "REPEATABLE-READ"
            assert_eq!(IsolationLevel::from_str(&reported).unwrap(), level);
            close_session(conn, "test").await;
        }
    }
}
