//! Hardcoded table reset run before every scenario.

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::Connection;
use tracing::{error, info};

use super::accounts::AccountRepo;
use super::connection::{close_session, finish, open_session};
use crate::error::DbError;
use crate::isolation::IsolationLevel;

/// Rows every scenario starts from.
pub const SEED_ACCOUNTS: [(&str, f64); 2] = [("Alice", 1000.0), ("Bob", 500.0)];

/// Seeded balance of `holder`, if it is one of the seed rows.
pub fn seed_balance(holder: &str) -> Option<f64> {
    SEED_ACCOUNTS
        .iter()
        .find(|(name, _)| *name == holder)
        .map(|(_, balance)| *balance)
}

/// Sum of the seeded balances.
pub fn seed_total() -> f64 {
    SEED_ACCOUNTS.iter().map(|(_, balance)| balance).sum()
}

/// Truncate `accounts` and reseed it in a READ COMMITTED session.
///
/// On failure the reseeding transaction is rolled back before the error is
/// returned.
pub async fn reset_database(options: &MySqlConnectOptions) -> Result<(), DbError> {
    let mut conn = open_session(options, IsolationLevel::ReadCommitted).await?;
    let result = reseed(&mut conn).await;
    close_session(conn, "reset").await;

    match &result {
        Ok(()) => info!("Database reset to initial state"),
        Err(e) => error!(error = %e, "Error resetting database"),
    }
    result
}

async fn reseed(conn: &mut MySqlConnection) -> Result<(), DbError> {
    AccountRepo::new(&mut *conn).truncate().await?;

    let mut tx = conn.begin().await?;
    let result = insert_seed(&mut tx).await;
    finish(tx, result).await
}

async fn insert_seed(conn: &mut MySqlConnection) -> Result<(), DbError> {
    let mut repo = AccountRepo::new(conn);
    for (holder, balance) in SEED_ACCOUNTS {
        repo.insert(holder, balance).await?;
    }
    Ok(())
}
