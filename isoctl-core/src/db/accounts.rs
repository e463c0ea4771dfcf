//! Account repository
//!
//! Every helper runs exactly one statement on the borrowed connection, so it
//! participates in whatever transaction the caller has open. Balances are
//! cast to DOUBLE in SQL so DECIMAL and DOUBLE columns both decode as `f64`.

use sqlx::mysql::MySqlConnection;

use crate::error::DbError;

/// Account repository bound to one open session or transaction
pub struct AccountRepo<'c> {
    conn: &'c mut MySqlConnection,
}

impl<'c> AccountRepo<'c> {
    pub fn new(conn: &'c mut MySqlConnection) -> Self {
        Self { conn }
    }

    /// Balance of `holder`, or `None` if no such account is visible.
    pub async fn fetch_balance(&mut self, holder: &str) -> Result<Option<f64>, DbError> {
        let balance = sqlx::query_scalar::<_, f64>(
            "SELECT CAST(balance AS DOUBLE) FROM accounts WHERE account_holder = ?",
        )
        .bind(holder)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(balance)
    }

    /// Like [`fetch_balance`](Self::fetch_balance) but a missing account is an error.
    pub async fn require_balance(&mut self, holder: &str) -> Result<f64, DbError> {
        self.fetch_balance(holder)
            .await?
            .ok_or_else(|| DbError::account_not_found(holder))
    }

    /// `balance = balance + delta`; returns the number of rows touched.
    pub async fn update_balance(&mut self, holder: &str, delta: f64) -> Result<u64, DbError> {
        let result = sqlx::query(
            "UPDATE accounts SET balance = balance + ? WHERE account_holder = ?",
        )
        .bind(delta)
        .bind(holder)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Insert a new account. Negative opening balances are rejected before
    /// the statement is sent.
    pub async fn insert(&mut self, holder: &str, amount: f64) -> Result<(), DbError> {
        validate_opening_balance(holder, amount)?;

        sqlx::query("INSERT INTO accounts (account_holder, balance) VALUES (?, ?)")
            .bind(holder)
            .bind(amount)
            .execute(&mut *self.conn)
            .await?;

        Ok(())
    }

    /// Sum of every visible balance; `None` when no rows are visible.
    pub async fn sum_balance(&mut self) -> Result<Option<f64>, DbError> {
        let sum = sqlx::query_scalar::<_, Option<f64>>(
            "SELECT CAST(SUM(balance) AS DOUBLE) FROM accounts",
        )
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(sum)
    }

    pub async fn count_accounts(&mut self) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts")
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(count)
    }

    /// Remove every row. TRUNCATE commits implicitly on MySQL.
    pub async fn truncate(&mut self) -> Result<(), DbError> {
        sqlx::raw_sql("TRUNCATE accounts")
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }
}

fn validate_opening_balance(holder: &str, amount: f64) -> Result<(), DbError> {
    if amount < 0.0 || amount.is_nan() {
        return Err(DbError::NegativeAmount {
            holder: holder.to_string(),
            amount,
        });
    }
    Ok(())
}
