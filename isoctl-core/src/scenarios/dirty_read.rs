//! Dirty read: Tx2 reads a change Tx1 has not committed yet.
//!
//! ```text
//! Tx1: begin ─ update Alice +100 ─ set(written) ─ wait(read) ─ commit
//! Tx2: begin ─ wait(written) ─ read Alice ─ set(read) ─ sleep ─ read Alice
//! ```

use sqlx::mysql::MySqlConnection;
use sqlx::Connection;
use tracing::info;

use super::{finish, ReaderResult, Signals, TxContext};
use crate::db::{close_session, open_session, seed_balance, AccountRepo};
use crate::error::DbError;
use crate::report::{DirtyReadObservation, Observation};

pub const HOLDER: &str = "Alice";
pub const DELTA: f64 = 100.0;

pub async fn writer(ctx: TxContext, signals: Signals) -> Result<(), DbError> {
    let _written = signals.written.set_on_drop();

    let mut conn = open_session(&ctx.options, ctx.level).await?;
    info!("Starting transaction 1");
    let result = run_writer(&mut conn, &ctx, &signals).await;
    close_session(conn, &ctx.label).await;
    result
}

async fn run_writer(
    conn: &mut MySqlConnection,
    ctx: &TxContext,
    signals: &Signals,
) -> Result<(), DbError> {
    let mut tx = conn.begin().await?;
    let result = async {
        AccountRepo::new(&mut tx).update_balance(HOLDER, DELTA).await?;
        info!("Updated {}'s balance by {:.2}, not committed", HOLDER, DELTA);
        signals.written.set();

        ctx.wait_for_peer(&signals.read, "read").await;
        Ok::<_, DbError>(())
    }
    .await;
    finish(tx, result).await
}

pub async fn reader(ctx: TxContext, signals: Signals) -> ReaderResult {
    let _read = signals.read.set_on_drop();

    let mut conn = open_session(&ctx.options, ctx.level).await?;
    info!("Starting transaction 2");
    let result = run_reader(&mut conn, &ctx, &signals).await;
    close_session(conn, &ctx.label).await;
    result
}

async fn run_reader(
    conn: &mut MySqlConnection,
    ctx: &TxContext,
    signals: &Signals,
) -> ReaderResult {
    let mut tx = conn.begin().await?;

    ctx.wait_for_peer(&signals.written, "written").await;

    let mut repo = AccountRepo::new(&mut tx);
    let first_read = repo.require_balance(HOLDER).await?;
    info!("(first read) {}'s balance: {:.2}", HOLDER, first_read);
    signals.read.set();

    tokio::time::sleep(ctx.choreography.settle_delay()).await;

    let second_read = repo.require_balance(HOLDER).await?;
    info!("(second read) {}'s balance: {:.2}", HOLDER, second_read);

    tx.commit().await?;

    let committed_value = seed_balance(HOLDER).ok_or_else(|| DbError::account_not_found(HOLDER))?;
    Ok(Observation::DirtyRead(DirtyReadObservation {
        committed_value,
        uncommitted_value: committed_value + DELTA,
        first_read,
        second_read,
    }))
}
