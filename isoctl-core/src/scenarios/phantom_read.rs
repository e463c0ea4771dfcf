//! Phantom read: Tx2 counts rows, Tx1 inserts and commits a new one, and
//! Tx2's aggregate now covers a row its count never saw.
//!
//! ```text
//! Tx1: begin ─ wait(read) ─ insert Michael 600 ─ commit ─ set(written)
//! Tx2: begin ─ count ─ set(read) ─ wait(written) ─ sum ─ average = sum / count
//! ```
//!
//! Under SERIALIZABLE, InnoDB turns Tx2's count into a locking read, so
//! Tx1's insert blocks until Tx2 finishes. Tx2's wait then runs into the
//! signal timeout, which the observation records as `writer_blocked`.

use sqlx::mysql::MySqlConnection;
use sqlx::Connection;
use tracing::info;

use super::{finish, ReaderResult, Signals, TxContext};
use crate::db::{close_session, open_session, seed_total, AccountRepo};
use crate::error::DbError;
use crate::report::{Observation, PhantomReadObservation};

pub const NEW_HOLDER: &str = "Michael";
pub const NEW_BALANCE: f64 = 600.0;

pub async fn writer(ctx: TxContext, signals: Signals) -> Result<(), DbError> {
    let _written = signals.written.set_on_drop();

    let mut conn = open_session(&ctx.options, ctx.level).await?;
    info!("Starting transaction 1");
    let result = run_writer(&mut conn, &ctx, &signals).await;
    signals.written.set();
    close_session(conn, &ctx.label).await;
    result
}

async fn run_writer(
    conn: &mut MySqlConnection,
    ctx: &TxContext,
    signals: &Signals,
) -> Result<(), DbError> {
    let mut tx = conn.begin().await?;
    ctx.wait_for_peer(&signals.read, "read").await;

    let result = async {
        AccountRepo::new(&mut tx).insert(NEW_HOLDER, NEW_BALANCE).await?;
        info!("Inserted holder {} with balance {:.2}", NEW_HOLDER, NEW_BALANCE);
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
    let mut repo = AccountRepo::new(&mut tx);

    let count = repo.count_accounts().await?;
    info!("Count: {}", count);
    if count == 0 {
        return Err(DbError::EmptyTable);
    }

    signals.read.set();
    let writer_blocked = !ctx.wait_for_peer(&signals.written, "written").await;

    let sum = repo.sum_balance().await?.ok_or(DbError::EmptyTable)?;
    info!("Sum balance: {:.2}", sum);
    let average = sum / count as f64;
    info!("Average: {:.2}", average);

    tx.commit().await?;

    Ok(Observation::PhantomRead(PhantomReadObservation {
        count,
        sum,
        average,
        expected_sum: seed_total(),
        writer_blocked,
    }))
}
