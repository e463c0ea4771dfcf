//! Non-repeatable read: a row Tx2 already read changes under it once Tx1
//! commits, so totals computed across the two reads stop adding up.
//!
//! ```text
//! Tx1: begin ─ wait(read) ─ Alice -400 ─ Bob +400 ─ commit ─ set(written)
//! Tx2: begin ─ read Alice, Bob ─ set(read) ─ wait(written) ─ read Bob
//! ```

use sqlx::mysql::MySqlConnection;
use sqlx::Connection;
use tracing::info;

use super::{finish, ReaderResult, Signals, TxContext};
use crate::db::{close_session, open_session, AccountRepo};
use crate::error::DbError;
use crate::report::{NonRepeatableReadObservation, Observation};

pub const FROM: &str = "Alice";
pub const TO: &str = "Bob";
pub const AMOUNT: f64 = 400.0;

pub async fn writer(ctx: TxContext, signals: Signals) -> Result<(), DbError> {
    let _written = signals.written.set_on_drop();

    let mut conn = open_session(&ctx.options, ctx.level).await?;
    info!("Starting transaction 1");
    let result = run_writer(&mut conn, &ctx, &signals).await;
    // Tx2 may only re-read once the transfer is committed.
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
        let mut repo = AccountRepo::new(&mut tx);
        repo.update_balance(FROM, -AMOUNT).await?;
        info!("Updated {}'s balance by {:.2}", FROM, -AMOUNT);
        repo.update_balance(TO, AMOUNT).await?;
        info!("Updated {}'s balance by {:.2}", TO, AMOUNT);
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

    let alice = repo.require_balance(FROM).await?;
    info!("{}'s balance: {:.2}", FROM, alice);
    let bob_first = repo.require_balance(TO).await?;
    info!("{}'s balance: {:.2}", TO, bob_first);
    let first_sum = alice + bob_first;
    info!("Sum balance (1): {:.2}", first_sum);

    signals.read.set();
    ctx.wait_for_peer(&signals.written, "written").await;

    let bob_second = repo.require_balance(TO).await?;
    info!("{}'s balance: {:.2}", TO, bob_second);
    let second_sum = alice + bob_second;
    info!("Sum balance (2): {:.2}", second_sum);

    tx.commit().await?;

    Ok(Observation::NonRepeatableRead(NonRepeatableReadObservation {
        alice,
        bob_first,
        bob_second,
        first_sum,
        second_sum,
    }))
}
