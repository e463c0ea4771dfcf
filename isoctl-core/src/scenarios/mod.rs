//! Anomaly scenarios
//!
//! Each scenario pairs a writer (Tx1) with a reader (Tx2). Both run as
//! separate tokio tasks on separate sessions and interleave through a fresh
//! [`Signals`] pair:
//!
//! - `written`: set by Tx1 once its change is in place
//! - `read`: set by Tx2 once it has taken its first reading
//!
//! The table is reset before every run. A run is repeated per isolation
//! level, weakest first.

use std::future::Future;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlConnectOptions;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{ChoreographySettings, Settings};
pub(crate) use crate::db::finish;
use crate::db::reset_database;
use crate::error::{DbError, Result};
use crate::isolation::IsolationLevel;
use crate::report::{Observation, RunReport, ScenarioReport};
use crate::signal::Signal;

pub mod dirty_read;
pub mod non_repeatable_read;
pub mod phantom_read;

pub use crate::signal::Signals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anomaly {
    DirtyRead,
    NonRepeatableRead,
    PhantomRead,
}

impl Anomaly {
    pub const ALL: [Anomaly; 3] = [
        Anomaly::DirtyRead,
        Anomaly::NonRepeatableRead,
        Anomaly::PhantomRead,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Anomaly::DirtyRead => "dirty read",
            Anomaly::NonRepeatableRead => "non-repeatable read",
            Anomaly::PhantomRead => "phantom read",
        }
    }

    /// Level that exhibits the anomaly, then the weakest level that prevents it.
    pub fn default_levels(&self) -> [IsolationLevel; 2] {
        match self {
            Anomaly::DirtyRead => [IsolationLevel::ReadUncommitted, IsolationLevel::ReadCommitted],
            Anomaly::NonRepeatableRead => {
                [IsolationLevel::ReadCommitted, IsolationLevel::RepeatableRead]
            }
            Anomaly::PhantomRead => [IsolationLevel::ReadCommitted, IsolationLevel::Serializable],
        }
    }
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What one transaction task needs: where to connect, at which level, and
/// how long to wait for its peer.
#[derive(Debug, Clone)]
pub struct TxContext {
    pub options: MySqlConnectOptions,
    pub level: IsolationLevel,
    pub label: String,
    pub choreography: ChoreographySettings,
}

impl TxContext {
    fn new(runner: &Runner, tx_number: u8, level: IsolationLevel) -> Self {
        Self {
            options: runner.options.clone(),
            level,
            label: format!("Tx{}-{}", tx_number, level),
            choreography: runner.choreography.clone(),
        }
    }

    /// Wait for the peer's signal, bounded by the signal timeout.
    ///
    /// Returns `false` when the peer did not signal in time, which happens
    /// legitimately when the peer is blocked on a lock this transaction holds.
    pub async fn wait_for_peer(&self, signal: &Signal, event: &str) -> bool {
        debug!(event, "waiting for peer");
        let timeout = self.choreography.signal_timeout();
        let arrived = signal.wait_timeout(timeout).await;
        if !arrived {
            warn!(
                event,
                timeout_ms = self.choreography.signal_timeout_ms,
                "peer did not signal in time, continuing"
            );
        }
        arrived
    }
}

/// Runs scenarios against one database.
#[derive(Debug, Clone)]
pub struct Runner {
    options: MySqlConnectOptions,
    choreography: ChoreographySettings,
}

impl Runner {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            options: settings.database.connect_options()?,
            choreography: settings.choreography.clone(),
        })
    }

    pub async fn reset(&self) -> Result<()> {
        reset_database(&self.options).await?;
        Ok(())
    }

    /// Reset the table, then run one writer/reader pair at `level`.
    pub async fn run(&self, anomaly: Anomaly, level: IsolationLevel) -> Result<RunReport> {
        self.reset().await?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        let signals = Signals::new();

        info!(%run_id, scenario = %anomaly, level = %level, "Starting run");

        let (writer, reader) = self.spawn_pair(anomaly, level, signals, run_id);
        let (writer, reader) = tokio::join!(writer, reader);
        let writer = writer?;
        let (observation, reader_error) = match reader? {
            Ok(observation) => (Some(observation), None),
            Err(e) => (None, Some(e.to_string())),
        };

        Ok(RunReport {
            run_id,
            anomaly,
            level,
            started_at,
            elapsed_ms: clock.elapsed().as_millis() as u64,
            observation,
            writer_error: writer.err().map(|e| e.to_string()),
            reader_error,
        })
    }

    /// Spawn the writer (Tx1) and reader (Tx2) tasks of `anomaly`.
    fn spawn_pair(
        &self,
        anomaly: Anomaly,
        level: IsolationLevel,
        signals: Signals,
        run_id: Uuid,
    ) -> (
        JoinHandle<std::result::Result<(), DbError>>,
        JoinHandle<ReaderResult>,
    ) {
        let writer_ctx = TxContext::new(self, 1, level);
        let reader_ctx = TxContext::new(self, 2, level);

        match anomaly {
            Anomaly::DirtyRead => (
                spawn_tx(dirty_read::writer(writer_ctx.clone(), signals.clone()), &writer_ctx, run_id),
                spawn_tx(dirty_read::reader(reader_ctx.clone(), signals), &reader_ctx, run_id),
            ),
            Anomaly::NonRepeatableRead => (
                spawn_tx(
                    non_repeatable_read::writer(writer_ctx.clone(), signals.clone()),
                    &writer_ctx,
                    run_id,
                ),
                spawn_tx(
                    non_repeatable_read::reader(reader_ctx.clone(), signals),
                    &reader_ctx,
                    run_id,
                ),
            ),
            Anomaly::PhantomRead => (
                spawn_tx(phantom_read::writer(writer_ctx.clone(), signals.clone()), &writer_ctx, run_id),
                spawn_tx(phantom_read::reader(reader_ctx.clone(), signals), &reader_ctx, run_id),
            ),
        }
    }

    /// Run `anomaly` once per level, in the given order.
    pub async fn run_scenario(
        &self,
        anomaly: Anomaly,
        levels: &[IsolationLevel],
    ) -> Result<ScenarioReport> {
        let mut runs = Vec::with_capacity(levels.len());
        for level in levels {
            runs.push(self.run(anomaly, *level).await?);
        }
        Ok(ScenarioReport { anomaly, runs })
    }

    /// Every scenario at its default levels.
    pub async fn run_all(&self) -> Result<Vec<ScenarioReport>> {
        let mut reports = Vec::with_capacity(Anomaly::ALL.len());
        for anomaly in Anomaly::ALL {
            reports.push(self.run_scenario(anomaly, &anomaly.default_levels()).await?);
        }
        Ok(reports)
    }
}

fn spawn_tx<F, T>(fut: F, ctx: &TxContext, run_id: Uuid) -> JoinHandle<std::result::Result<T, DbError>>
where
    F: Future<Output = std::result::Result<T, DbError>> + Send + 'static,
    T: Send + 'static,
{
    let span = info_span!("tx", label = %ctx.label, %run_id);
    tokio::spawn(fut.instrument(span))
}

/// What every reader task resolves to.
pub type ReaderResult = std::result::Result<Observation, DbError>;
