//! What each run observed, and whether that amounts to the anomaly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::isolation::IsolationLevel;
use crate::scenarios::Anomaly;

/// Balances are DECIMAL(12, 2) on the server; anything closer than half a
/// cent is the same value.
const EPSILON: f64 = 0.005;

fn same_amount(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirtyReadObservation {
    pub committed_value: f64,
    pub uncommitted_value: f64,
    /// Read while Tx1's update was still uncommitted
    pub first_read: f64,
    /// Read after Tx1 had the chance to commit
    pub second_read: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonRepeatableReadObservation {
    pub alice: f64,
    pub bob_first: f64,
    pub bob_second: f64,
    pub first_sum: f64,
    pub second_sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhantomReadObservation {
    pub count: i64,
    pub sum: f64,
    pub average: f64,
    /// Total of the rows that existed when `count` was taken
    pub expected_sum: f64,
    /// Tx1 never signalled while Tx2 waited, i.e. its insert was blocked
    pub writer_blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    DirtyRead(DirtyReadObservation),
    NonRepeatableRead(NonRepeatableReadObservation),
    PhantomRead(PhantomReadObservation),
}

impl Observation {
    pub fn anomaly(&self) -> Anomaly {
        match self {
            Observation::DirtyRead(_) => Anomaly::DirtyRead,
            Observation::NonRepeatableRead(_) => Anomaly::NonRepeatableRead,
            Observation::PhantomRead(_) => Anomaly::PhantomRead,
        }
    }

    pub fn anomaly_observed(&self) -> bool {
        match self {
            Observation::DirtyRead(o) => {
                same_amount(o.first_read, o.uncommitted_value)
                    && !same_amount(o.first_read, o.committed_value)
            }
            Observation::NonRepeatableRead(o) => !same_amount(o.bob_first, o.bob_second),
            Observation::PhantomRead(o) => !same_amount(o.sum, o.expected_sum),
        }
    }

    /// One line per observed value, for terminal output.
    pub fn lines(&self) -> Vec<String> {
        match self {
            Observation::DirtyRead(o) => vec![
                format!("first read (Tx1 uncommitted): {:.2}", o.first_read),
                format!("second read (Tx1 committed):  {:.2}", o.second_read),
                format!(
                    "committed value {:.2}, uncommitted value {:.2}",
                    o.committed_value, o.uncommitted_value
                ),
            ],
            Observation::NonRepeatableRead(o) => vec![
                format!("Alice: {:.2}", o.alice),
                format!("Bob (first read): {:.2}", o.bob_first),
                format!("Bob (second read): {:.2}", o.bob_second),
                format!("Sum balance (1): {:.2}", o.first_sum),
                format!("Sum balance (2): {:.2}", o.second_sum),
            ],
            Observation::PhantomRead(o) => {
                let mut lines = vec![
                    format!("Count: {}", o.count),
                    format!("Sum balance: {:.2}", o.sum),
                    format!("AVERAGE: {:.2}", o.average),
                ];
                if o.writer_blocked {
                    lines.push("Tx1 insert was blocked until Tx2 finished".to_string());
                }
                lines
            }
        }
    }
}

/// One writer/reader pair at one isolation level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub anomaly: Anomaly,
    pub level: IsolationLevel,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<Observation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writer_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reader_error: Option<String>,
}

impl RunReport {
    /// `None` when the reader failed before observing anything.
    pub fn anomaly_observed(&self) -> Option<bool> {
        self.observation.as_ref().map(Observation::anomaly_observed)
    }

    /// Whether the SQL standard permits the anomaly at this level.
    pub fn anomaly_permitted(&self) -> bool {
        self.level.permits(self.anomaly)
    }

    pub fn succeeded(&self) -> bool {
        self.writer_error.is_none() && self.reader_error.is_none()
    }
}

/// All runs of one scenario, weakest level first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub anomaly: Anomaly,
    pub runs: Vec<RunReport>,
}

impl ScenarioReport {
    pub fn succeeded(&self) -> bool {
        self.runs.iter().all(RunReport::succeeded)
    }
}
