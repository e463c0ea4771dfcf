pub mod config;
pub mod db;
pub mod error;
pub mod isolation;
pub mod report;
pub mod scenarios;
pub mod signal;

pub use config::Settings;
pub use error::{DbError, IsoError, Result};
pub use isolation::IsolationLevel;
pub use report::{Observation, RunReport, ScenarioReport};
pub use scenarios::{Anomaly, Runner};
pub use signal::{Signal, Signals};
