//! Scenario commands - run one anomaly (or all of them) and print what the
//! reader observed at each isolation level.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use isoctl_core::{Anomaly, IsolationLevel, Runner};
use tracing::info;

use crate::render;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelArg {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl From<LevelArg> for IsolationLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::ReadUncommitted => IsolationLevel::ReadUncommitted,
            LevelArg::ReadCommitted => IsolationLevel::ReadCommitted,
            LevelArg::RepeatableRead => IsolationLevel::RepeatableRead,
            LevelArg::Serializable => IsolationLevel::Serializable,
        }
    }
}

#[derive(Parser, Debug)]
pub struct ScenarioArgs {
    /// Isolation level to run at; repeat for several runs
    /// (default: the level that shows the anomaly, then one that prevents it)
    #[arg(long = "level", value_name = "LEVEL", value_enum)]
    pub levels: Vec<LevelArg>,
}

impl ScenarioArgs {
    pub fn levels_for(&self, anomaly: Anomaly) -> Vec<IsolationLevel> {
        if self.levels.is_empty() {
            anomaly.default_levels().to_vec()
        } else {
            self.levels.iter().copied().map(IsolationLevel::from).collect()
        }
    }
}

pub async fn run_scenario(
    runner: &Runner,
    anomaly: Anomaly,
    args: ScenarioArgs,
    json: bool,
) -> Result<()> {
    let levels = args.levels_for(anomaly);
    info!(scenario = %anomaly, ?levels, "running scenario");

    let report = runner
        .run_scenario(anomaly, &levels)
        .await
        .with_context(|| format!("failed to run {} scenario", anomaly))?;

    render::print_scenarios(std::slice::from_ref(&report), json)
}

/// Reset, then run every scenario at its default levels.
pub async fn run_all(runner: &Runner, json: bool) -> Result<()> {
    let reports = runner
        .run_all()
        .await
        .context("failed to run scenarios")?;

    render::print_scenarios(&reports, json)
}
