use anyhow::{Context, Result};
use isoctl_core::db::SEED_ACCOUNTS;
use isoctl_core::Runner;

pub async fn run_reset(runner: &Runner) -> Result<()> {
    runner.reset().await.context("failed to reset accounts table")?;

    println!("Database reset to initial state:");
    for (holder, balance) in SEED_ACCOUNTS {
        println!("  {}: {:.2}", holder, balance);
    }
    Ok(())
}
