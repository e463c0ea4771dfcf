//! isoctl CLI - transaction isolation anomaly demonstrator
//!
//! Runs two concurrent MySQL transactions per scenario and prints what the
//! reading transaction observed:
//! - `dirty-read`: READ UNCOMMITTED, then READ COMMITTED
//! - `non-repeatable-read`: READ COMMITTED, then REPEATABLE READ
//! - `phantom-read`: READ COMMITTED, then SERIALIZABLE
//! - `all`: the three above, in order

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use isoctl_core::config::{load_dotenv, Settings};
use isoctl_core::{Anomaly, Runner};
use tracing::debug;

mod commands;
mod render;
mod tracing_setup;

use commands::scenario::ScenarioArgs;
use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "isoctl",
    author,
    version,
    about = "Demonstrate transaction isolation anomalies with two concurrent transactions",
    long_about = "Reproduce dirty reads, non-repeatable reads and phantom reads against MySQL by \
                  interleaving two transactions at fixed points, once at an isolation level that \
                  permits the anomaly and once at one that prevents it."
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Config file (default: ~/.isoctl/config.toml if present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// MySQL connection URL (overrides config and ISOCTL_DB_* variables)
    #[arg(long, global = true, value_name = "URL")]
    database_url: Option<String>,

    /// Pause between the two reads of the dirty-read reader
    #[arg(long, global = true, value_name = "MS")]
    settle_ms: Option<u64>,

    /// How long a transaction waits for its peer before moving on
    #[arg(long, global = true, value_name = "MS")]
    signal_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Truncate the accounts table and reseed Alice and Bob
    Reset,
    /// Tx2 reads Tx1's uncommitted update
    DirtyRead(ScenarioArgs),
    /// Tx2 re-reads a row Tx1 changed and committed in between
    NonRepeatableRead(ScenarioArgs),
    /// Tx2 aggregates over a row Tx1 inserted after Tx2 counted
    PhantomRead(ScenarioArgs),
    /// Run every scenario at its default levels
    All,
    /// List isolation levels and the anomalies each permits
    Levels,
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

impl Cli {
    /// Config file, then environment, then flags.
    fn settings(&self) -> Result<Settings> {
        let mut settings =
            Settings::load(self.config.as_deref()).context("failed to load configuration")?;

        if let Some(url) = &self.database_url {
            settings.database.url = Some(url.clone());
        }
        if let Some(ms) = self.settle_ms {
            settings.choreography.settle_delay_ms = ms;
        }
        if let Some(ms) = self.signal_timeout_ms {
            settings.choreography.signal_timeout_ms = ms;
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_setup::init(&TracingConfig { debug: cli.debug }).ok();

    match cli.command {
        Commands::Levels => return commands::run_levels(cli.json),
        Commands::Completions(ref args) => return run_completions(args),
        _ => {}
    }

    load_dotenv();
    let settings = cli.settings()?;
    debug!(db = %settings.database.display_target(), "connecting");
    let runner = Runner::new(&settings)?;

    match cli.command {
        Commands::Reset => commands::run_reset(&runner).await?,
        Commands::DirtyRead(args) => {
            commands::run_scenario(&runner, Anomaly::DirtyRead, args, cli.json).await?
        }
        Commands::NonRepeatableRead(args) => {
            commands::run_scenario(&runner, Anomaly::NonRepeatableRead, args, cli.json).await?
        }
        Commands::PhantomRead(args) => {
            commands::run_scenario(&runner, Anomaly::PhantomRead, args, cli.json).await?
        }
        Commands::All => commands::run_all(&runner, cli.json).await?,
        Commands::Levels | Commands::Completions(_) => {}
    }
    Ok(())
}

fn run_completions(args: &CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}
