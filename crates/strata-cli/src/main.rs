//! The `strata` binary: parse flags, resolve config, open the stores, hand
//! off to the runner, render the outcome.
//!
//! Everything interesting happens in `strata-engine`; this crate only maps
//! flags to config overrides, events to logs, and errors to exit codes.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use strata_core::config::{CliOverrides, StrataConfig};
use strata_core::errors::{
    error_code, AdapterError, ConfigError, EngineError, RegistryError, StrataErrorCode,
};
use strata_core::events::{EventDispatcher, TracingHandler};
use strata_core::models::{Direction, MigrationId, MigrationRecord};
use strata_engine::{DefinitionSource, Registry, RunReport, Runner, StatusEntry};
use strata_sqlite::{SqliteCatalog, SqliteLedger};

#[derive(Parser)]
#[command(name = "strata", version, about = "Schema migrations for document databases")]
struct Cli {
    /// Database file. `:memory:` runs against a throwaway database.
    #[arg(long, global = true, value_name = "PATH")]
    database: Option<String>,

    /// Directory of migration definition files, relative to the project
    /// root.
    #[arg(long, global = true, value_name = "DIR")]
    migrations: Option<String>,

    /// Project root searched for `strata.toml`.
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    config: PathBuf,

    /// Render output as JSON instead of a table.
    #[arg(long, global = true)]
    json: bool,

    /// Log filter, e.g. `--log=strata_engine=debug`. Bare `-v` means
    /// `debug`. `STRATA_LOG` and `RUST_LOG` are honored when unset.
    #[arg(
        short = 'v',
        long = "log",
        global = true,
        value_name = "FILTER",
        num_args = 0..=1,
        default_missing_value = "debug"
    )]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending migrations in order.
    Up {
        /// Stop after this migration.
        #[arg(long = "to", value_name = "ID")]
        to: Option<String>,
    },
    /// Revert completed migrations in reverse order. Without `--to`,
    /// reverts one step.
    Down {
        /// Revert every completed migration at or after this one.
        #[arg(long = "to", value_name = "ID")]
        to: Option<String>,
    },
    /// Show every known migration with its ledger state.
    Status,
    /// Clear a stale lease or failed-revert residue so the migration can
    /// run again. Explicit operator action, never automatic.
    Reclaim {
        #[arg(value_name = "ID")]
        identifier: String,
    },
}

/// Failures the binary can hit outside the engine proper.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("output rendering failed: {0}")]
    Render(#[from] serde_json::Error),
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::Engine(e.into())
    }
}

impl From<RegistryError> for CliError {
    fn from(e: RegistryError) -> Self {
        Self::Engine(e.into())
    }
}

impl StrataErrorCode for CliError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Engine(e) => e.error_code(),
            Self::Adapter(e) => e.error_code(),
            Self::Render(_) => error_code::OPERATION_FAILED,
        }
    }

    fn exit_code(&self) -> i32 {
        match self {
            Self::Engine(e) => e.exit_code(),
            Self::Adapter(e) => e.exit_code(),
            Self::Render(_) => error_code::exit::OPERATION_FAILED,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());
    if let Err(e) = run(cli) {
        eprintln!("error[{}]: {e}", e.error_code());
        std::process::exit(e.exit_code());
    }
}

fn init_tracing(directives: Option<&str>) {
    let filter = match directives {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_env("STRATA_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info")),
    };
    // Logs go to stderr; stdout carries only the rendered output.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let overrides = CliOverrides {
        database: cli.database.clone(),
        definitions_dir: cli.migrations.clone(),
        ledger_table: None,
        stale_after_secs: None,
    };
    let config = StrataConfig::load(&cli.config, Some(&overrides))?;

    let database = match config.database.path.as_deref() {
        Some(path) => PathBuf::from(path),
        None => {
            return Err(ConfigError::ValidationFailed {
                field: "database.path".to_string(),
                message: "no database given; pass --database or set it in strata.toml"
                    .to_string(),
            }
            .into())
        }
    };
    let definitions_dir = cli.config.join(config.definitions.effective_dir());
    tracing::debug!(
        database = %database.display(),
        definitions = %definitions_dir.display(),
        table = config.ledger.effective_table(),
        "configuration resolved"
    );

    let registry = Registry::load(DefinitionSource::Directory(definitions_dir))?;
    let ledger = SqliteLedger::open(&database, &config.ledger).map_err(EngineError::from)?;
    let catalog = SqliteCatalog::open(&database)?;

    let mut events = EventDispatcher::new();
    events.register(Arc::new(TracingHandler));
    let runner = Runner::new(&registry, &ledger, &catalog).with_events(events);

    match &cli.command {
        Command::Up { to } => {
            let target = parse_target(to.as_deref())?;
            let report = runner.run_up(target.as_ref())?;
            print!("{}", render_report(&report, cli.json)?);
        }
        Command::Down { to } => {
            let target = parse_target(to.as_deref())?;
            let report = runner.run_down(target.as_ref())?;
            print!("{}", render_report(&report, cli.json)?);
        }
        Command::Status => {
            let entries = runner.status()?;
            print!("{}", render_status(&entries, cli.json)?);
        }
        Command::Reclaim { identifier } => {
            let target = MigrationId::parse(identifier).map_err(RegistryError::from)?;
            let record = runner.reclaim(&target)?;
            print!("{}", render_record(&record, cli.json)?);
        }
    }
    Ok(())
}

fn parse_target(to: Option<&str>) -> Result<Option<MigrationId>, CliError> {
    match to {
        Some(raw) => Ok(Some(MigrationId::parse(raw).map_err(RegistryError::from)?)),
        None => Ok(None),
    }
}

fn render_report(report: &RunReport, json: bool) -> Result<String, CliError> {
    if json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(report)?));
    }
    let mut out = String::new();
    for line in &report.migrations {
        out.push_str(&format!(
            "{:<28} {:<12} {:>6}ms\n",
            line.identifier.as_str(),
            line.outcome.as_str(),
            line.duration_ms
        ));
    }
    let interrupted = if report.interrupted { ", interrupted" } else { "" };
    match report.direction {
        Direction::Up => out.push_str(&format!(
            "{} applied, {} skipped in {}ms{}\n",
            report.applied(),
            report.skipped(),
            report.duration_ms,
            interrupted
        )),
        Direction::Down => out.push_str(&format!(
            "{} rolled back in {}ms{}\n",
            report.rolled_back(),
            report.duration_ms,
            interrupted
        )),
    }
    Ok(out)
}

fn render_status(entries: &[StatusEntry], json: bool) -> Result<String, CliError> {
    if json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(entries)?));
    }
    let mut out = format!(
        "{:<28} {:<14} {:<10} {:<9} {}\n",
        "IDENTIFIER", "STATUS", "VERSION", "CHECKSUM", "COMPLETED"
    );
    for entry in entries {
        let checksum = match entry.checksum_ok {
            Some(true) => "ok",
            Some(false) => "drift",
            None => "-",
        };
        let completed = entry
            .completed_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<28} {:<14} {:<10} {:<9} {}",
            entry.identifier.as_str(),
            entry.status.as_str(),
            entry.version.as_deref().unwrap_or("-"),
            checksum,
            completed
        ));
        if !entry.in_registry {
            out.push_str("  (definition missing)");
        }
        if let Some(error) = &entry.error {
            out.push_str(&format!("  error: {error}"));
        }
        out.push('\n');
    }
    Ok(out)
}

fn render_record(record: &MigrationRecord, json: bool) -> Result<String, CliError> {
    if json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(record)?));
    }
    let mut out = format!(
        "{} reclaimed: now {}\n",
        record.identifier.as_str(),
        record.status.as_str()
    );
    if let Some(error) = &record.error {
        out.push_str(&format!("preserved error: {error}\n"));
    }
    Ok(out)
}
