mod collect;
mod families;
mod get;
mod runs;
mod snapshot;

use std::sync::Arc;

use pulsetick_core::{
    parse_date, DateWindow, MemoryStore, MetricFamily, MetricStore, PulsetickConfig,
    ReqwestHttpClient, SourceSet, Warehouse, WarehouseConfig,
};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Rendered payload plus whether it reports `status: "error"`.
pub struct CommandOutput {
    pub payload: Value,
    pub is_error: bool,
}

impl CommandOutput {
    pub fn ok(payload: Value) -> Self {
        Self {
            payload,
            is_error: false,
        }
    }

    pub fn with_error(mut self, is_error: bool) -> Self {
        self.is_error = is_error;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<CommandOutput, CliError> {
    let config = resolve_config(cli)?;

    match &cli.command {
        Command::Collect(args) => collect::run(args, &config).await,
        Command::CollectAll(args) => collect::run_all(args, &config).await,
        Command::Get(args) => get::run(args, &config),
        Command::Snapshot(args) => snapshot::run(args, &config),
        Command::Families => families::run(&config),
        Command::Runs(args) => runs::run(args, &config),
    }
}

/// Environment configuration with command-line overrides applied.
fn resolve_config(cli: &Cli) -> Result<PulsetickConfig, CliError> {
    let mut config = PulsetickConfig::from_env()?;
    if let Some(home) = &cli.home {
        config.home = Some(home.clone());
    }

    let start = match cli.window_start.as_deref() {
        Some(value) => parse_date(value)?,
        None => config.collection_window.start(),
    };
    let end = match cli.window_end.as_deref() {
        Some(value) => parse_date(value)?,
        None => config.collection_window.end(),
    };
    config.collection_window = DateWindow::new(start, end)?;
    Ok(config)
}

fn parse_family(value: &str) -> Result<MetricFamily, CliError> {
    Ok(value.parse::<MetricFamily>()?)
}

fn open_warehouse(config: &PulsetickConfig) -> Result<Warehouse, CliError> {
    let warehouse = match &config.home {
        Some(home) => Warehouse::open(WarehouseConfig::for_home(home))?,
        None => Warehouse::open_default()?,
    };
    tracing::debug!(path = ?warehouse.db_path(), "warehouse opened");
    Ok(warehouse)
}

fn standard_sources(config: &PulsetickConfig) -> SourceSet {
    SourceSet::standard(
        Arc::new(ReqwestHttpClient::new()),
        config.fred_api_key.as_deref(),
        config.http_timeout_ms,
    )
}

/// Where a collection writes: the warehouse, or memory for dry runs.
enum StoreHandle {
    Warehouse(Warehouse),
    Memory(MemoryStore),
}

impl StoreHandle {
    fn open(config: &PulsetickConfig, dry_run: bool) -> Result<Self, CliError> {
        if dry_run {
            tracing::info!("dry run: samples are kept in memory only");
            return Ok(Self::Memory(MemoryStore::new()));
        }
        Ok(Self::Warehouse(open_warehouse(config)?))
    }

    fn as_store(&self) -> &dyn MetricStore {
        match self {
            Self::Warehouse(warehouse) => warehouse,
            Self::Memory(memory) => memory,
        }
    }
}
