//! CLI argument definitions for Pulsetick.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `collect` | Run one metric collector |
//! | `collect-all` | Run every collector in order |
//! | `get` | Read a stored series |
//! | `snapshot` | Roll up one trade date |
//! | `families` | List metric families |
//! | `runs` | List recent collector runs |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--home` | `$PULSETICK_HOME` or `~/.pulsetick` | Data directory |
//! | `--window-start` | `$PULSETICK_WINDOW_START` or `2024-01-01` | First collection date |
//! | `--window-end` | `$PULSETICK_WINDOW_END` or `2024-01-31` | Last collection date |
//!
//! # Examples
//!
//! ```bash
//! pulsetick collect vix-level --pretty
//! pulsetick collect-all --window-start 2024-02-01 --window-end 2024-02-29
//! pulsetick get overnight-gap --start 2024-01-01 --end 2024-02-01
//! pulsetick snapshot 2024-01-03
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Daily market metric collector.
#[derive(Debug, Parser)]
#[command(
    name = "pulsetick",
    author,
    version,
    about = "Daily market metric collector",
    long_about = "Pulsetick collects daily market metrics (NQ close, VIX, 10Y treasury yield, \
overnight gap, put/call ratio) from Yahoo Finance and FRED into a local DuckDB warehouse.\n\
\n\
Results are printed as JSON on stdout; logs go to stderr (RUST_LOG controls verbosity)."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Data directory holding the warehouse.
    #[arg(long, global = true, env = "PULSETICK_HOME")]
    pub home: Option<PathBuf>,

    /// First date of the collection window (YYYY-MM-DD).
    #[arg(long, global = true)]
    pub window_start: Option<String>,

    /// Last date of the collection window (YYYY-MM-DD).
    #[arg(long, global = true)]
    pub window_end: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one collector.
    ///
    /// # Examples
    ///
    ///   pulsetick collect nq-close
    ///   pulsetick collect treasury-yield --pretty
    Collect(CollectArgs),

    /// Run every collector in order; one failure does not stop the rest.
    CollectAll(CollectAllArgs),

    /// Read a stored series for a family.
    ///
    /// The window is half-open: `--end` itself is excluded.
    Get(GetArgs),

    /// Roll up every metric stored for one date.
    Snapshot(SnapshotArgs),

    /// List metric families with their providers and candidates.
    Families,

    /// List recent collector runs, newest first.
    Runs(RunsArgs),
}

#[derive(Debug, Args)]
pub struct CollectArgs {
    /// Family name (e.g. nq-close, vix-level, treasury-yield, overnight-gap, put-call-ratio).
    pub family: String,

    /// Collect into memory only; nothing is written to the warehouse.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct CollectAllArgs {
    /// Collect into memory only; nothing is written to the warehouse.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Family name.
    pub family: String,

    /// First date to include (default: collection window start).
    #[arg(long)]
    pub start: Option<String>,

    /// First date to exclude (default: day after collection window end).
    #[arg(long)]
    pub end: Option<String>,
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Trade date to roll up (YYYY-MM-DD).
    pub date: String,
}

#[derive(Debug, Args)]
pub struct RunsArgs {
    /// Maximum number of runs to list.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}
