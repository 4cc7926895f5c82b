//! mirrorsync: Periodic one-way directory mirroring
//!
//! Keeps a replica directory identical to a source directory:
//! - Content hashing (BLAKE3) to detect changes, not timestamps
//! - New and changed files are copied, stale replica files are removed
//! - Every action is appended to a timestamped audit log

mod logging;

use std::path::{Path, PathBuf};

use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use color_eyre::Result;
use tracing::{error, info};

use mirrorsync_core::config::CONFIG_FILE;
use mirrorsync_core::{AuditLog, Driver, MirrorConfig, SyncEngine, SyncSettings, parse_interval};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default())
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::Red.on_default());

#[derive(Parser)]
#[command(name = "mirrorsync")]
#[command(version)]
#[command(styles = STYLES)]
#[command(about = "Keep a replica directory identical to a source directory")]
#[command(long_about = r#"
mirrorsync periodically makes REPLICA an exact copy of SOURCE.

Each cycle:
  • Scans both trees
  • Copies files that are new or whose content changed
  • Removes replica files that no longer exist in the source
  • Appends every action to LOG_FILE

Examples:
  mirrorsync ./data ./backup sync.log 30          Mirror every 30 seconds
  mirrorsync ./data ./backup sync.log 30 --once   Mirror once and exit
"#)]
struct Cli {
    /// Directory to mirror from
    source: PathBuf,

    /// Directory to mirror into (created if missing)
    replica: PathBuf,

    /// Audit log file, appended to
    log_file: PathBuf,

    /// Seconds between cycles
    #[arg(value_parser = parse_interval)]
    interval: u64,

    /// Config file with exclude patterns [default: ./.mirrorsync.toml if present]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Also write a detailed trace log to this file
    #[arg(long, value_name = "PATH")]
    trace_log: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let _trace_guard = logging::init(cli.verbose, cli.trace_log.as_deref())?;

    let settings = SyncSettings::new(cli.source, cli.replica, cli.log_file, cli.interval)?;
    settings.ensure_replica()?;
    let config = load_config(cli.config.as_deref())?;

    if !config.exclude.is_empty() {
        info!(patterns = ?config.exclude, "excluding");
    }

    let engine =
        SyncEngine::new(&settings.source, &settings.replica).with_excludes(config.exclude);
    let audit = AuditLog::open(&settings.log_file)?;
    let driver = Driver::new(engine, audit, settings.interval);

    if cli.once {
        driver.run_once().await?;
        return Ok(());
    }

    info!("Press Ctrl+C to stop");
    driver.run(shutdown_signal()).await;

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<MirrorConfig> {
    let config = match path {
        Some(path) => MirrorConfig::load(path)?,
        None => MirrorConfig::load_or_default(Path::new(CONFIG_FILE))?,
    };
    Ok(config)
}

/// Resolves on Ctrl+C
///
/// If the handler cannot be installed this never resolves, and the default
/// signal disposition still terminates the process.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
