//! Diagnostic logging for mirrorsync
//!
//! Console output goes to stderr. With `--trace-log <PATH>` a detailed trace
//! of every scan, compare and copy is also written to that file. This is
//! separate from the audit log, which only records sync actions.

use std::path::Path;

use color_eyre::Result;
use color_eyre::eyre::eyre;
use tracing_subscriber::Layer as _;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Keeps the trace file writer alive; dropping it flushes pending lines
pub struct TraceLogGuard {
    _guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Install the global subscriber
///
/// The guard must be kept alive for the duration of the program.
pub fn init(verbose: bool, trace_file: Option<&Path>) -> Result<TraceLogGuard> {
    let console_level = if verbose {
        tracing_subscriber::filter::LevelFilter::DEBUG
    } else {
        tracing_subscriber::filter::LevelFilter::INFO
    };
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_level);

    let (file_layer, guard) = match trace_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| eyre!("trace log path has no file name: {}", path.display()))?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));

            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // Global filter: everything from our crates, warnings from dependencies
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("warn,mirrorsync=trace,mirrorsync_core=trace")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    Ok(TraceLogGuard { _guard: guard })
}
