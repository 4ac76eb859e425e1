//! Logging infrastructure for ragchat.
//!
//! Two layers are installed on one registry:
//! - stderr, human-readable, for the interactive user (stdout is reserved for data)
//! - an append-only run log file, one plain line per event, which the `logs`
//!   command reads back to show the most recent pipeline run.

use std::fmt as std_fmt;
use std::path::Path;

use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::{self, format, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::{AppError, AppResult};

/// Marker line written when a pipeline starts.
pub const RUN_SENTINEL: &str = "STARTING RAG PIPELINE";

/// Rule printed around [`RUN_SENTINEL`].
pub const RUN_RULE: &str = "================================================================";

/// Initialize the tracing subscriber.
///
/// # Arguments
/// * `log_level` - Optional filter override (e.g., "debug", "ragchat_knowledge=trace")
/// * `no_color` - Disable colored stderr output
/// * `log_file` - Run log path; `None` disables the file layer
///
/// The returned guard flushes the file writer on drop and must be held for the
/// lifetime of the process.
///
/// # Example
/// ```no_run
/// use ragchat_core::logging::init_logging;
///
/// let _guard = init_logging(None, false, None).expect("Failed to initialize logging");
/// ```
pub fn init_logging(
    log_level: Option<&str>,
    no_color: bool,
    log_file: Option<&Path>,
) -> AppResult<Option<WorkerGuard>> {
    // stderr stays quiet unless asked; the run log always records info
    let stderr_filter = build_filter(log_level.unwrap_or("warn"))?;
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(!no_color && supports_color())
        .with_filter(stderr_filter);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (dir, name) = split_log_path(path)?;
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create log directory {:?}: {}", dir, e))
            })?;

            let appender = tracing_appender::rolling::never(&dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .event_format(RunLogFormat)
                .with_filter(run_log_filter(log_level)?);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;

    Ok(guard)
}

fn build_filter(directive: &str) -> AppResult<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| AppError::Config(format!("Invalid log filter: {}", e)))
}

/// File filter: the user's level, but the run marker is always kept.
fn run_log_filter(log_level: Option<&str>) -> AppResult<EnvFilter> {
    let level = log_level.unwrap_or("info");
    build_filter(&format!("{},{}=info", level, module_path!()))
}

fn split_log_path(path: &Path) -> AppResult<(std::path::PathBuf, std::ffi::OsString)> {
    let name = path
        .file_name()
        .ok_or_else(|| AppError::Config(format!("Invalid log file path: {:?}", path)))?
        .to_os_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    Ok((dir, name))
}

/// Check if the terminal supports color output.
fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
}

/// `[2024-05-01 12:00:00,123] INFO - ragchat_knowledge::pipeline - message`
struct RunLogFormat;

impl<S, N> FormatEvent<S, N> for RunLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> std_fmt::Result {
        let meta = event.metadata();
        write!(
            writer,
            "[{}] {} - {} - ",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            meta.level(),
            meta.target()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Emit the start-of-run block that [`latest_run`] looks for.
pub fn mark_run_start(run_id: &str) {
    tracing::info!("{}", RUN_RULE);
    tracing::info!("{}", RUN_SENTINEL);
    tracing::info!("{}", RUN_RULE);
    tracing::info!(run_id, "Initializing RAG pipeline");
}

/// Slice of `log_text` belonging to the most recent run.
///
/// Starts at the rule line preceding the last sentinel when there is one.
/// Without any sentinel the whole text is returned.
pub fn latest_run(log_text: &str) -> &str {
    let Some(idx) = log_text.rfind(RUN_SENTINEL) else {
        return log_text;
    };

    let line_start = line_start_of(log_text, idx);
    if line_start == 0 {
        return &log_text[line_start..];
    }

    let prev_start = line_start_of(log_text, line_start - 1);
    if log_text[prev_start..line_start].contains(RUN_RULE) {
        &log_text[prev_start..]
    } else {
        &log_text[line_start..]
    }
}

fn line_start_of(text: &str, idx: usize) -> usize {
    text[..idx].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// Read the run log and return the most recent run, or a notice when absent.
pub fn read_latest_run(path: &Path, all: bool) -> AppResult<String> {
    if !path.exists() {
        return Ok(format!("No log file found at {}", path.display()));
    }

    let text = std::fs::read_to_string(path)?;
    if all {
        Ok(text)
    } else {
        Ok(latest_run(&text).to_string())
    }
}
