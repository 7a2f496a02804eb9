use crate::Result;
use anyhow::Context;
use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::{self as tracing_fmt, format};
use tracing_subscriber::registry::LookupSpan;

/// Plain-text layer appending to the log file on a background thread.
pub type FileLayer<S> =
    tracing_fmt::Layer<S, format::DefaultFields, format::Format<format::Full>, NonBlocking>;

/// Open `log_file` for appending, creating its directory first.
///
/// The returned guard flushes pending lines when dropped.
pub fn open<S>(log_file: &Path) -> Result<(FileLayer<S>, WorkerGuard)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if let Some(directory) = log_file.parent() {
        fs::create_dir_all(directory)
            .with_context(|| format!("failed to create log directory {}", directory.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open log file {}", log_file.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(file);
    let layer = tracing_fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);
    Ok((layer, guard))
}
