use anyhow::{Context, Result};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber for the `shed` binary.
///
/// Stdout carries readings (possibly JSON for another process), so the
/// console layer writes to stderr. The optional log file is opened in append
/// mode so repeated `monitor` runs accumulate in one file, and it keeps
/// timestamps for lining up with the controller's poll interval.
///
/// `RUST_LOG` overrides the level picked with `-v`/`-q`. Keep the returned
/// guard alive for as long as the file should receive lines.
pub fn setup_logging(log_file_path: Option<PathBuf>, verbosity: &Verbosity<InfoLevel>) -> Result<Option<WorkerGuard>> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    let (file_layer, guard) = if let Some(ref path) = log_file_path {
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file at: {:?}", path))?;
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(log_file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file_path {
        info!("Appending logs to {:?}", path);
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_log_file_is_appended() {
        let path = std::env::temp_dir().join(format!("shed-log-{}.txt", std::process::id()));
        fs::write(&path, "earlier run\n").unwrap();

        let guard = setup_logging(Some(path.clone()), &Verbosity::<InfoLevel>::default()).unwrap();
        drop(guard);

        let contents = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert!(contents.starts_with("earlier run\n"));
        assert!(contents.contains("Appending logs to"));
    }
}
