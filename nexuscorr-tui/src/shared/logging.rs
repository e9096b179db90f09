//! Diagnostics setup
//!
//! The terminal UI owns stdout, so diagnostics only go to a file. Without a log file no
//! subscriber is installed and `tracing` events are discarded.

use std::{fs::OpenOptions, io, path::Path, sync::Mutex};
use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber appending to `log_file`
///
/// The filter defaults to `info` and can be overridden with `RUST_LOG`.
pub fn init_logging(log_file: Option<&Path>) -> io::Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };

    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| io::Error::other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_log_file_installs_nothing() {
        assert!(init_logging(None).is_ok());
    }

    #[test]
    fn test_log_file_is_created() {
        let path = std::env::temp_dir().join(format!("nexuscorr-{}.log", std::process::id()));

        init_logging(Some(path.as_path())).unwrap();
        tracing::info!("logging initialised");

        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }
}
