use std::fs::File;
use std::path::Path;
use std::sync::OnceLock;

use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_FILTER: LevelFilter = LevelFilter::ERROR;

static MAX_LEVEL: OnceLock<LevelFilter> = OnceLock::new();

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("a global logger is already installed")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Arguments to the initialize_logging function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogArgs<T: AsRef<Path>> {
    /// Filter directives, e.g. `debug` or `shellfind_util=trace`. `ERROR` when not set.
    pub log_level: Option<String>,
    /// Write logs to stderr. Stdout only ever carries the lookup result.
    pub log_to_stderr: bool,
    /// Append logs to this file.
    pub log_file_path: Option<T>,
    /// Truncate the log file instead of appending to it.
    pub delete_old_log_file: bool,
}

/// Keeps the background log writers alive. Logs may be lost once this is dropped.
#[must_use]
#[derive(Debug)]
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
    _stderr_guard: Option<WorkerGuard>,
}

/// Installs the global subscriber. Can only succeed once per process.
pub fn initialize_logging<T: AsRef<Path>>(args: LogArgs<T>) -> Result<LogGuard, Error> {
    let filter_layer = create_filter_layer(args.log_level.as_deref());
    let max_level = filter_layer.max_level_hint().unwrap_or(DEFAULT_FILTER);

    let (file_layer, _file_guard) = match args.log_file_path {
        Some(log_file_path) => {
            let file = open_log_file(log_file_path.as_ref(), args.delete_old_log_file)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_line_number(true).with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        },
        None => (None, None),
    };

    let (stderr_layer, _stderr_guard) = match args.log_to_stderr {
        true => {
            let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
            (Some(fmt::layer().with_writer(writer)), Some(guard))
        },
        false => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;
    MAX_LEVEL.set(max_level).ok();

    Ok(LogGuard {
        _file_guard,
        _stderr_guard,
    })
}

/// The most verbose level any log target is enabled at, `ERROR` before logging is initialized.
pub fn get_log_level_max() -> LevelFilter {
    MAX_LEVEL.get().copied().unwrap_or(DEFAULT_FILTER)
}

fn create_filter_layer(log_level: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(Directive::from(DEFAULT_FILTER))
        .parse_lossy(log_level.unwrap_or_default())
}

fn open_log_file(log_path: &Path, delete_old_log_file: bool) -> Result<File, Error> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let oversized = log_path.exists() && std::fs::metadata(log_path)?.len() > MAX_FILE_SIZE;
    let file = if delete_old_log_file || oversized {
        File::create(log_path)?
    } else {
        File::options().append(true).create(true).open(log_path)?
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600)).ok();
    }

    Ok(file)
}
