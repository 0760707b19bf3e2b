//! File logging. The terminal belongs to the UI, so everything goes to
//! `$XDG_DATA_HOME/eventadmin/eventadmin.log`.

use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "eventadmin=info";
const LOG_FILE: &str = "eventadmin.log";

pub fn log_dir() -> Option<PathBuf> {
  dirs::data_dir().map(|dir| dir.join("eventadmin"))
}

/// Install the global subscriber writing to `dir`.
///
/// The returned guard flushes pending lines on drop; keep it alive for the
/// lifetime of the program.
pub fn init(dir: &Path) -> Result<WorkerGuard> {
  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::never(dir, LOG_FILE);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()
    .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

  Ok(guard)
}
