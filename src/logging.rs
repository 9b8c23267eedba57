use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::{RegistryError, Result};

/// File name of the per-run log inside the log directory.
pub const LOG_FILE_NAME: &str = "registry-update";

/// Log destination shared by the subscriber and the update run.
///
/// Writes go to stdout unless a file redirect is active.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    file: Arc<Mutex<Option<File>>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends log output to `file` until the returned guard is dropped.
    pub fn redirect(&self, file: File) -> RedirectGuard {
        *self.file.lock() = Some(file);
        RedirectGuard { sink: self.clone() }
    }

    pub fn is_redirected(&self) -> bool {
        self.file.lock().is_some()
    }
}

/// Restores stdout logging when dropped.
#[must_use = "dropping the guard restores stdout immediately"]
#[derive(Debug)]
pub struct RedirectGuard {
    sink: LogSink,
}

impl Drop for RedirectGuard {
    fn drop(&mut self) {
        if let Some(mut file) = self.sink.file.lock().take() {
            let _ = file.flush();
        }
    }
}

/// Writer handed out per event by [`LogSink`].
pub struct SinkWriter {
    file: Arc<Mutex<Option<File>>>,
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.lock().as_mut() {
            Some(file) => file.write(buf),
            None => io::stdout().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.lock().as_mut() {
            Some(file) => file.flush(),
            None => io::stdout().flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter {
            file: Arc::clone(&self.file),
        }
    }
}

/// Installs the global subscriber writing into `sink`.
///
/// `RUST_LOG` takes precedence over `default_directive`.
pub fn init(default_directive: &str, sink: LogSink) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|err| RegistryError::Logging(err.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(sink)
        .try_init()
        .map_err(|err| RegistryError::Logging(err.to_string()))
}

/// Creates the log directory and a fresh run log inside it.
pub fn create_run_log(dir: &Path) -> Result<(File, PathBuf)> {
    fs::create_dir_all(dir).map_err(|err| {
        RegistryError::Logging(format!("cannot create {}: {err}", dir.display()))
    })?;
    let path = dir.join(LOG_FILE_NAME);
    let file = File::create(&path).map_err(|err| {
        RegistryError::Logging(format!("cannot create {}: {err}", path.display()))
    })?;
    Ok((file, path))
}
