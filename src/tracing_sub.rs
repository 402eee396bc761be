use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::Level;

static LOG_FILE: OnceLock<Arc<Mutex<File>>> = OnceLock::new();

pub struct DelegatingWriter {
    inner: DelegatingInner,
}

enum DelegatingInner {
    File(Arc<Mutex<File>>),
    Sink(io::Sink),
}

impl DelegatingWriter {
    fn new() -> Self {
        match LOG_FILE.get() {
            Some(file) => Self::with_file(Arc::clone(file)),
            None => DelegatingWriter {
                inner: DelegatingInner::Sink(io::sink()),
            },
        }
    }

    fn with_file(file: Arc<Mutex<File>>) -> Self {
        DelegatingWriter {
            inner: DelegatingInner::File(file),
        }
    }
}

fn poisoned<T>(_: T) -> io::Error {
    io::Error::other("log file lock poisoned")
}

impl Write for DelegatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            DelegatingInner::File(f) => f.lock().map_err(poisoned)?.write(buf),
            DelegatingInner::Sink(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            DelegatingInner::File(f) => f.lock().map_err(poisoned)?.flush(),
            DelegatingInner::Sink(s) => s.flush(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SubscriberMakeWriter;

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SubscriberMakeWriter {
    type Writer = DelegatingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        DelegatingWriter::new()
    }
}

fn open_log(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize the tracing subscriber. Output goes to `log_path` when given
/// and is discarded otherwise: the terminal belongs to the compositor, so
/// writing to stderr would corrupt the screen. Safe to call multiple times;
/// subsequent calls are no-ops for the global subscriber and log file.
pub fn init_default(log_path: Option<&Path>) -> io::Result<()> {
    if let Some(path) = log_path
        && LOG_FILE.get().is_none()
    {
        let _ = LOG_FILE.set(Arc::new(Mutex::new(open_log(path)?)));
    }
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_writer(SubscriberMakeWriter)
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(false)
        .try_init();
    Ok(())
}
