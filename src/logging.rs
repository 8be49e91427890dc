//! Per-run log sink.
//!
//! Every export run writes `export.log` into its output root. The file is
//! recreated at the start of the run, and the subscriber is scoped to the
//! run instead of being installed globally, so consecutive runs never share
//! a log. Runs on separate threads keep their own tracing events, but GDAL's
//! error handler is process-wide (see [`GdalDiagnostics`]), so GDAL
//! diagnostics of overlapping runs may land in the wrong log or be lost.
//!
//! The file writer never drops events: when its buffer is full, logging
//! blocks until the background worker catches up.
//!
//! [`GdalDiagnostics`]: crate::diagnostics::GdalDiagnostics

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::level_filters::LevelFilter;
use tracing::Dispatch;
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use crate::errors::Result;

pub const LOG_FILE_NAME: &str = "export.log";

/// Log handle owned by one run. Dropping it flushes the file.
pub struct RunLog {
    dispatch: Dispatch,
    path: PathBuf,
    _guard: WorkerGuard,
}

impl RunLog {
    /// Starts a fresh `export.log` under `output_root`, which must exist.
    ///
    /// With `console` set, events are mirrored to stderr.
    pub fn create(output_root: &Path, level: LevelFilter, console: bool) -> Result<Self> {
        let path = output_root.join(LOG_FILE_NAME);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let appender = tracing_appender::rolling::never(output_root, LOG_FILE_NAME);
        let (writer, guard) = NonBlockingBuilder::default().lossy(false).finish(appender);

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(writer);
        let console_layer = console.then(|| {
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(io::stderr)
        });

        let subscriber = Registry::default()
            .with(level)
            .with(file_layer)
            .with(console_layer);

        Ok(RunLog {
            dispatch: Dispatch::new(subscriber),
            path,
            _guard: guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Runs `f` with this log as the current subscriber.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}
