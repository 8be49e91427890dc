//! Routes GDAL's CPL error channel into the run log for the lifetime of a guard.

use gdal::config;
use gdal::errors::CplErrType;
use tracing::{debug, error, info, warn, Dispatch};

/// Scoped GDAL error handler.
///
/// GDAL keeps a single process-wide handler; installing a second guard
/// replaces the first, and dropping any guard restores GDAL's default.
pub struct GdalDiagnostics {
    _private: (),
}

impl GdalDiagnostics {
    /// Forwards every GDAL diagnostic to `dispatch`.
    ///
    /// Warnings containing any of the `suppress` substrings are demoted to debug.
    pub fn install(dispatch: Dispatch, suppress: Vec<String>) -> Self {
        config::set_error_handler(move |class, number, message| {
            tracing::dispatcher::with_default(&dispatch, || {
                report(class, number, message, &suppress)
            })
        });
        GdalDiagnostics { _private: () }
    }
}

impl Drop for GdalDiagnostics {
    fn drop(&mut self) {
        config::remove_error_handler();
    }
}

fn report(class: CplErrType, number: i32, message: &str, suppress: &[String]) {
    let message = message.trim();
    match class {
        CplErrType::None => info!("GDAL: {message}"),
        CplErrType::Debug => debug!("GDAL: {message}"),
        CplErrType::Warning => {
            if is_suppressed(message, suppress) {
                debug!("Suppressed GDAL warning: {message}");
            } else {
                warn!("GDAL warning: {message}");
            }
        }
        CplErrType::Failure | CplErrType::Fatal => error!("GDAL error ({number}): {message}"),
    }
}

fn is_suppressed(message: &str, suppress: &[String]) -> bool {
    suppress
        .iter()
        .any(|s| !s.is_empty() && message.contains(s.as_str()))
}
