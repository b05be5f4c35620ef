//! Error reporting sink.
//!
//! Fatal and operator-visible failures are handed to an [`ErrorReporter`]
//! as a backend error code plus the path they concern. The host decides how
//! to present them (modal dialog, log line, toast).

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::error;

use crate::error::BindingError;

pub trait ErrorReporter: Send + Sync {
    /// Surface a failure. Called synchronously before the caller continues.
    fn report(&self, backend_code: i32, context: &Path);
}

/// Report `err`, using `fallback` when the error carries no path of its own.
pub fn report_binding_error(reporter: &dyn ErrorReporter, err: &BindingError, fallback: &Path) {
    reporter.report(err.backend_code(), err.context_path().unwrap_or(fallback));
}

/// Writes reports to the log at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, backend_code: i32, context: &Path) {
        error!("[Reporter] BASS Error {} @ {}", backend_code, context.display());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub backend_code: i32,
    pub context: PathBuf,
}

/// Keeps every report in memory. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<Report>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Report>> {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, backend_code: i32, context: &Path) {
        self.lock().push(Report {
            backend_code,
            context: context.to_path_buf(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BASS_ERROR_UNKNOWN;

    #[test]
    fn test_recording_reporter_shares_reports() {
        let reporter = RecordingReporter::new();
        let shared = reporter.clone();
        shared.report(41, Path::new("cl_dlls/libbasszxtune.so"));

        assert_eq!(
            reporter.reports(),
            vec![Report {
                backend_code: 41,
                context: PathBuf::from("cl_dlls/libbasszxtune.so"),
            }]
        );
    }

    #[test]
    fn test_report_uses_fallback_path() {
        let reporter = RecordingReporter::new();
        report_binding_error(
            &reporter,
            &BindingError::WindowHandleUnavailable,
            Path::new("cl_dlls/bass.dll"),
        );
        report_binding_error(
            &reporter,
            &BindingError::StreamCreateFailed {
                path: PathBuf::from("media/theme.mp3"),
                backend_code: 2,
            },
            Path::new("cl_dlls/bass.dll"),
        );

        let reports = reporter.reports();
        assert_eq!(reports[0].backend_code, BASS_ERROR_UNKNOWN);
        assert_eq!(reports[0].context, PathBuf::from("cl_dlls/bass.dll"));
        assert_eq!(reports[1].backend_code, 2);
        assert_eq!(reports[1].context, PathBuf::from("media/theme.mp3"));
    }
}
