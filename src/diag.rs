//! Diagnostic line sink.
//!
//! The service reports its lifecycle as plain, tag-prefixed lines. The
//! default sink forwards them to the `log` facade.

pub const LOG_TARGET: &str = "keepalive";

pub trait Diagnostics {
    fn info(&self, line: &str);
    fn error(&self, line: &str);
}

/// Forwards lines to `log::info!` / `log::error!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn info(&self, line: &str) {
        log::info!(target: LOG_TARGET, "{line}");
    }

    fn error(&self, line: &str) {
        log::error!(target: LOG_TARGET, "{line}");
    }
}
