//! Logging capability injected into the audio processor

use crate::error::RowError;
use tracing::{error, info, warn};

/// Result of attempting one row
#[derive(Debug)]
pub enum RowOutcome<'a> {
    Written { file_name: &'a str, bytes: usize },
    Skipped { reason: &'a RowError },
}

/// Write-only sink for extraction progress and failures.
///
/// Nothing returned from a reporter is consumed, so a reporter that drops every
/// message leaves extraction behaviour unchanged.
pub trait Reporter {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);

    /// Called once before the first row with the number of rows to attempt
    fn extraction_started(&self, _planned: usize) {}

    /// Called after every attempted row
    fn row_finished(&self, _index: usize, _outcome: &RowOutcome<'_>) {}
}

/// Forwards messages to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        info!("{}", message);
    }

    fn warn(&self, message: &str) {
        warn!("{}", message);
    }

    fn error(&self, message: &str) {
        error!("{}", message);
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}
