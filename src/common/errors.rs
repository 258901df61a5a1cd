use thiserror::Error;

use crate::cleaner::CleanReport;
use crate::store::StoreError;

/// Why a cleanup run failed.
///
/// The binary wraps these in `anyhow` at the top level; the variants let
/// library callers tell a missing bucket from an unreachable store.
#[derive(Debug, Error)]
pub enum CleanupError {
    /// Bad input detected before any store call
    #[error("invalid input: {0}")]
    Validation(String),

    /// The existence check or the listing call itself failed
    #[error("{context}")]
    StoreUnavailable {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    /// The store answered, and the bucket is not there
    #[error("bucket {0} doesn't exist")]
    BucketNotFound(String),

    /// At least one selected key could not be deleted.
    ///
    /// Carries the full run report with `failed` filled in.
    #[error(
        "cleaning process ended with errors: {} of {} deletions failed: {}",
        .report.failed.len(),
        .report.attempted,
        format_failures(.report)
    )]
    PartialFailure { report: Box<CleanReport> },
}

impl CleanupError {
    pub fn validation(message: impl Into<String>) -> Self {
        CleanupError::Validation(message.into())
    }

    /// The run report, present only when deletion got under way
    pub fn report(&self) -> Option<&CleanReport> {
        match self {
            CleanupError::PartialFailure { report } => Some(report.as_ref()),
            _ => None,
        }
    }

    /// Keys that failed to delete, empty for every other kind
    pub fn failed_keys(&self) -> Vec<&str> {
        self.report()
            .map(|report| report.failed.iter().map(|f| f.key.as_str()).collect())
            .unwrap_or_default()
    }
}

fn format_failures(report: &CleanReport) -> String {
    report
        .failed
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
