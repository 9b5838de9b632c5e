//! Reporting error types.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur while building a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The store failed.
    #[error(transparent)]
    Store(#[from] store::StoreError),

    /// A figure does not fit the whole-unit range.
    #[error(transparent)]
    Amount(#[from] domain::DomainError),

    /// `date_from` is after `date_to`.
    #[error("invalid range: {from} is after {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },
}

impl ReportError {
    pub fn code(&self) -> &'static str {
        match self {
            ReportError::Store(err) => err.code(),
            ReportError::Amount(err) => err.code(),
            ReportError::InvalidRange { .. } => "validation_error",
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            ReportError::InvalidRange { .. } => Some("date_from"),
            ReportError::Store(_) | ReportError::Amount(_) => None,
        }
    }
}

/// Result type for reporting operations.
pub type Result<T> = std::result::Result<T, ReportError>;
