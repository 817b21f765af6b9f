//! Top-level error type for an export run.

use geosheet_core::RowNumber;
use thiserror::Error;

use crate::config::ConfigError;
use crate::sheets::{AuthError, SheetsError};
use crate::shopify::OrderSourceError;

/// Coarse error classification, used for logging and exit reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or invalid configuration.
    Config,
    /// Google authorization failed or is missing.
    Auth,
    /// The order source could not be reached or refused the request.
    SourceUnavailable,
    /// The order source answered with a malformed body.
    Decode,
    /// A row write failed.
    Write,
    /// The driver asked for an order the current page does not have.
    OutOfRange,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Config => "config",
            Self::Auth => "auth",
            Self::SourceUnavailable => "source_unavailable",
            Self::Decode => "decode",
            Self::Write => "write",
            Self::OutOfRange => "out_of_range",
        };
        f.write_str(name)
    }
}

/// Errors that abort an export run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Driver settings are inconsistent.
    #[error("Invalid sync settings: {0}")]
    InvalidSettings(String),

    /// Google authorization failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Reading from the order source failed.
    #[error(transparent)]
    Source(#[from] OrderSourceError),

    /// Writing a row failed; no later rows were written.
    #[error("Failed to write row {row}: {source}")]
    Write {
        /// Row that failed.
        row: RowNumber,
        /// Sink error.
        #[source]
        source: SheetsError,
    },

    /// The current page has no order at the required local index.
    ///
    /// Happens when the source returns fewer orders than the count promised.
    #[error(
        "Order at position {position} is out of range: page has {page_len} orders, needed index {index}"
    )]
    OutOfRange {
        /// Global sequence position.
        position: u64,
        /// Local index within the current page.
        index: usize,
        /// Length of the current page.
        page_len: usize,
    },
}

impl SyncError {
    /// Wrap a sink failure for `row`.
    ///
    /// Token failures while writing are authorization errors, not write
    /// errors.
    #[must_use]
    pub fn write(row: RowNumber, source: SheetsError) -> Self {
        match source {
            SheetsError::Auth(e) => Self::Auth(e),
            source => Self::Write { row, source },
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::InvalidSettings(_) => ErrorKind::Config,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Source(OrderSourceError::Decode(_)) => ErrorKind::Decode,
            Self::Source(_) => ErrorKind::SourceUnavailable,
            Self::Write { .. } => ErrorKind::Write,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
        }
    }
}
