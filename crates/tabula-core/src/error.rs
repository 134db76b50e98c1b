//! Error types for tabula-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tabula-core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed reference, range or date/time text
    #[error("Parse error: {0}")]
    Parse(String),

    /// Lookup against a key that does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Reference math overflow or underflow
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Unmerge requested for a range that was never merged
    #[error("Range {0} is not merged")]
    NotMerged(String),

    /// Sheet index out of bounds
    #[error("Sheet index {0} out of bounds (count: {1})")]
    SheetOutOfBounds(usize, usize),

    /// Invalid sheet title
    #[error("Invalid sheet title: {0}")]
    InvalidSheetName(String),

    /// Duplicate sheet title
    #[error("Sheet title already exists: {0}")]
    DuplicateSheetName(String),

    /// A cell handle was issued before a structural edit of its store
    #[error("Stale cell handle for {0}")]
    StaleHandle(String),

    /// The date epoch cannot change once date cells exist
    #[error("Calendar cannot change after date cells were written")]
    CalendarLocked,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    pub(crate) fn parse<S: Into<String>>(msg: S) -> Self {
        Error::Parse(msg.into())
    }

    pub(crate) fn out_of_range<S: Into<String>>(msg: S) -> Self {
        Error::OutOfRange(msg.into())
    }
}
