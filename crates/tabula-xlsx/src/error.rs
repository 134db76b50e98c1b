//! XLSX error types

use thiserror::Error;

/// Result type for XLSX operations
pub type XlsxResult<T> = std::result::Result<T, XlsxError>;

/// Errors that can occur during XLSX reading/writing
#[derive(Debug, Error)]
pub enum XlsxError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Invalid file format
    #[error("Invalid XLSX format: {0}")]
    InvalidFormat(String),

    /// Missing required part
    #[error("Missing required part: {0}")]
    MissingPart(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// The workbook's sheet list names a relationship id the workbook part does not have
    #[error("Sheet '{title}' refers to missing relationship '{id}'")]
    DanglingRelationship { id: String, title: String },

    /// Saving requires at least one visible worksheet
    #[error("Workbook has no visible worksheets")]
    NoVisibleSheets,

    /// The main document part is not a spreadsheet
    #[error("Unsupported document type: {0}")]
    UnsupportedDocument(String),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] tabula_core::Error),
}
