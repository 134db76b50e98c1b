//! # tabula
//!
//! A Rust library for reading, writing, and manipulating XLSX workbooks.
//!
//! ## Features
//!
//! - Sparse in-memory workbook model with A1 reference math
//! - Merged cells, named ranges, frozen panes, auto-filters, page setup
//! - Read and write XLSX packages (Office Open XML)
//! - Document properties (`docProps/core.xml`, `docProps/app.xml`)
//!
//! ## Example
//!
//! ```rust
//! use tabula::prelude::*;
//!
//! // Create a new workbook
//! let mut workbook = Workbook::new();
//!
//! // Get the first worksheet
//! let sheet = workbook.sheet_mut(0).unwrap();
//!
//! // Set cell values
//! sheet.set_value("A1", "Hello").unwrap();
//! sheet.set_value("B1", 42.0).unwrap();
//! sheet.set_value("C1", true).unwrap();
//!
//! // Set a formula
//! sheet.set_value("D1", CellValue::formula("=B1*2")).unwrap();
//!
//! // Save to file
//! // workbook.save("output.xlsx").unwrap();
//! ```

pub mod prelude;

// Re-export core types
pub use tabula_core::{
    // Cell types
    Cell,
    CellError,
    CellReference,
    CellValue,
    ColumnProperties,
    // Properties
    Calendar,
    DocumentProperties,
    // Error types
    Error,
    // Package bookkeeping
    Manifest,
    NamedRange,
    PageMargins,
    PageOrientation,
    PageSetup,
    RangeReference,
    Relationship,
    RelationshipGraph,
    RelationshipType,
    Result,
    RowProperties,
    SheetState,
    // Main types
    Workbook,
    Worksheet,
    // Constants
    MAX_COLUMN,
    MAX_ROW,
};

// Re-export I/O types
pub use tabula_xlsx::{
    Compression, ReadOptions, WriteOptions, XlsxError, XlsxReader, XlsxResult, XlsxWriter,
};

use std::path::Path;

/// Extension trait for Workbook to add file I/O
pub trait WorkbookExt {
    /// Open a workbook from a file
    fn open<P: AsRef<Path>>(path: P) -> Result<Workbook>;

    /// Save the workbook to a file
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>;
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

impl WorkbookExt for Workbook {
    fn open<P: AsRef<Path>>(path: P) -> Result<Workbook> {
        let path = path.as_ref();
        match extension_of(path).as_deref() {
            Some("xlsx") | Some("xlsm") | Some("xltx") => {
                XlsxReader::read_file(path).map_err(|e| Error::other(e.to_string()))
            }
            _ => Err(Error::other(format!(
                "Unsupported file format: {}",
                path.display()
            ))),
        }
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        match extension_of(path).as_deref() {
            Some("xlsx") => {
                XlsxWriter::write_file(self, path).map_err(|e| Error::other(e.to_string()))
            }
            _ => Err(Error::other(format!(
                "Unsupported file format: {}",
                path.display()
            ))),
        }
    }
}
