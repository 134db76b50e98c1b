//! # tabula-core
//!
//! Core data structures for the tabula spreadsheet library.
//!
//! This crate provides the in-memory document model:
//! - [`CellValue`], [`Cell`] and [`CellStore`] - Sparse cell storage
//! - [`CellReference`] and [`RangeReference`] - A1-style reference math
//! - [`Workbook`], [`Worksheet`] - The main document structures
//! - [`Manifest`] and [`RelationshipGraph`] - Package bookkeeping
//!
//! ## Example
//!
//! ```rust
//! use tabula_core::{CellValue, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.sheet_mut(0).unwrap();
//!
//! sheet.set_value("A1", "Hello").unwrap();
//! sheet.append([1.0, 2.0, 3.0]).unwrap();
//!
//! assert_eq!(sheet.value("B2").unwrap(), &CellValue::Number(2.0));
//! assert_eq!(sheet.calculate_dimension().to_string(), "A1:C2");
//! ```

pub mod cell;
pub mod column;
pub mod error;
pub mod manifest;
pub mod named_range;
pub mod properties;
pub mod range;
pub mod relationship;
pub mod row;
pub mod workbook;
pub mod worksheet;

// Re-exports for convenience
pub use cell::{
    Cell, CellBounds, CellError, CellHandle, CellReference, CellStore, CellType, CellValue,
    MajorOrder, RangeReference,
};
pub use column::ColumnProperties;
pub use error::{Error, Result};
pub use manifest::Manifest;
pub use named_range::{NamedRange, NamedRangeCollection, NamedRangeTarget};
pub use properties::{Calendar, DocumentProperties};
pub use range::{Range, RangeCell, RangeLine, RangeMut};
pub use relationship::{Relationship, RelationshipGraph, RelationshipType};
pub use row::RowProperties;
pub use workbook::Workbook;
pub use worksheet::{PageMargins, PageOrientation, PageSetup, SheetId, SheetState, Worksheet};

/// Maximum number of rows in a worksheet
pub const MAX_ROW: u32 = 1_048_576;

/// Highest column index with a letter form of at most three letters (`ZZZ`)
pub const MAX_COLUMN: u32 = 18_278;

/// Maximum length of a sheet title
pub const MAX_SHEET_NAME_LEN: usize = 31;
