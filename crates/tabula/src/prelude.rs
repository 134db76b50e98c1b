//! Prelude module - common imports for tabula users
//!
//! ```rust
//! use tabula::prelude::*;
//! ```

pub use crate::{
    CellError,
    CellReference,
    // Cell types
    CellValue,
    // Error types
    Error,
    RangeReference,
    Result,
    SheetState,

    // Main types
    Workbook,
    // Extension traits
    WorkbookExt,
    Worksheet,

    // I/O types
    XlsxReader,
    XlsxWriter,
};
