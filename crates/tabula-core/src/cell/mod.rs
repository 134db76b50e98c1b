//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellValue`] - The value stored in a cell
//! - [`CellReference`] - A cell's location (e.g., "A1")
//! - [`RangeReference`] - A range of cells (e.g., "A1:B10")
//! - [`CellStore`] - Sparse per-worksheet storage of [`Cell`]s

mod reference;
mod storage;
mod value;

pub use reference::{
    column_to_letters, letters_to_column, CellReference, MajorOrder, RangeCells, RangeReference,
};
pub use storage::{Cell, CellBounds, CellHandle, CellStore};
pub use value::{CellError, CellType, CellValue};
