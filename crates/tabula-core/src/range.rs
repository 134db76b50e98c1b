//! Range views over a worksheet

use crate::cell::{Cell, CellReference, CellValue, MajorOrder, RangeReference};
use crate::error::Result;
use crate::worksheet::Worksheet;

/// A read-only view of a rectangular block of cells
///
/// Never creates cells: positions that were never written report `None`.
#[derive(Debug, Clone, Copy)]
pub struct Range<'a> {
    worksheet: &'a Worksheet,
    reference: RangeReference,
    order: MajorOrder,
}

impl<'a> Range<'a> {
    pub fn new(worksheet: &'a Worksheet, reference: RangeReference, order: MajorOrder) -> Self {
        Self {
            worksheet,
            reference,
            order,
        }
    }

    pub fn reference(&self) -> RangeReference {
        self.reference
    }

    pub fn order(&self) -> MajorOrder {
        self.order
    }

    /// Number of lines (rows in row-major order, columns in column-major order)
    pub fn len(&self) -> usize {
        match self.order {
            MajorOrder::Row => self.reference.row_count() as usize,
            MajorOrder::Column => self.reference.column_count() as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a cell by offset from the top-left corner
    pub fn cell(&self, column_offset: u32, row_offset: u32) -> Option<&'a Cell> {
        let top_left = self.reference.top_left();
        let reference = CellReference::new(
            top_left.column().checked_add(column_offset)?,
            top_left.row().checked_add(row_offset)?,
        )
        .ok()?;
        if !self.reference.contains(&reference) {
            return None;
        }
        self.worksheet.cell_at(reference).ok()
    }

    /// Iterate over lines in major order
    pub fn lines(&self) -> impl Iterator<Item = RangeLine<'a>> + '_ {
        (0..self.len() as u32).map(move |i| RangeLine {
            worksheet: self.worksheet,
            reference: self.line_reference(i),
        })
    }

    fn line_reference(&self, index: u32) -> RangeReference {
        let tl = self.reference.top_left();
        let br = self.reference.bottom_right();
        let (start, end) = match self.order {
            MajorOrder::Row => (
                CellReference::from_parts(tl.column(), tl.row() + index),
                CellReference::from_parts(br.column(), tl.row() + index),
            ),
            MajorOrder::Column => (
                CellReference::from_parts(tl.column() + index, tl.row()),
                CellReference::from_parts(tl.column() + index, br.row()),
            ),
        };
        RangeReference::from_corners(start, end)
    }

    /// Iterate over every position in major order
    pub fn cells(&self) -> impl Iterator<Item = RangeCell<'a>> + '_ {
        let worksheet = self.worksheet;
        self.reference
            .cells_in_order(self.order)
            .map(move |reference| RangeCell {
                reference,
                cell: worksheet.cell_at(reference).ok(),
            })
    }

    /// Values in major order, one `Vec` per line
    pub fn values(&self) -> Vec<Vec<CellValue>> {
        self.lines()
            .map(|line| line.cells().map(|c| c.value().clone()).collect())
            .collect()
    }
}

/// One row (or column) of a [`Range`]
#[derive(Debug, Clone, Copy)]
pub struct RangeLine<'a> {
    worksheet: &'a Worksheet,
    reference: RangeReference,
}

impl<'a> RangeLine<'a> {
    pub fn reference(&self) -> RangeReference {
        self.reference
    }

    pub fn len(&self) -> usize {
        self.reference.cell_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cells(&self) -> impl Iterator<Item = RangeCell<'a>> + '_ {
        let worksheet = self.worksheet;
        self.reference.cells().map(move |reference| RangeCell {
            reference,
            cell: worksheet.cell_at(reference).ok(),
        })
    }
}

/// A position within a range iteration
#[derive(Debug, Clone, Copy)]
pub struct RangeCell<'a> {
    pub reference: CellReference,
    /// The stored cell, if it exists
    pub cell: Option<&'a Cell>,
}

static EMPTY: CellValue = CellValue::Empty;

impl<'a> RangeCell<'a> {
    /// The cell value (empty for positions that were never written)
    pub fn value(&self) -> &'a CellValue {
        self.cell.map(Cell::value).unwrap_or(&EMPTY)
    }

    pub fn is_empty(&self) -> bool {
        self.value().is_empty()
    }
}

/// A mutable view of a rectangular block of cells
///
/// Writes create cells on demand.
pub struct RangeMut<'a> {
    worksheet: &'a mut Worksheet,
    reference: RangeReference,
}

impl<'a> RangeMut<'a> {
    pub fn new(worksheet: &'a mut Worksheet, reference: RangeReference) -> Self {
        Self {
            worksheet,
            reference,
        }
    }

    pub fn reference(&self) -> RangeReference {
        self.reference
    }

    /// Set a cell value by offset from the top-left corner
    pub fn set_value<V: Into<CellValue>>(
        &mut self,
        column_offset: u32,
        row_offset: u32,
        value: V,
    ) -> Result<()> {
        let target = self
            .reference
            .top_left()
            .make_offset(i64::from(column_offset), i64::from(row_offset))?;
        if !self.reference.contains(&target) {
            return Err(crate::Error::out_of_range(format!(
                "{} is outside {}",
                target, self.reference
            )));
        }
        self.worksheet.cell_at_mut(target).set_value(value);
        Ok(())
    }

    /// Set all cells to the same value
    pub fn fill<V: Into<CellValue> + Clone>(&mut self, value: V) {
        for reference in self.reference.cells() {
            self.worksheet.cell_at_mut(reference).set_value(value.clone());
        }
    }

    /// Clear the values of all existing cells in the range
    pub fn clear(&mut self) {
        for reference in self.reference.cells() {
            if self.worksheet.has_cell(reference) {
                self.worksheet.cell_at_mut(reference).clear_value();
            }
        }
    }

    /// Merge the cells in this range
    pub fn merge(&mut self) -> Result<()> {
        self.worksheet.merge(self.reference)
    }
}
