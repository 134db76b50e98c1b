//! Cell storage implementation
//!
//! Sparse, row-based storage for one worksheet. Cells are created on access
//! and removed again by [`CellStore::collect_garbage`] once they carry no
//! information.

use std::collections::BTreeMap;

use super::{CellReference, CellType, CellValue, RangeReference};
use crate::error::{Error, Result};

/// A single cell: value, merge flag and opaque style index
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    reference: CellReference,
    value: CellValue,
    merged: bool,
    /// Index into an external style registry (0 = default style)
    style_index: u32,
}

impl Cell {
    pub(crate) fn new(reference: CellReference) -> Self {
        Self {
            reference,
            value: CellValue::Empty,
            merged: false,
            style_index: 0,
        }
    }

    /// Where this cell lives in its worksheet
    pub fn reference(&self) -> CellReference {
        self.reference
    }

    pub fn value(&self) -> &CellValue {
        &self.value
    }

    pub fn data_type(&self) -> CellType {
        self.value.cell_type()
    }

    pub fn set_value<V: Into<CellValue>>(&mut self, value: V) {
        self.value = value.into();
    }

    /// Reset the value to [`CellValue::Empty`]
    pub fn clear_value(&mut self) {
        self.value = CellValue::Empty;
    }

    pub fn is_merged(&self) -> bool {
        self.merged
    }

    pub fn set_merged(&mut self, merged: bool) {
        self.merged = merged;
    }

    pub fn style_index(&self) -> u32 {
        self.style_index
    }

    pub fn set_style_index(&mut self, style_index: u32) {
        self.style_index = style_index;
    }

    pub fn has_style(&self) -> bool {
        self.style_index != 0
    }

    /// True when the cell carries no information and can be dropped
    pub fn is_collectible(&self) -> bool {
        self.value.is_empty() && !self.merged && !self.has_style()
    }
}

/// A handle to a cell slot, valid until the next structural edit of its store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellHandle {
    reference: CellReference,
    generation: u64,
}

impl CellHandle {
    pub fn reference(&self) -> CellReference {
        self.reference
    }
}

/// Lowest and highest populated row/column of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBounds {
    pub lowest_row: u32,
    pub highest_row: u32,
    pub lowest_column: u32,
    pub highest_column: u32,
}

impl CellBounds {
    /// The rectangle spanned by the bounds
    pub fn to_range(&self) -> RangeReference {
        RangeReference::from_corners(
            CellReference::from_parts(self.lowest_column, self.lowest_row),
            CellReference::from_parts(self.highest_column, self.highest_row),
        )
    }
}

impl Default for CellBounds {
    fn default() -> Self {
        Self {
            lowest_row: 1,
            highest_row: 1,
            lowest_column: 1,
            highest_column: 1,
        }
    }
}

/// Sparse row → column → cell storage
///
/// Structure: `BTreeMap<row, BTreeMap<column, Cell>>`, so iteration is
/// row-major. Every structural edit (removal, garbage collection) bumps a
/// generation counter that invalidates outstanding [`CellHandle`]s.
#[derive(Debug, Clone, Default)]
pub struct CellStore {
    rows: BTreeMap<u32, BTreeMap<u32, Cell>>,
    generation: u64,
}

impl CellStore {
    /// Create a new empty cell store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cell, creating an empty one if it was never touched.
    ///
    /// The store is mutated even if the caller never writes a value, so
    /// dimension queries and iteration see touched cells.
    pub fn get_or_create(&mut self, reference: CellReference) -> &mut Cell {
        self.rows
            .entry(reference.row())
            .or_default()
            .entry(reference.column())
            .or_insert_with(|| {
                Cell::new(CellReference::from_parts(reference.column(), reference.row()))
            })
    }

    /// Get an existing cell
    pub fn get(&self, reference: CellReference) -> Result<&Cell> {
        self.find(reference)
            .ok_or_else(|| Error::NotFound(format!("cell {}", reference)))
    }

    /// Get an existing cell mutably, without creating it
    pub fn get_mut(&mut self, reference: CellReference) -> Result<&mut Cell> {
        self.rows
            .get_mut(&reference.row())
            .and_then(|r| r.get_mut(&reference.column()))
            .ok_or_else(|| Error::NotFound(format!("cell {}", reference)))
    }

    pub fn find(&self, reference: CellReference) -> Option<&Cell> {
        self.rows
            .get(&reference.row())
            .and_then(|r| r.get(&reference.column()))
    }

    pub fn contains(&self, reference: CellReference) -> bool {
        self.find(reference).is_some()
    }

    /// Touch a cell and return a handle to it
    pub fn handle(&mut self, reference: CellReference) -> CellHandle {
        self.get_or_create(reference);
        CellHandle {
            reference: CellReference::from_parts(reference.column(), reference.row()),
            generation: self.generation,
        }
    }

    /// Resolve a handle, failing if the store changed structurally since it was issued
    pub fn resolve(&self, handle: CellHandle) -> Result<&Cell> {
        self.check_generation(handle)?;
        self.get(handle.reference)
    }

    pub fn resolve_mut(&mut self, handle: CellHandle) -> Result<&mut Cell> {
        self.check_generation(handle)?;
        self.get_mut(handle.reference)
    }

    fn check_generation(&self, handle: CellHandle) -> Result<()> {
        if handle.generation != self.generation {
            return Err(Error::StaleHandle(handle.reference.to_string()));
        }
        Ok(())
    }

    /// Remove a cell
    pub fn remove(&mut self, reference: CellReference) -> Option<Cell> {
        self.generation += 1;

        let row = reference.row();
        let removed = self.rows.get_mut(&row).and_then(|r| r.remove(&reference.column()));
        if self.rows.get(&row).is_some_and(|r| r.is_empty()) {
            self.rows.remove(&row);
        }
        removed
    }

    /// Remove a whole row, returning how many cells it held
    pub fn remove_row(&mut self, row: u32) -> usize {
        self.generation += 1;
        self.rows.remove(&row).map_or(0, |r| r.len())
    }

    /// Clear all cells
    pub fn clear(&mut self) {
        self.generation += 1;
        self.rows.clear();
    }

    /// Drop every collectible cell and prune rows left empty.
    ///
    /// Returns the number of cells removed.
    pub fn collect_garbage(&mut self) -> usize {
        self.generation += 1;

        let mut removed = 0;
        self.rows.retain(|_, cells| {
            let before = cells.len();
            cells.retain(|_, cell| !cell.is_collectible());
            removed += before - cells.len();
            !cells.is_empty()
        });

        removed
    }

    /// Iterate over all cells in row order
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.rows.values().flat_map(|cols| cols.values())
    }

    /// Iterate mutably over all cells in row order
    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.rows.values_mut().flat_map(|cols| cols.values_mut())
    }

    /// Iterate over the cells of one row
    pub fn row(&self, row: u32) -> impl Iterator<Item = &Cell> {
        self.rows.get(&row).into_iter().flat_map(|cols| cols.values())
    }

    /// Iterate over row indices that hold cells
    pub fn row_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.keys().copied()
    }

    /// Number of stored cells
    pub fn len(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Scan all populated entries; an empty store reports the single cell (1, 1)
    pub fn bounds(&self) -> CellBounds {
        let (Some(&lowest_row), Some(&highest_row)) =
            (self.rows.keys().next(), self.rows.keys().next_back())
        else {
            return CellBounds::default();
        };

        let mut lowest_column = u32::MAX;
        let mut highest_column = 1;
        for columns in self.rows.values() {
            if let Some(&col) = columns.keys().next() {
                lowest_column = lowest_column.min(col);
            }
            if let Some(&col) = columns.keys().next_back() {
                highest_column = highest_column.max(col);
            }
        }

        CellBounds {
            lowest_row,
            highest_row,
            lowest_column: lowest_column.min(highest_column),
            highest_column,
        }
    }
}
