//! Worksheet type

use std::collections::BTreeMap;
use std::fmt;

use crate::cell::{
    Cell, CellHandle, CellReference, CellStore, CellType, CellValue, MajorOrder, RangeReference,
};
use crate::column::ColumnProperties;
use crate::error::{Error, Result};
use crate::named_range::{NamedRange, NamedRangeCollection};
use crate::range::{Range, RangeMut};
use crate::relationship::{Relationship, RelationshipType};
use crate::row::RowProperties;

/// Default column width used for pixel positioning, in points
pub const DEFAULT_COLUMN_WIDTH: f64 = 51.85;

/// Default row height, in points
pub const DEFAULT_ROW_HEIGHT: f64 = 15.0;

/// Largest number of cells a single merge may cover
pub const MAX_MERGE_CELLS: u64 = 1_000_000;

const SCREEN_DPI: f64 = 96.0;

fn points_to_pixels(points: f64) -> i64 {
    (points * SCREEN_DPI / 72.0).ceil() as i64
}

/// Stable identity of a worksheet within its workbook
///
/// Unlike a sheet index, an id survives reordering and removal of siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetId(pub(crate) u32);

impl SheetId {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A worksheet (single sheet in a workbook)
///
/// Worksheets are created and destroyed only through their
/// [`Workbook`](crate::Workbook).
#[derive(Debug, Clone)]
pub struct Worksheet {
    id: SheetId,
    /// Sheet title, unique within the workbook
    title: String,
    /// Cell storage
    cells: CellStore,
    /// Merged ranges in insertion order
    merged: Vec<RangeReference>,
    /// Sheet-scoped named ranges
    named_ranges: NamedRangeCollection,
    /// Top-left unfrozen cell; `A1` means no frozen panes
    frozen_panes: CellReference,
    /// Auto-filter range; zero width means unset
    auto_filter: RangeReference,
    page_setup: PageSetup,
    row_properties: BTreeMap<u32, RowProperties>,
    column_properties: BTreeMap<u32, ColumnProperties>,
    /// Relationships of the sheet part (append-only)
    relationships: Vec<Relationship>,
    comment_count: usize,
}

impl Worksheet {
    pub(crate) fn new(id: SheetId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            cells: CellStore::new(),
            merged: Vec::new(),
            named_ranges: NamedRangeCollection::new(),
            frozen_panes: CellReference::origin(),
            auto_filter: RangeReference::single(CellReference::origin()),
            page_setup: PageSetup::default(),
            row_properties: BTreeMap::new(),
            column_properties: BTreeMap::new(),
            relationships: Vec::new(),
            comment_count: 0,
        }
    }

    pub fn id(&self) -> SheetId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub(crate) fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    // === Cell Access ===

    /// Get a cell by reference string (e.g. "A1"), creating it if needed
    pub fn cell_mut(&mut self, reference: &str) -> Result<&mut Cell> {
        let reference = CellReference::parse(reference)?;
        Ok(self.cells.get_or_create(reference))
    }

    /// Get a cell by reference, creating it if needed
    pub fn cell_at_mut(&mut self, reference: CellReference) -> &mut Cell {
        self.cells.get_or_create(reference)
    }

    /// Get an existing cell; never creates
    pub fn cell(&self, reference: &str) -> Result<&Cell> {
        self.cells.get(CellReference::parse(reference)?)
    }

    pub fn cell_at(&self, reference: CellReference) -> Result<&Cell> {
        self.cells.get(reference)
    }

    pub fn has_cell(&self, reference: CellReference) -> bool {
        self.cells.contains(reference)
    }

    /// Set a cell value by reference string
    pub fn set_value<V: Into<CellValue>>(&mut self, reference: &str, value: V) -> Result<()> {
        self.cell_mut(reference)?.set_value(value);
        Ok(())
    }

    /// Value of an existing cell
    pub fn value(&self, reference: &str) -> Result<&CellValue> {
        Ok(self.cell(reference)?.value())
    }

    /// Touch a cell and return a handle that stays valid until the next structural edit
    pub fn handle(&mut self, reference: CellReference) -> CellHandle {
        self.cells.handle(reference)
    }

    pub fn resolve(&self, handle: CellHandle) -> Result<&Cell> {
        self.cells.resolve(handle)
    }

    pub fn resolve_mut(&mut self, handle: CellHandle) -> Result<&mut Cell> {
        self.cells.resolve_mut(handle)
    }

    /// Remove a single cell
    pub fn remove_cell(&mut self, reference: CellReference) -> Option<Cell> {
        self.cells.remove(reference)
    }

    /// Remove every cell in a row
    pub fn remove_row(&mut self, row: u32) -> usize {
        self.cells.remove_row(row)
    }

    /// Drop cells that carry no information
    pub fn collect_garbage(&mut self) -> usize {
        self.cells.collect_garbage()
    }

    /// Iterate over all stored cells in row-major order
    pub fn iter_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.cells()
    }

    pub fn iter_cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.cells.cells_mut()
    }

    /// Number of stored cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    // === Appending ===

    /// Row that the next [`append`](Self::append) writes to
    pub fn next_row(&self) -> u32 {
        if self.cells.is_empty() {
            1
        } else {
            self.highest_row() + 1
        }
    }

    /// Write values left to right into the next row, starting at column A
    pub fn append<I, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let row = self.next_row();
        for (i, value) in values.into_iter().enumerate() {
            let column = u32::try_from(i + 1)
                .map_err(|_| Error::out_of_range("too many values to append"))?;
            let reference = CellReference::new(column, row)?;
            self.cells.get_or_create(reference).set_value(value);
        }
        Ok(())
    }

    /// Write `(column, value)` pairs into the next row
    pub fn append_at_columns<I, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (u32, V)>,
        V: Into<CellValue>,
    {
        let row = self.next_row();
        for (column, value) in values {
            let reference = CellReference::new(column, row)?;
            self.cells.get_or_create(reference).set_value(value);
        }
        Ok(())
    }

    // === Merged Cells ===

    /// Merged ranges in the order they were merged
    pub fn merged_ranges(&self) -> &[RangeReference] {
        &self.merged
    }

    /// Merge cells by range string (e.g. "B2:C3")
    pub fn merge_cells(&mut self, range: &str) -> Result<()> {
        self.merge(RangeReference::parse(range)?)
    }

    /// Merge a range.
    ///
    /// Every cell except the first (row-major) loses its value: string cells
    /// become `""`, anything else becomes empty. All cells get the merge flag.
    /// Overlap with existing merges is not checked. Ranges covering more than
    /// [`MAX_MERGE_CELLS`] cells fail with `OutOfRange`.
    pub fn merge(&mut self, range: RangeReference) -> Result<()> {
        if range.cell_count() > MAX_MERGE_CELLS {
            return Err(Error::OutOfRange(format!(
                "merge of {} covers {} cells (limit {})",
                range,
                range.cell_count(),
                MAX_MERGE_CELLS
            )));
        }
        self.merged.push(range);

        for (i, reference) in range.cells().enumerate() {
            let cell = self.cells.get_or_create(reference);
            cell.set_merged(true);
            if i > 0 {
                if cell.data_type() == CellType::String {
                    cell.set_value("");
                } else {
                    cell.clear_value();
                }
            }
        }
        Ok(())
    }

    /// Unmerge cells by range string
    pub fn unmerge_cells(&mut self, range: &str) -> Result<()> {
        self.unmerge(RangeReference::parse(range)?)
    }

    /// Unmerge a previously merged range; values are left untouched.
    pub fn unmerge(&mut self, range: RangeReference) -> Result<()> {
        let position = self
            .merged
            .iter()
            .position(|r| {
                r.top_left().same_cell(&range.top_left())
                    && r.bottom_right().same_cell(&range.bottom_right())
            })
            .ok_or_else(|| Error::NotMerged(range.to_string()))?;
        self.merged.remove(position);

        for reference in range.cells() {
            if let Ok(cell) = self.cells.get_mut(reference) {
                cell.set_merged(false);
            }
        }
        Ok(())
    }

    // === Named Ranges ===

    /// Bind `name` to a single range on this sheet, replacing any previous definition
    pub fn create_named_range(&mut self, name: &str, range: RangeReference) {
        self.named_ranges
            .define_or_update(NamedRange::single(name, self.id, range));
    }

    pub fn has_named_range(&self, name: &str) -> bool {
        self.named_ranges.contains(name)
    }

    /// First range bound to `name`
    pub fn named_range(&self, name: &str) -> Result<RangeReference> {
        Ok(self.named_ranges.first_target(name)?.range)
    }

    pub fn remove_named_range(&mut self, name: &str) -> Result<NamedRange> {
        self.named_ranges
            .remove(name)
            .ok_or_else(|| Error::NotFound(format!("named range '{}'", name)))
    }

    pub fn named_ranges(&self) -> &NamedRangeCollection {
        &self.named_ranges
    }

    pub fn named_ranges_mut(&mut self) -> &mut NamedRangeCollection {
        &mut self.named_ranges
    }

    // === Dimensions ===

    pub fn lowest_row(&self) -> u32 {
        self.cells.bounds().lowest_row
    }

    pub fn highest_row(&self) -> u32 {
        self.cells.bounds().highest_row
    }

    pub fn lowest_column(&self) -> u32 {
        self.cells.bounds().lowest_column
    }

    pub fn highest_column(&self) -> u32 {
        self.cells.bounds().highest_column
    }

    /// Smallest range covering every stored cell (`A1:A1` when empty)
    pub fn calculate_dimension(&self) -> RangeReference {
        self.cells.bounds().to_range()
    }

    // === Range Views ===

    /// Read-only view of a range
    pub fn range(&self, reference: RangeReference) -> Range<'_> {
        Range::new(self, reference, MajorOrder::Row)
    }

    /// Mutable view of a range; writes create cells
    pub fn range_mut(&mut self, reference: RangeReference) -> RangeMut<'_> {
        RangeMut::new(self, reference)
    }

    /// Row-major view over the calculated dimension
    pub fn rows(&self) -> Range<'_> {
        self.range(self.calculate_dimension())
    }

    /// Row-major view over a range string
    pub fn rows_in(&self, range: &str) -> Result<Range<'_>> {
        Ok(self.range(RangeReference::parse(range)?))
    }

    /// Row-major view over a range string shifted by the given offsets
    pub fn rows_offset(
        &self,
        range: &str,
        row_offset: i64,
        column_offset: i64,
    ) -> Result<Range<'_>> {
        let reference = RangeReference::parse(range)?.make_offset(column_offset, row_offset)?;
        Ok(self.range(reference))
    }

    /// Column-major view over the calculated dimension
    pub fn columns(&self) -> Range<'_> {
        Range::new(self, self.calculate_dimension(), MajorOrder::Column)
    }

    // === Frozen Panes ===

    /// Freeze rows above and columns left of `top_left`
    pub fn freeze_panes(&mut self, top_left: CellReference) {
        self.frozen_panes = top_left;
    }

    pub fn freeze_panes_at(&mut self, top_left: &str) -> Result<()> {
        self.freeze_panes(CellReference::parse(top_left)?);
        Ok(())
    }

    pub fn unfreeze_panes(&mut self) {
        self.frozen_panes = CellReference::origin();
    }

    /// Top-left unfrozen cell (`A1` when nothing is frozen)
    pub fn frozen_panes(&self) -> CellReference {
        self.frozen_panes
    }

    pub fn has_frozen_panes(&self) -> bool {
        !self.frozen_panes.same_cell(&CellReference::origin())
    }

    // === Auto Filter ===

    pub fn set_auto_filter(&mut self, range: RangeReference) {
        self.auto_filter = range;
    }

    pub fn set_auto_filter_str(&mut self, range: &str) -> Result<()> {
        self.set_auto_filter(RangeReference::parse(range)?);
        Ok(())
    }

    pub fn unset_auto_filter(&mut self) {
        self.auto_filter = RangeReference::single(CellReference::origin());
    }

    pub fn auto_filter(&self) -> RangeReference {
        self.auto_filter
    }

    /// An auto-filter is set when its range spans more than one column
    pub fn has_auto_filter(&self) -> bool {
        self.auto_filter.width() > 0
    }

    // === Page Setup ===

    pub fn page_setup(&self) -> &PageSetup {
        &self.page_setup
    }

    pub fn page_setup_mut(&mut self) -> &mut PageSetup {
        &mut self.page_setup
    }

    pub fn sheet_state(&self) -> SheetState {
        self.page_setup.sheet_state
    }

    pub fn set_sheet_state(&mut self, state: SheetState) {
        self.page_setup.sheet_state = state;
    }

    pub fn is_visible(&self) -> bool {
        self.page_setup.sheet_state == SheetState::Visible
    }

    // === Row / Column Properties ===

    pub fn has_row_properties(&self, row: u32) -> bool {
        self.row_properties.contains_key(&row)
    }

    pub fn row_properties(&self, row: u32) -> Option<&RowProperties> {
        self.row_properties.get(&row)
    }

    /// Properties of a row, inserting defaults if absent
    pub fn row_properties_mut(&mut self, row: u32) -> &mut RowProperties {
        self.row_properties.entry(row).or_default()
    }

    pub fn iter_row_properties(&self) -> impl Iterator<Item = (u32, &RowProperties)> {
        self.row_properties.iter().map(|(r, p)| (*r, p))
    }

    /// Row height in points, falling back to the default
    pub fn row_height(&self, row: u32) -> f64 {
        self.row_properties
            .get(&row)
            .and_then(|p| p.height)
            .unwrap_or(DEFAULT_ROW_HEIGHT)
    }

    pub fn has_column_properties(&self, column: u32) -> bool {
        self.column_properties.contains_key(&column)
    }

    pub fn column_properties(&self, column: u32) -> Option<&ColumnProperties> {
        self.column_properties.get(&column)
    }

    /// Properties of a column, inserting defaults if absent
    pub fn column_properties_mut(&mut self, column: u32) -> &mut ColumnProperties {
        self.column_properties.entry(column).or_default()
    }

    pub fn iter_column_properties(&self) -> impl Iterator<Item = (u32, &ColumnProperties)> {
        self.column_properties.iter().map(|(c, p)| (*c, p))
    }

    /// Column width, falling back to the default
    pub fn column_width(&self, column: u32) -> f64 {
        self.column_properties
            .get(&column)
            .and_then(|p| p.width)
            .filter(|w| *w >= 0.0)
            .unwrap_or(DEFAULT_COLUMN_WIDTH)
    }

    /// Cell under a pixel offset from the top-left corner of the grid (96 dpi)
    pub fn point_pos(&self, left: i64, top: i64) -> CellReference {
        let mut column = 0u32;
        let mut left_pos = 0i64;
        while left_pos <= left && column < crate::MAX_COLUMN {
            column += 1;
            left_pos += points_to_pixels(self.column_width(column));
        }

        let mut row = 0u32;
        let mut top_pos = 0i64;
        while top_pos <= top && row < crate::MAX_ROW {
            row += 1;
            let height = self
                .row_properties
                .get(&row)
                .and_then(|p| p.height)
                .filter(|h| *h >= 0.0)
                .unwrap_or(DEFAULT_ROW_HEIGHT);
            top_pos += points_to_pixels(height);
        }

        CellReference::from_parts(column.max(1), row.max(1))
    }

    // === Relationships ===

    /// Append a relationship of the sheet part under id `rId{n+1}`, moving
    /// past ids already taken by loaded relationships
    pub fn create_relationship(
        &mut self,
        rel_type: RelationshipType,
        target: impl Into<String>,
    ) -> &Relationship {
        let mut n = self.relationships.len() + 1;
        while self.relationships.iter().any(|r| r.id == format!("rId{}", n)) {
            n += 1;
        }
        let id = format!("rId{}", n);
        self.relationships.push(Relationship::new(id, rel_type, target));
        &self.relationships[self.relationships.len() - 1]
    }

    /// Add a relationship under its own id, replacing one with the same id
    pub fn add_relationship(&mut self, relationship: Relationship) {
        match self
            .relationships
            .iter_mut()
            .find(|r| r.id == relationship.id)
        {
            Some(slot) => *slot = relationship,
            None => self.relationships.push(relationship),
        }
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    // === Comments ===

    pub fn comment_count(&self) -> usize {
        self.comment_count
    }

    pub fn increment_comments(&mut self) {
        self.comment_count += 1;
    }

    pub fn decrement_comments(&mut self) {
        self.comment_count = self.comment_count.saturating_sub(1);
    }
}

impl fmt::Display for Worksheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Worksheet \"{}\">", self.title)
    }
}

/// Sheet visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SheetState {
    #[default]
    Visible,
    Hidden,
    /// Hidden and not listed in the unhide dialog
    VeryHidden,
}

impl SheetState {
    /// Value of the `state` attribute in the workbook part
    pub fn as_str(&self) -> &'static str {
        match self {
            SheetState::Visible => "visible",
            SheetState::Hidden => "hidden",
            SheetState::VeryHidden => "veryHidden",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "visible" => Some(SheetState::Visible),
            "hidden" => Some(SheetState::Hidden),
            "veryHidden" => Some(SheetState::VeryHidden),
            _ => None,
        }
    }
}

/// Page orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PageOrientation {
    #[default]
    Default,
    Portrait,
    Landscape,
}

impl PageOrientation {
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            PageOrientation::Default => None,
            PageOrientation::Portrait => Some("portrait"),
            PageOrientation::Landscape => Some("landscape"),
        }
    }
}

/// Page margins in inches
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageMargins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub header: f64,
    pub footer: f64,
}

impl Default for PageMargins {
    fn default() -> Self {
        Self {
            left: 0.75,
            right: 0.75,
            top: 1.0,
            bottom: 1.0,
            header: 0.5,
            footer: 0.5,
        }
    }
}

/// Page setup for printing, plus the sheet's visibility
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageSetup {
    pub sheet_state: SheetState,
    /// Paper size code (e.g., 1 = Letter, 9 = A4); None = not written
    pub paper_size: Option<u32>,
    pub orientation: PageOrientation,
    pub fit_to_page: bool,
    pub fit_to_width: bool,
    pub fit_to_height: bool,
    pub margins: PageMargins,
}

impl PageSetup {
    /// Whether anything besides visibility and margins differs from the defaults
    pub fn is_default(&self) -> bool {
        self.paper_size.is_none()
            && self.orientation == PageOrientation::Default
            && !self.fit_to_page
            && !self.fit_to_width
            && !self.fit_to_height
    }
}
