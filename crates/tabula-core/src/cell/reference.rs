//! Cell and range references
//!
//! Columns and rows are 1-based. A column also has a letter form (`A`..`ZZZ`),
//! base-26 without a zero digit.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::{MAX_COLUMN, MAX_ROW};

/// Convert a 1-based column index to its letter form (1 = A, 26 = Z, 27 = AA).
///
/// # Examples
/// ```
/// use tabula_core::cell::column_to_letters;
///
/// assert_eq!(column_to_letters(1).unwrap(), "A");
/// assert_eq!(column_to_letters(703).unwrap(), "AAA");
/// assert!(column_to_letters(0).is_err());
/// ```
pub fn column_to_letters(column: u32) -> Result<String> {
    if column == 0 || column > MAX_COLUMN {
        return Err(Error::out_of_range(format!(
            "column index {} outside 1..={}",
            column, MAX_COLUMN
        )));
    }

    let mut letters = Vec::with_capacity(3);
    let mut n = column;
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();

    // Only ASCII uppercase bytes were pushed
    Ok(letters.into_iter().map(char::from).collect())
}

/// Convert column letters to a 1-based index (A = 1, Z = 26, AA = 27).
///
/// Letters are case-insensitive.
pub fn letters_to_column(letters: &str) -> Result<u32> {
    if letters.is_empty() {
        return Err(Error::parse("empty column letters"));
    }
    if let Some(c) = letters.chars().find(|c| !c.is_ascii_alphabetic()) {
        return Err(Error::parse(format!("invalid column letter '{}'", c)));
    }
    if letters.len() > 3 {
        return Err(Error::out_of_range(format!(
            "column '{}' is wider than ZZZ",
            letters
        )));
    }

    let column = letters.bytes().fold(0u32, |acc, b| {
        acc * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1)
    });

    Ok(column)
}

/// Relative or absolute reference to a single cell (e.g. `B7`, `$B$7`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellReference {
    column: u32,
    row: u32,
    column_absolute: bool,
    row_absolute: bool,
}

impl CellReference {
    /// Create a relative reference from a 1-based column and row.
    pub fn new(column: u32, row: u32) -> Result<Self> {
        if column == 0 || column > MAX_COLUMN {
            return Err(Error::out_of_range(format!(
                "column {} outside 1..={}",
                column, MAX_COLUMN
            )));
        }
        if row == 0 || row > MAX_ROW {
            return Err(Error::out_of_range(format!(
                "row {} outside 1..={}",
                row, MAX_ROW
            )));
        }
        Ok(Self {
            column,
            row,
            column_absolute: false,
            row_absolute: false,
        })
    }

    /// The top-left cell, `A1`.
    pub const fn origin() -> Self {
        Self {
            column: 1,
            row: 1,
            column_absolute: false,
            row_absolute: false,
        }
    }

    /// Parse an A1-style reference, with optional `$` anchors.
    ///
    /// # Examples
    /// ```
    /// use tabula_core::CellReference;
    ///
    /// let r = CellReference::parse("$C$12").unwrap();
    /// assert_eq!(r.column(), 3);
    /// assert_eq!(r.row(), 12);
    /// assert!(r.is_column_absolute() && r.is_row_absolute());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::parse("empty cell reference"));
        }

        let bytes = s.as_bytes();
        let mut pos = 0;

        let column_absolute = bytes.first() == Some(&b'$');
        if column_absolute {
            pos += 1;
        }

        let column_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        if pos == column_start {
            return Err(Error::parse(format!("no column letters in '{}'", s)));
        }
        let column = letters_to_column(&s[column_start..pos])?;

        let row_absolute = bytes.get(pos) == Some(&b'$');
        if row_absolute {
            pos += 1;
        }

        let row_str = &s[pos..];
        if row_str.is_empty() || !row_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::parse(format!("invalid row number in '{}'", s)));
        }
        let row: u64 = row_str
            .parse()
            .map_err(|_| Error::parse(format!("invalid row number in '{}'", s)))?;
        if row == 0 {
            return Err(Error::parse(format!("row number must be >= 1 in '{}'", s)));
        }
        if row > u64::from(MAX_ROW) {
            return Err(Error::out_of_range(format!(
                "row {} exceeds {} in '{}'",
                row, MAX_ROW, s
            )));
        }

        Ok(Self {
            column,
            row: row as u32,
            column_absolute,
            row_absolute,
        })
    }

    /// 1-based column index
    pub fn column(&self) -> u32 {
        self.column
    }

    /// 1-based row index
    pub fn row(&self) -> u32 {
        self.row
    }

    /// Column in letter form, without anchor
    pub fn column_letters(&self) -> String {
        // Constructors guarantee the column is in range
        column_to_letters(self.column).unwrap_or_default()
    }

    pub fn is_column_absolute(&self) -> bool {
        self.column_absolute
    }

    pub fn is_row_absolute(&self) -> bool {
        self.row_absolute
    }

    /// Same coordinates, ignoring `$` anchors
    pub fn same_cell(&self, other: &CellReference) -> bool {
        self.column == other.column && self.row == other.row
    }

    /// Copy of this reference with both column and row anchored
    pub fn make_absolute(&self) -> Self {
        self.with_absolute(true, true)
    }

    /// Copy of this reference with the given anchors
    pub fn with_absolute(&self, column_absolute: bool, row_absolute: bool) -> Self {
        Self {
            column_absolute,
            row_absolute,
            ..*self
        }
    }

    /// Shift by `column_offset` columns and `row_offset` rows.
    ///
    /// Fails with [`Error::OutOfRange`] if the result leaves the grid.
    pub fn make_offset(&self, column_offset: i64, row_offset: i64) -> Result<Self> {
        let column = i64::from(self.column) + column_offset;
        let row = i64::from(self.row) + row_offset;

        if column < 1 || column > i64::from(MAX_COLUMN) || row < 1 || row > i64::from(MAX_ROW) {
            return Err(Error::out_of_range(format!(
                "offset ({}, {}) moves {} off the grid",
                column_offset, row_offset, self
            )));
        }

        Ok(Self {
            column: column as u32,
            row: row as u32,
            ..*self
        })
    }

    /// Construct without bounds checks; callers derive the values from valid references.
    pub(crate) fn from_parts(column: u32, row: u32) -> Self {
        Self {
            column,
            row,
            column_absolute: false,
            row_absolute: false,
        }
    }
}

impl Default for CellReference {
    fn default() -> Self {
        Self::origin()
    }
}

impl fmt::Display for CellReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.column_absolute {
            f.write_str("$")?;
        }
        f.write_str(&self.column_letters())?;
        if self.row_absolute {
            f.write_str("$")?;
        }
        write!(f, "{}", self.row)
    }
}

impl FromStr for CellReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for CellReference {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Iteration order over the cells of a range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MajorOrder {
    #[default]
    Row,
    Column,
}

/// A rectangular range between two corners (e.g. `A1:B5`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeReference {
    top_left: CellReference,
    bottom_right: CellReference,
}

impl RangeReference {
    /// Create a range from its corners.
    ///
    /// A reversed range (top-left below or right of bottom-right) is rejected.
    pub fn new(top_left: CellReference, bottom_right: CellReference) -> Result<Self> {
        if top_left.column > bottom_right.column || top_left.row > bottom_right.row {
            return Err(Error::parse(format!(
                "reversed range {}:{}",
                top_left, bottom_right
            )));
        }
        Ok(Self {
            top_left,
            bottom_right,
        })
    }

    /// Create a range from 1-based bounds
    pub fn from_bounds(
        first_column: u32,
        first_row: u32,
        last_column: u32,
        last_row: u32,
    ) -> Result<Self> {
        Self::new(
            CellReference::new(first_column, first_row)?,
            CellReference::new(last_column, last_row)?,
        )
    }

    /// Construct without ordering checks; callers pass already-ordered corners.
    pub(crate) fn from_corners(top_left: CellReference, bottom_right: CellReference) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }

    /// A range covering exactly one cell
    pub fn single(cell: CellReference) -> Self {
        Self {
            top_left: cell,
            bottom_right: cell,
        }
    }

    /// Parse `A1:B5`, or a single-cell range written without a colon.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::parse("empty range reference"));
        }

        let mut parts = s.split(':');
        let first = parts.next().unwrap_or_default();
        let second = parts.next();
        if parts.next().is_some() {
            return Err(Error::parse(format!("too many ':' in range '{}'", s)));
        }

        let top_left = CellReference::parse(first)?;
        match second {
            Some(second) => Self::new(top_left, CellReference::parse(second)?),
            None => Ok(Self::single(top_left)),
        }
    }

    pub fn top_left(&self) -> CellReference {
        self.top_left
    }

    pub fn bottom_right(&self) -> CellReference {
        self.bottom_right
    }

    /// Column distance between the corners (0 for a single-column range)
    pub fn width(&self) -> u32 {
        self.bottom_right.column - self.top_left.column
    }

    /// Row distance between the corners (0 for a single-row range)
    pub fn height(&self) -> u32 {
        self.bottom_right.row - self.top_left.row
    }

    /// Number of columns covered
    pub fn column_count(&self) -> u32 {
        self.width() + 1
    }

    /// Number of rows covered
    pub fn row_count(&self) -> u32 {
        self.height() + 1
    }

    pub fn cell_count(&self) -> u64 {
        u64::from(self.column_count()) * u64::from(self.row_count())
    }

    /// Check if a cell lies inside this range
    pub fn contains(&self, cell: &CellReference) -> bool {
        cell.column >= self.top_left.column
            && cell.column <= self.bottom_right.column
            && cell.row >= self.top_left.row
            && cell.row <= self.bottom_right.row
    }

    /// Check if this range overlaps with another
    pub fn overlaps(&self, other: &RangeReference) -> bool {
        self.top_left.row <= other.bottom_right.row
            && self.bottom_right.row >= other.top_left.row
            && self.top_left.column <= other.bottom_right.column
            && self.bottom_right.column >= other.top_left.column
    }

    /// Copy with both corners fully `$`-anchored
    pub fn make_absolute(&self) -> Self {
        Self {
            top_left: self.top_left.make_absolute(),
            bottom_right: self.bottom_right.make_absolute(),
        }
    }

    /// Shift both corners.
    ///
    /// # Examples
    /// ```
    /// use tabula_core::RangeReference;
    ///
    /// let r = RangeReference::parse("A1:B2").unwrap();
    /// assert_eq!(r.make_offset(2, 3).unwrap().to_string(), "C4:D5");
    /// assert!(r.make_offset(-1, 0).is_err());
    /// ```
    pub fn make_offset(&self, column_offset: i64, row_offset: i64) -> Result<Self> {
        Ok(Self {
            top_left: self.top_left.make_offset(column_offset, row_offset)?,
            bottom_right: self.bottom_right.make_offset(column_offset, row_offset)?,
        })
    }

    /// Iterate over all cells, row by row
    pub fn cells(&self) -> RangeCells {
        self.cells_in_order(MajorOrder::Row)
    }

    /// Iterate over all cells in the given major order
    pub fn cells_in_order(&self, order: MajorOrder) -> RangeCells {
        RangeCells {
            range: *self,
            order,
            column: self.top_left.column,
            row: self.top_left.row,
            remaining: self.cell_count(),
        }
    }
}

impl fmt::Display for RangeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.top_left, self.bottom_right)
    }
}

impl FromStr for RangeReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for RangeReference {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Iterator over the cells of a [`RangeReference`]
#[derive(Debug, Clone)]
pub struct RangeCells {
    range: RangeReference,
    order: MajorOrder,
    column: u32,
    row: u32,
    remaining: u64,
}

impl Iterator for RangeCells {
    type Item = CellReference;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let cell = CellReference::from_parts(self.column, self.row);

        match self.order {
            MajorOrder::Row => {
                self.column += 1;
                if self.column > self.range.bottom_right.column {
                    self.column = self.range.top_left.column;
                    self.row += 1;
                }
            }
            MajorOrder::Column => {
                self.row += 1;
                if self.row > self.range.bottom_right.row {
                    self.row = self.range.top_left.row;
                    self.column += 1;
                }
            }
        }

        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RangeCells {}
