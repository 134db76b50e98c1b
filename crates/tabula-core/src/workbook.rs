//! Workbook type - the main document structure

use chrono::NaiveDateTime;

use crate::cell::{CellValue, RangeReference};
use crate::error::{Error, Result};
use crate::manifest::{content_type, part_name, Manifest};
use crate::named_range::{NamedRange, NamedRangeCollection, NamedRangeTarget};
use crate::properties::{Calendar, DocumentProperties};
use crate::relationship::{Relationship, RelationshipGraph, RelationshipType};
use crate::worksheet::{SheetId, Worksheet};
use crate::MAX_SHEET_NAME_LEN;

/// A workbook (spreadsheet document)
///
/// Owns its worksheets, and keeps the package manifest and the workbook
/// part's relationships in step with the worksheet sequence: the sheet at
/// position `i` lives at `/xl/worksheets/sheet{i+1}.xml`.
#[derive(Debug, Clone)]
pub struct Workbook {
    /// Worksheets in save order
    worksheets: Vec<Worksheet>,
    next_sheet_id: u32,
    properties: DocumentProperties,
    /// Workbook-scoped named ranges
    named_ranges: NamedRangeCollection,
    manifest: Manifest,
    /// Relationships of the workbook part
    relationships: RelationshipGraph,
    /// Raw `xl/styles.xml`, carried through unchanged
    stylesheet: Option<Vec<u8>>,
    /// Set once a date cell has been written; the calendar is fixed from then on
    has_date_cells: bool,
}

impl Workbook {
    /// Create a new workbook with one worksheet named "Sheet1"
    pub fn new() -> Self {
        let mut wb = Self::empty();
        wb.push_sheet("Sheet1".to_string());
        wb
    }

    /// Create a workbook with no worksheets
    pub fn empty() -> Self {
        let mut manifest = Manifest::with_package_defaults();
        manifest.register_override(part_name::WORKBOOK, content_type::WORKBOOK);
        manifest.register_override(part_name::STYLES, content_type::STYLES);
        manifest.register_override(part_name::CORE_PROPERTIES, content_type::CORE_PROPERTIES);
        manifest.register_override(part_name::APP_PROPERTIES, content_type::APP_PROPERTIES);

        let mut relationships = RelationshipGraph::new();
        relationships.create(RelationshipType::Styles, "styles.xml");

        Self {
            worksheets: Vec::new(),
            next_sheet_id: 1,
            properties: DocumentProperties::new(),
            named_ranges: NamedRangeCollection::new(),
            manifest,
            relationships,
            stylesheet: None,
            has_date_cells: false,
        }
    }

    // === Worksheets ===

    /// Get the number of worksheets
    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Check if the workbook has no worksheets
    pub fn is_empty(&self) -> bool {
        self.worksheets.is_empty()
    }

    /// Get a worksheet by index
    pub fn sheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    /// Get a mutable worksheet by index
    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    /// Get a worksheet by title
    pub fn sheet_by_title(&self, title: &str) -> Option<&Worksheet> {
        self.worksheets.iter().find(|ws| ws.title() == title)
    }

    /// Get a mutable worksheet by title
    pub fn sheet_by_title_mut(&mut self, title: &str) -> Option<&mut Worksheet> {
        self.worksheets.iter_mut().find(|ws| ws.title() == title)
    }

    pub fn sheet_by_id(&self, id: SheetId) -> Option<&Worksheet> {
        self.worksheets.iter().find(|ws| ws.id() == id)
    }

    pub fn sheet_by_id_mut(&mut self, id: SheetId) -> Option<&mut Worksheet> {
        self.worksheets.iter_mut().find(|ws| ws.id() == id)
    }

    /// Get the index of a worksheet by title
    pub fn index_of(&self, title: &str) -> Option<usize> {
        self.worksheets.iter().position(|ws| ws.title() == title)
    }

    pub fn index_of_id(&self, id: SheetId) -> Option<usize> {
        self.worksheets.iter().position(|ws| ws.id() == id)
    }

    /// Titles in workbook order
    pub fn sheet_titles(&self) -> Vec<&str> {
        self.worksheets.iter().map(Worksheet::title).collect()
    }

    /// Iterate over all worksheets
    pub fn sheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    /// Iterate over all worksheets mutably
    pub fn sheets_mut(&mut self) -> impl Iterator<Item = &mut Worksheet> {
        self.worksheets.iter_mut()
    }

    /// Add a new worksheet with a generated title ("Sheet{n}")
    pub fn create_sheet(&mut self) -> &mut Worksheet {
        let title = self.generate_sheet_name();
        self.push_sheet(title)
    }

    /// Add a new worksheet with the given title
    pub fn create_sheet_with_title(&mut self, title: &str) -> Result<&mut Worksheet> {
        self.validate_sheet_name(title, None)?;
        Ok(self.push_sheet(title.to_string()))
    }

    fn push_sheet(&mut self, title: String) -> &mut Worksheet {
        let id = SheetId(self.next_sheet_id);
        self.next_sheet_id += 1;
        self.worksheets.push(Worksheet::new(id, title));
        self.sync_package();

        let last = self.worksheets.len() - 1;
        &mut self.worksheets[last]
    }

    /// Remove a worksheet by index
    ///
    /// Named-range areas on the removed sheet are dropped with it.
    pub fn remove_sheet(&mut self, index: usize) -> Result<Worksheet> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }

        let removed = self.worksheets.remove(index);
        self.named_ranges.remove_sheet(removed.id());
        for sheet in &mut self.worksheets {
            sheet.named_ranges_mut().remove_sheet(removed.id());
        }
        self.sync_package();

        Ok(removed)
    }

    /// Rename a worksheet
    pub fn rename_sheet(&mut self, index: usize, title: &str) -> Result<()> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        self.validate_sheet_name(title, Some(index))?;
        self.worksheets[index].set_title(title);
        Ok(())
    }

    /// `candidate` if no sibling uses it, otherwise `candidate` followed by
    /// the smallest positive integer that is free
    pub fn unique_sheet_name(&self, candidate: &str) -> String {
        if !self.title_in_use(candidate, None) {
            return candidate.to_string();
        }

        let mut n = 1usize;
        loop {
            let name = format!("{}{}", candidate, n);
            if !self.title_in_use(&name, None) {
                return name;
            }
            n += 1;
        }
    }

    fn title_in_use(&self, title: &str, exclude_index: Option<usize>) -> bool {
        let title_lower = title.to_lowercase();
        self.worksheets
            .iter()
            .enumerate()
            .any(|(i, ws)| Some(i) != exclude_index && ws.title().to_lowercase() == title_lower)
    }

    /// Validate a sheet title, optionally excluding a sheet from the duplicate check
    fn validate_sheet_name(&self, title: &str, exclude_index: Option<usize>) -> Result<()> {
        if title.is_empty() {
            return Err(Error::InvalidSheetName("Sheet title cannot be empty".into()));
        }
        if title.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Sheet title too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }

        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = title.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet title cannot contain '{}'",
                c
            )));
        }

        if self.title_in_use(title, exclude_index) {
            return Err(Error::DuplicateSheetName(title.into()));
        }

        Ok(())
    }

    /// Generate a unique sheet title
    fn generate_sheet_name(&self) -> String {
        let mut n = self.worksheets.len() + 1;
        loop {
            let name = format!("Sheet{}", n);
            if !self.title_in_use(&name, None) {
                return name;
            }
            n += 1;
        }
    }

    /// Rebuild worksheet overrides and relationships from the sheet sequence.
    ///
    /// Worksheet relationships come first (`rId1..rIdN` in sheet order);
    /// other relationships keep their relative order after them.
    fn sync_package(&mut self) {
        self.manifest.remove_overrides_of_type(content_type::WORKSHEET);

        let others: Vec<Relationship> = self
            .relationships
            .iter()
            .filter(|r| r.rel_type != RelationshipType::Worksheet)
            .cloned()
            .collect();
        self.relationships.clear();

        for ordinal in 1..=self.worksheets.len() {
            self.manifest
                .register_override(&part_name::worksheet(ordinal), content_type::WORKSHEET);
            self.relationships.create(
                RelationshipType::Worksheet,
                part_name::worksheet_target(ordinal),
            );
        }

        for mut relationship in others {
            relationship.id = self.relationships.next_id();
            self.relationships.add(relationship);
        }
    }

    // === Properties ===

    pub fn properties(&self) -> &DocumentProperties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut DocumentProperties {
        &mut self.properties
    }

    pub fn calendar(&self) -> Calendar {
        self.properties.calendar
    }

    /// Select the date epoch; fails once date cells have been written
    pub fn set_calendar(&mut self, calendar: Calendar) -> Result<()> {
        if calendar == self.properties.calendar {
            return Ok(());
        }
        if self.has_date_cells {
            return Err(Error::CalendarLocked);
        }
        self.properties.calendar = calendar;
        Ok(())
    }

    /// Write a date/time into a cell as a serial number of the workbook calendar
    pub fn set_date_value(
        &mut self,
        sheet: usize,
        reference: &str,
        value: NaiveDateTime,
    ) -> Result<()> {
        let serial = self.properties.calendar.to_serial(value)?;
        let count = self.worksheets.len();
        let ws = self
            .worksheets
            .get_mut(sheet)
            .ok_or(Error::SheetOutOfBounds(sheet, count))?;
        ws.set_value(reference, serial)?;
        self.has_date_cells = true;
        Ok(())
    }

    /// Read a numeric cell as a date/time of the workbook calendar
    pub fn date_value(&self, sheet: usize, reference: &str) -> Result<NaiveDateTime> {
        let ws = self
            .worksheets
            .get(sheet)
            .ok_or(Error::SheetOutOfBounds(sheet, self.worksheets.len()))?;
        match ws.value(reference)? {
            CellValue::Number(serial) => self.properties.calendar.from_serial(*serial),
            other => Err(Error::other(format!(
                "{} holds a {} value, not a date",
                reference,
                other.type_name()
            ))),
        }
    }

    // === Named Ranges ===

    pub fn named_ranges(&self) -> &NamedRangeCollection {
        &self.named_ranges
    }

    pub fn named_ranges_mut(&mut self) -> &mut NamedRangeCollection {
        &mut self.named_ranges
    }

    /// Bind a workbook-scoped name to a range on the sheet at `sheet`
    pub fn create_named_range(
        &mut self,
        name: &str,
        sheet: usize,
        range: RangeReference,
    ) -> Result<()> {
        let id = self
            .worksheets
            .get(sheet)
            .map(Worksheet::id)
            .ok_or(Error::SheetOutOfBounds(sheet, self.worksheets.len()))?;
        self.named_ranges
            .define_or_update(NamedRange::single(name, id, range));
        Ok(())
    }

    /// First area of a workbook-scoped name
    pub fn named_range(&self, name: &str) -> Result<NamedRangeTarget> {
        self.named_ranges.first_target(name).copied()
    }

    pub fn remove_named_range(&mut self, name: &str) -> Result<NamedRange> {
        self.named_ranges
            .remove(name)
            .ok_or_else(|| Error::NotFound(format!("named range '{}'", name)))
    }

    /// `'Title'!$A$1:$B$2` form of a named-range area
    pub fn format_target(&self, target: &NamedRangeTarget) -> Result<String> {
        let ws = self
            .sheet_by_id(target.sheet)
            .ok_or_else(|| Error::NotFound(format!("sheet id {}", target.sheet)))?;
        Ok(format!(
            "'{}'!{}",
            ws.title().replace('\'', "''"),
            format_absolute(target.range)
        ))
    }

    // === Package ===

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn manifest_mut(&mut self) -> &mut Manifest {
        &mut self.manifest
    }

    /// Relationships of the workbook part
    pub fn relationships(&self) -> &RelationshipGraph {
        &self.relationships
    }

    pub fn relationships_mut(&mut self) -> &mut RelationshipGraph {
        &mut self.relationships
    }

    /// Raw stylesheet bytes carried over from a loaded package
    pub fn stylesheet(&self) -> Option<&[u8]> {
        self.stylesheet.as_deref()
    }

    pub fn set_stylesheet(&mut self, stylesheet: Option<Vec<u8>>) {
        self.stylesheet = stylesheet;
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

/// Absolute form of a range; a single cell is written without a colon
fn format_absolute(range: RangeReference) -> String {
    let absolute = range.make_absolute();
    if range.top_left().same_cell(&range.bottom_right()) {
        absolute.top_left().to_string()
    } else {
        absolute.to_string()
    }
}

/// Parse `'Title'!$A$1:$B$2` (or `Title!A1`) into its sheet title and range
pub fn parse_sheet_range(text: &str) -> Result<(String, RangeReference)> {
    let (sheet, range) = text
        .rsplit_once('!')
        .ok_or_else(|| Error::parse(format!("missing '!' in '{}'", text)))?;

    let sheet = match sheet.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(quoted) => quoted.replace("''", "'"),
        None => sheet.to_string(),
    };

    Ok((sheet, RangeReference::parse(range)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_workbook() {
        let wb = Workbook::new();
        assert_eq!(wb.sheet_count(), 1);
        assert_eq!(wb.sheet_titles(), vec!["Sheet1"]);
        assert_eq!(wb.calendar(), Calendar::Windows1900);
    }

    #[test]
    fn test_create_sheets() {
        let mut wb = Workbook::new();
        wb.create_sheet();
        wb.create_sheet_with_title("Data").unwrap();
        assert_eq!(wb.sheet_titles(), vec!["Sheet1", "Sheet2", "Data"]);
        assert_eq!(wb.index_of("Data"), Some(2));

        let id = wb.sheet(2).unwrap().id();
        assert_eq!(wb.sheet_by_id(id).unwrap().title(), "Data");
    }

    #[test]
    fn test_duplicate_title() {
        let mut wb = Workbook::new();
        assert!(matches!(
            wb.create_sheet_with_title("sheet1"),
            Err(Error::DuplicateSheetName(_))
        ));
    }

    #[test]
    fn test_invalid_sheet_title() {
        let mut wb = Workbook::new();
        assert!(wb.create_sheet_with_title("").is_err());
        assert!(wb.create_sheet_with_title("a/b").is_err());
        assert!(wb.create_sheet_with_title(&"x".repeat(32)).is_err());
    }

    #[test]
    fn test_unique_sheet_name() {
        let mut wb = Workbook::empty();
        wb.create_sheet_with_title("Sheet").unwrap();
        wb.create_sheet_with_title("Sheet1").unwrap();

        assert_eq!(wb.unique_sheet_name("Sheet"), "Sheet2");
        assert_eq!(wb.unique_sheet_name("Other"), "Other");
    }

    #[test]
    fn test_package_tracks_sheets() {
        let mut wb = Workbook::new();
        wb.create_sheet_with_title("Second").unwrap();
        wb.create_sheet_with_title("Third").unwrap();
        wb.remove_sheet(0).unwrap();

        let sheets: Vec<_> = wb
            .manifest()
            .parts_with_type(content_type::WORKSHEET)
            .collect();
        assert_eq!(
            sheets,
            ["/xl/worksheets/sheet1.xml", "/xl/worksheets/sheet2.xml"]
        );

        let rels: Vec<_> = wb
            .relationships()
            .iter()
            .map(|r| (r.id.as_str(), r.target.as_str()))
            .collect();
        assert_eq!(
            rels,
            [
                ("rId1", "worksheets/sheet1.xml"),
                ("rId2", "worksheets/sheet2.xml"),
                ("rId3", "styles.xml"),
            ]
        );
    }

    #[test]
    fn test_remove_sheet_out_of_bounds() {
        let mut wb = Workbook::new();
        assert!(matches!(wb.remove_sheet(3), Err(Error::SheetOutOfBounds(3, 1))));
    }

    #[test]
    fn test_remove_sheet_drops_named_ranges() {
        let mut wb = Workbook::new();
        wb.create_sheet_with_title("Other").unwrap();
        let range = RangeReference::parse("A1:B2").unwrap();
        wb.create_named_range("Block", 0, range).unwrap();

        let target = wb.named_range("block").unwrap();
        assert_eq!(wb.format_target(&target).unwrap(), "'Sheet1'!$A$1:$B$2");

        wb.remove_sheet(0).unwrap();
        assert!(matches!(wb.named_range("Block"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_rename_sheet() {
        let mut wb = Workbook::new();
        wb.create_sheet_with_title("Other").unwrap();
        wb.rename_sheet(0, "Renamed").unwrap();
        assert!(wb.rename_sheet(0, "other").is_err());
        assert!(wb.rename_sheet(0, "renamed").is_ok());
    }

    #[test]
    fn test_date_values_lock_calendar() {
        let mut wb = Workbook::new();
        wb.set_calendar(Calendar::Mac1904).unwrap();

        let when = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        wb.set_date_value(0, "A1", when).unwrap();
        assert_eq!(wb.date_value(0, "A1").unwrap(), when);

        assert!(matches!(
            wb.set_calendar(Calendar::Windows1900),
            Err(Error::CalendarLocked)
        ));
        assert!(wb.set_calendar(Calendar::Mac1904).is_ok());
    }

    #[test]
    fn test_parse_sheet_range() {
        let (title, range) = parse_sheet_range("'My ''Data'''!$A$1:$B$5").unwrap();
        assert_eq!(title, "My 'Data'");
        assert_eq!(range.to_string(), "$A$1:$B$5");

        let (title, range) = parse_sheet_range("Sheet1!C3").unwrap();
        assert_eq!(title, "Sheet1");
        assert_eq!(range, RangeReference::parse("C3").unwrap());

        assert!(parse_sheet_range("C3").is_err());
    }
}
