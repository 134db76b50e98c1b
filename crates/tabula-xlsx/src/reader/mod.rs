//! XLSX reader

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use log::{debug, warn};
use tabula_core::manifest::{content_type, part_name};
use tabula_core::workbook::parse_sheet_range;
use tabula_core::{Calendar, Manifest, NamedRange, RelationshipGraph, RelationshipType, Workbook};

use crate::archive::ArchiveRead;
use crate::constants::{BUILTIN_NAME_PREFIX, DEFAULT_SHARED_STRINGS, PACKAGE_ROOT};
use crate::content_types::read_content_types;
use crate::error::{XlsxError, XlsxResult};
use crate::options::ReadOptions;
use crate::properties::{
    determine_document_type, read_app_properties, read_core_properties, DocumentType,
};
use crate::relationships::{read_relationships, relationships_part, resolve_target};
use crate::shared_strings::read_shared_strings;
use crate::workbook_part::{detect_worksheets, read_workbook_part, DefinedName, WorkbookPart};
use crate::worksheet_part::read_worksheet;
use crate::xml::XmlDocument;

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(file)
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        Self::read_with(reader, &ReadOptions::default())
    }

    /// Read a workbook from a reader with explicit options
    pub fn read_with<R: Read + Seek>(reader: R, options: &ReadOptions) -> XlsxResult<Workbook> {
        let mut archive = zip::ZipArchive::new(reader)?;
        Self::read_archive(&mut archive, options)
    }

    /// Read a workbook from any package archive
    pub fn read_archive<A: ArchiveRead>(
        archive: &mut A,
        options: &ReadOptions,
    ) -> XlsxResult<Workbook> {
        // Verify this is an OOXML package
        let manifest = match archive.read_optional(part_name::CONTENT_TYPES)? {
            Some(bytes) => read_content_types(&bytes)?,
            None => {
                return Err(XlsxError::InvalidFormat(
                    "Missing [Content_Types].xml".into(),
                ))
            }
        };

        let package_relationships = Self::read_relationships_of(archive, PACKAGE_ROOT)?;
        let main_part = package_relationships
            .of_type(&RelationshipType::OfficeDocument)
            .next()
            .map(|r| resolve_target(PACKAGE_ROOT, &r.target))
            .unwrap_or_else(|| part_name::WORKBOOK.to_string());

        let document_type = determine_document_type(&manifest, &main_part);
        if document_type != DocumentType::Spreadsheet {
            return Err(XlsxError::UnsupportedDocument(format!(
                "{} ({})",
                document_type, main_part
            )));
        }

        debug!("Reading part {}", main_part);
        let part = read_workbook_part(&archive.read(&main_part)?)?;
        let workbook_relationships = Self::read_relationships_of(archive, &main_part)?;
        let inventory =
            detect_worksheets(&manifest, &workbook_relationships, &part.sheets, &main_part)?;

        let shared_strings =
            Self::read_shared_strings_of(archive, &workbook_relationships, &main_part)?;

        let mut workbook = Workbook::empty();
        if part.date1904 {
            workbook.set_calendar(Calendar::Mac1904)?;
        }

        if let Some(styles) = workbook_relationships.of_type(&RelationshipType::Styles).next() {
            let styles_part = resolve_target(&main_part, &styles.target);
            debug!("Reading part {}", styles_part);
            workbook.set_stylesheet(archive.read_optional(&styles_part)?);
        }

        for (target, title) in &inventory {
            let sheet_part = resolve_target(&main_part, target);
            debug!("Reading part {} as '{}'", sheet_part, title);
            let bytes = archive.read(&sheet_part)?;
            let sheet_relationships = Self::read_relationships_of(archive, &sheet_part)?;

            let state = part
                .sheets
                .iter()
                .find(|s| &s.title == title)
                .map(|s| s.state)
                .unwrap_or_default();

            let worksheet = workbook.create_sheet_with_title(title)?;
            worksheet.set_sheet_state(state);
            read_worksheet(&bytes, worksheet, &shared_strings)?;
            for relationship in sheet_relationships.iter() {
                worksheet.add_relationship(relationship.clone());
            }
            if options.collect_garbage {
                worksheet.collect_garbage();
            }
        }

        Self::import_package_state(&mut workbook, &manifest, &workbook_relationships, &main_part);
        Self::apply_defined_names(&mut workbook, &part);

        if let Some(core) = package_relationships
            .of_type(&RelationshipType::CoreProperties)
            .next()
        {
            let core_part = resolve_target(PACKAGE_ROOT, &core.target);
            if let Some(bytes) = archive.read_optional(&core_part)? {
                debug!("Reading part {}", core_part);
                read_core_properties(&XmlDocument::parse(&bytes)?, workbook.properties_mut())?;
            }
        }

        if let Some(app) = package_relationships
            .of_type(&RelationshipType::ExtendedProperties)
            .next()
        {
            let app_part = resolve_target(PACKAGE_ROOT, &app.target);
            if let Some(bytes) = archive.read_optional(&app_part)? {
                let app = read_app_properties(&XmlDocument::parse(&bytes)?);
                debug!(
                    "Package written by {} {}",
                    app.application.as_deref().unwrap_or("unknown application"),
                    app.app_version.as_deref().unwrap_or("")
                );
            }
        }

        // Ensure at least one sheet exists
        if workbook.is_empty() {
            workbook.create_sheet();
        }

        Ok(workbook)
    }

    /// Relationships of `source`; an absent relationships part is an empty graph
    fn read_relationships_of<A: ArchiveRead>(
        archive: &mut A,
        source: &str,
    ) -> XlsxResult<RelationshipGraph> {
        let rels_part = relationships_part(source);
        match archive.read_optional(&rels_part)? {
            Some(bytes) => {
                debug!("Reading part {}", rels_part);
                read_relationships(&bytes)
            }
            None => Ok(RelationshipGraph::new()),
        }
    }

    /// Carry over the package state the model does not regenerate.
    ///
    /// Worksheet overrides and relationships are rebuilt from the sheet
    /// sequence, and the main part and styles keep the model's own entries;
    /// every other default, override and workbook relationship is kept.
    /// Workbook relationship ids are renumbered after the worksheets.
    fn import_package_state(
        workbook: &mut Workbook,
        manifest: &Manifest,
        relationships: &RelationshipGraph,
        main_part: &str,
    ) {
        for (extension, ct) in manifest.defaults() {
            if workbook.manifest().default_type(extension).is_none() {
                workbook.manifest_mut().register_default(extension, ct);
            }
        }

        for (part, ct) in manifest.overrides() {
            if ct == content_type::WORKSHEET
                || part == main_part
                || workbook.manifest().has_override(part)
            {
                continue;
            }
            workbook.manifest_mut().register_override(part, ct);
        }

        for relationship in relationships.iter() {
            if matches!(
                relationship.rel_type,
                RelationshipType::Worksheet | RelationshipType::Styles
            ) {
                continue;
            }
            let mut relationship = relationship.clone();
            relationship.id = workbook.relationships().next_id();
            workbook.relationships_mut().add(relationship);
        }
    }

    fn read_shared_strings_of<A: ArchiveRead>(
        archive: &mut A,
        relationships: &RelationshipGraph,
        main_part: &str,
    ) -> XlsxResult<Vec<String>> {
        let strings_part = relationships
            .of_type(&RelationshipType::SharedStrings)
            .next()
            .map(|r| resolve_target(main_part, &r.target))
            .unwrap_or_else(|| DEFAULT_SHARED_STRINGS.to_string());

        // No shared strings is valid
        match archive.read_optional(&strings_part)? {
            Some(bytes) => {
                debug!("Reading part {}", strings_part);
                read_shared_strings(&bytes)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Attach user-defined names to the workbook or to their local sheet.
    ///
    /// Built-in names are skipped, as are names whose areas cannot be
    /// resolved to loaded sheets.
    fn apply_defined_names(workbook: &mut Workbook, part: &WorkbookPart) {
        for defined in &part.defined_names {
            if defined.name.starts_with(BUILTIN_NAME_PREFIX) {
                continue;
            }

            let Some(named) = Self::named_range_from(workbook, defined) else {
                warn!(
                    "Skipping defined name '{}' = '{}'",
                    defined.name, defined.value
                );
                continue;
            };

            match defined.local_sheet_id {
                None => {
                    workbook.named_ranges_mut().define_or_update(named);
                }
                Some(index) => {
                    let scope = part
                        .sheets
                        .get(index)
                        .and_then(|entry| workbook.sheet_by_title_mut(&entry.title));
                    match scope {
                        Some(worksheet) => {
                            worksheet.named_ranges_mut().define_or_update(named);
                        }
                        None => warn!(
                            "Skipping defined name '{}' scoped to missing sheet {}",
                            defined.name, index
                        ),
                    }
                }
            }
        }
    }

    fn named_range_from(workbook: &Workbook, defined: &DefinedName) -> Option<NamedRange> {
        let mut named = NamedRange::new(defined.name.as_str());
        named.comment = defined.comment.clone();
        named.hidden = defined.hidden;

        for area in split_areas(&defined.value) {
            let (title, range) = parse_sheet_range(area).ok()?;
            let sheet = workbook.sheet_by_title(&title)?;
            named.add_target(sheet.id(), range);
        }

        if named.targets().is_empty() {
            None
        } else {
            Some(named)
        }
    }
}

/// Split a defined-name formula on commas outside quoted sheet titles
fn split_areas(value: &str) -> Vec<&str> {
    let mut areas = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        match c {
            '\'' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                areas.push(value[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    areas.push(value[start..].trim());

    areas.retain(|a| !a.is_empty());
    areas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Write};
    use tabula_core::{CellValue, RangeReference, SheetState};

    const CONTENT_TYPES: &str = r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;
    const ROOT_RELS: &str = r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;
    const WORKBOOK_RELS: &str = r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#;

    fn minimal_package() -> MemoryArchive {
        let mut archive = MemoryArchive::new();
        archive.insert("[Content_Types].xml", CONTENT_TYPES);
        archive.insert("_rels/.rels", ROOT_RELS);
        archive.insert("xl/workbook.xml", r#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets><definedNames><definedName name="Totals">'Data'!$B$1:$B$2,Data!$D$4</definedName><definedName name="Ghost">'Nowhere'!$A$1</definedName></definedNames></workbook>"#);
        archive.insert("xl/_rels/workbook.xml.rels", WORKBOOK_RELS);
        archive.insert("xl/sharedStrings.xml", r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><si><t>hello</t></si></sst>"#);
        archive.insert("xl/worksheets/sheet1.xml", r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1"><v>2</v></c></row></sheetData></worksheet>"#);
        archive
    }

    #[test]
    fn test_read_minimal_package() {
        let mut archive = minimal_package();
        let wb = XlsxReader::read_archive(&mut archive, &ReadOptions::default()).unwrap();

        assert_eq!(wb.sheet_titles(), vec!["Data"]);
        let ws = wb.sheet(0).unwrap();
        assert_eq!(ws.value("A1").unwrap(), &CellValue::String("hello".into()));
        assert_eq!(ws.value("B1").unwrap(), &CellValue::Number(2.0));

        let totals = wb.named_ranges().get("Totals").unwrap();
        let ranges: Vec<_> = totals.targets().iter().map(|t| t.range).collect();
        assert_eq!(
            ranges,
            vec![
                RangeReference::parse("$B$1:$B$2").unwrap(),
                RangeReference::parse("$D$4").unwrap(),
            ]
        );
        assert!(wb.named_ranges().get("Ghost").is_none());
    }

    #[test]
    fn test_read_empty_xlsx_from_zip() {
        let mut buf = Vec::new();
        {
            let cursor = Cursor::new(&mut buf);
            let mut zip = zip::ZipWriter::new(cursor);
            let options = zip::write::SimpleFileOptions::default();

            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(CONTENT_TYPES.as_bytes()).unwrap();
            zip.start_file("_rels/.rels", options).unwrap();
            zip.write_all(ROOT_RELS.as_bytes()).unwrap();
            zip.start_file("xl/workbook.xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#).unwrap();
            zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
            zip.write_all(WORKBOOK_RELS.as_bytes()).unwrap();
            zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData></sheetData></worksheet>"#).unwrap();

            zip.finish().unwrap();
        }

        let wb = XlsxReader::read(Cursor::new(buf)).unwrap();
        assert_eq!(wb.sheet_count(), 1);
        assert_eq!(wb.sheet(0).unwrap().title(), "Sheet1");
        assert!(wb.sheet(0).unwrap().is_empty());
    }

    #[test]
    fn test_sheet_relationships_and_package_parts_are_kept() {
        let mut archive = minimal_package();
        archive.insert(
            "[Content_Types].xml",
            CONTENT_TYPES.replace(
                "</Types>",
                r#"<Default Extension="png" ContentType="image/png"/><Override PartName="/xl/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/></Types>"#,
            ),
        );
        archive.insert(
            "xl/worksheets/_rels/sheet1.xml.rels",
            r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/></Relationships>"#,
        );

        let wb = XlsxReader::read_archive(&mut archive, &ReadOptions::default()).unwrap();

        let links = wb.sheet(0).unwrap().relationships();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, "rId4");
        assert_eq!(links[0].rel_type, RelationshipType::Hyperlink);
        assert_eq!(links[0].target, "https://example.com");
        assert!(links[0].external);

        assert_eq!(
            wb.manifest().override_type("/xl/theme/theme1.xml"),
            Some(content_type::THEME)
        );
        assert_eq!(wb.manifest().default_type("png"), Some("image/png"));
        assert_eq!(
            wb.manifest().override_type("/xl/worksheets/sheet1.xml"),
            Some(content_type::WORKSHEET)
        );

        let shared: Vec<_> = wb
            .relationships()
            .of_type(&RelationshipType::SharedStrings)
            .collect();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].target, "sharedStrings.xml");
        assert!(wb.relationships().get("rId1").is_some());
    }

    #[test]
    fn test_missing_content_types() {
        let mut archive = minimal_package();
        archive.remove("[Content_Types].xml");
        assert!(matches!(
            XlsxReader::read_archive(&mut archive, &ReadOptions::default()),
            Err(XlsxError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_unsupported_document() {
        let mut archive = minimal_package();
        archive.insert(
            "[Content_Types].xml",
            CONTENT_TYPES.replace(
                "spreadsheetml.sheet.main+xml",
                "wordprocessingml.document.main+xml",
            ),
        );
        let err = XlsxReader::read_archive(&mut archive, &ReadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            XlsxError::UnsupportedDocument(ref kind) if kind.starts_with("word-processing")
        ));
    }

    #[test]
    fn test_untyped_sheet_is_skipped() {
        let mut archive = minimal_package();
        archive.insert(
            "[Content_Types].xml",
            CONTENT_TYPES.replace("/xl/worksheets/sheet1.xml", "/xl/worksheets/other.xml"),
        );
        let wb = XlsxReader::read_archive(&mut archive, &ReadOptions::default()).unwrap();
        // Only the placeholder sheet remains
        assert_eq!(wb.sheet_titles(), vec!["Sheet1"]);
    }

    #[test]
    fn test_dangling_sheet_relationship() {
        let mut archive = minimal_package();
        archive.insert(
            "xl/_rels/workbook.xml.rels",
            WORKBOOK_RELS.replace("Id=\"rId1\"", "Id=\"rId9\""),
        );
        assert!(matches!(
            XlsxReader::read_archive(&mut archive, &ReadOptions::default()),
            Err(XlsxError::DanglingRelationship { .. })
        ));
    }

    #[test]
    fn test_sheet_state_and_date1904() {
        let mut archive = minimal_package();
        archive.insert("xl/workbook.xml", r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><workbookPr date1904="1"/><sheets><sheet name="Data" sheetId="1" state="hidden" r:id="rId1"/></sheets></workbook>"#);
        let wb = XlsxReader::read_archive(&mut archive, &ReadOptions::default()).unwrap();
        assert_eq!(wb.calendar(), Calendar::Mac1904);
        assert_eq!(wb.sheet(0).unwrap().sheet_state(), SheetState::Hidden);
    }

    #[test]
    fn test_split_areas() {
        assert_eq!(split_areas("'a,b'!$A$1, c!B2"), vec!["'a,b'!$A$1", "c!B2"]);
        assert_eq!(split_areas("Sheet1!A1"), vec!["Sheet1!A1"]);
        assert!(split_areas("").is_empty());
    }
}
