//! `xl/workbook.xml`: sheet list, defined names and the worksheet inventory
//!
//! Three independently keyed stores describe a package's worksheets: the
//! manifest knows which parts are typed as worksheets, the workbook
//! relationships map ids to targets, and the workbook part lists
//! `(relationship id, title)` pairs in display order. [`detect_worksheets`]
//! joins them.

use log::warn;
use tabula_core::manifest::content_type;
use tabula_core::{Manifest, RelationshipGraph, RelationshipType, SheetState, Workbook};

use crate::constants::{namespace, FILTER_DATABASE};
use crate::error::{XlsxError, XlsxResult};
use crate::relationships::resolve_target;
use crate::xml::{XmlDocument, XmlNode};

/// One `<sheet>` entry of the workbook part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    /// Relationship id (`r:id`)
    pub relationship_id: String,
    pub title: String,
    pub state: SheetState,
}

impl SheetEntry {
    pub fn new(relationship_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            relationship_id: relationship_id.into(),
            title: title.into(),
            state: SheetState::Visible,
        }
    }
}

/// One `<definedName>` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinedName {
    pub name: String,
    /// Index into the sheet list when the name is sheet-scoped
    pub local_sheet_id: Option<usize>,
    pub hidden: bool,
    pub comment: Option<String>,
    /// Formula text, e.g. `'Data'!$A$1:$B$4`
    pub value: String,
}

/// The decoded workbook part
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookPart {
    pub sheets: Vec<SheetEntry>,
    pub date1904: bool,
    pub defined_names: Vec<DefinedName>,
}

fn is_true(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Decode the workbook part
pub fn read_workbook_part(bytes: &[u8]) -> XlsxResult<WorkbookPart> {
    let doc = XmlDocument::parse(bytes)?;
    let root = doc.root();
    let mut part = WorkbookPart::default();

    part.date1904 = root
        .child("workbookPr")
        .and_then(|n| n.attribute("date1904"))
        .map_or(false, is_true);

    if let Some(sheets) = root.child("sheets") {
        for node in sheets.children_named("sheet") {
            let relationship_id = sheet_relationship_id(&doc, sheets, node);
            let title = node.attribute("name");
            let (Some(relationship_id), Some(title)) = (relationship_id, title) else {
                warn!("Skipping <sheet> without r:id or name");
                continue;
            };
            let state = node
                .attribute("state")
                .and_then(SheetState::parse)
                .unwrap_or_default();
            part.sheets.push(SheetEntry {
                relationship_id: relationship_id.to_string(),
                title: title.to_string(),
                state,
            });
        }
    }

    if let Some(names) = root.child("definedNames") {
        for node in names.children_named("definedName") {
            let Some(name) = node.attribute("name") else {
                continue;
            };
            let local_sheet_id = match node.attribute("localSheetId") {
                Some(id) => Some(id.parse::<usize>().map_err(|_| {
                    XlsxError::Parse(format!("invalid localSheetId '{}' on '{}'", id, name))
                })?),
                None => None,
            };
            part.defined_names.push(DefinedName {
                name: name.to_string(),
                local_sheet_id,
                hidden: node.attribute("hidden").map_or(false, is_true),
                comment: node.attribute("comment").map(str::to_string),
                value: node.text().trim().to_string(),
            });
        }
    }

    Ok(part)
}

/// A `<sheet>`'s relationship id, under whichever prefix binds the
/// relationships namespace
fn sheet_relationship_id<'a>(
    doc: &'a XmlDocument,
    sheets: &'a XmlNode,
    node: &'a XmlNode,
) -> Option<&'a str> {
    let bound = node.attributes().find(|(key, _)| {
        key.split_once(':').map_or(false, |(prefix, local)| {
            local == "id"
                && prefix != "xmlns"
                && matches!(
                    doc.resolve_prefix(&[node, sheets], prefix),
                    Some(namespace::RELATIONSHIPS | namespace::RELATIONSHIPS_STRICT)
                )
        })
    });
    bound.map(|(_, value)| value).or_else(|| node.attribute("r:id"))
}

/// Resolve the declared sheet list to `(target, title)` pairs.
///
/// Pairs keep the sheet-list order. A relationship id missing from
/// `relationships` fails the whole resolution; a target the manifest does not
/// type as a worksheet is left out.
pub fn detect_worksheets(
    manifest: &Manifest,
    relationships: &RelationshipGraph,
    sheets: &[SheetEntry],
    workbook_part: &str,
) -> XlsxResult<Vec<(String, String)>> {
    let candidates: Vec<&str> = manifest.parts_with_type(content_type::WORKSHEET).collect();

    let mut inventory = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let relationship = relationships.get(&sheet.relationship_id).ok_or_else(|| {
            XlsxError::DanglingRelationship {
                id: sheet.relationship_id.clone(),
                title: sheet.title.clone(),
            }
        })?;

        let part = resolve_target(workbook_part, &relationship.target);
        if candidates.contains(&part.as_str()) {
            inventory.push((relationship.target.clone(), sheet.title.clone()));
        } else {
            warn!(
                "Sheet '{}' ({}) is not typed as a worksheet; skipped",
                sheet.title, part
            );
        }
    }

    Ok(inventory)
}

/// 1-based ordinal from the trailing digits of a target's file stem
/// (`worksheets/sheet12.xml` → 12)
pub fn sheet_ordinal(target: &str) -> XlsxResult<usize> {
    let file = target.rsplit('/').next().unwrap_or(target);
    let stem = file.split('.').next().unwrap_or(file);
    let digits_start = stem
        .rfind(|c: char| !c.is_ascii_digit())
        .map_or(0, |i| i + 1);

    stem[digits_start..]
        .parse::<usize>()
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| {
            XlsxError::InvalidFormat(format!("worksheet target '{}' has no sheet number", target))
        })
}

/// Encode the workbook part.
///
/// Fails with [`XlsxError::NoVisibleSheets`] unless at least one sheet is
/// visible.
pub fn write_workbook_part(workbook: &Workbook) -> XlsxResult<XmlDocument> {
    let first_visible = workbook
        .sheets()
        .position(|ws| ws.is_visible())
        .ok_or(XlsxError::NoVisibleSheets)?;

    let mut doc = XmlDocument::new("workbook");
    doc.add_namespace("", namespace::SPREADSHEETML)
        .add_namespace("r", namespace::RELATIONSHIPS);

    let root = doc.root_mut();
    root.add_child("fileVersion")
        .add_attribute("appName", "xl")
        .add_attribute("lastEdited", "4")
        .add_attribute("lowestEdited", "4")
        .add_attribute("rupBuild", "4505");

    root.add_child("workbookPr")
        .add_attribute("codeName", "ThisWorkbook")
        .add_attribute("defaultThemeVersion", "124226")
        .add_attribute("date1904", if workbook.calendar().is_1904() { "1" } else { "0" });

    root.add_child("bookViews")
        .add_child("workbookView")
        .add_attribute("activeTab", first_visible.to_string())
        .add_attribute("autoFilterDateGrouping", "1")
        .add_attribute("firstSheet", first_visible.to_string())
        .add_attribute("minimized", "0")
        .add_attribute("showHorizontalScroll", "1")
        .add_attribute("showSheetTabs", "1")
        .add_attribute("showVerticalScroll", "1")
        .add_attribute("tabRatio", "600")
        .add_attribute("visibility", "visible");

    let mut sheets = XmlNode::new("sheets");
    let mut defined_names = XmlNode::new("definedNames");

    for relationship in workbook.relationships().of_type(&RelationshipType::Worksheet) {
        let ordinal = sheet_ordinal(&relationship.target)?;
        let index = ordinal - 1;
        let ws = workbook.sheet(index).ok_or_else(|| {
            XlsxError::InvalidFormat(format!(
                "relationship {} targets sheet {} but the workbook has {}",
                relationship.id,
                ordinal,
                workbook.sheet_count()
            ))
        })?;

        let sheet = sheets.add_child("sheet");
        sheet
            .add_attribute("name", ws.title())
            .add_attribute("sheetId", ordinal.to_string())
            .add_attribute("r:id", relationship.id.as_str());
        if !ws.is_visible() {
            sheet.add_attribute("state", ws.sheet_state().as_str());
        }

        if ws.has_auto_filter() {
            defined_names
                .add_child("definedName")
                .add_attribute("name", FILTER_DATABASE)
                .add_attribute("hidden", "1")
                .add_attribute("localSheetId", index.to_string())
                .set_text(format!(
                    "'{}'!{}",
                    ws.title().replace('\'', "''"),
                    ws.auto_filter().make_absolute()
                ));
        }
    }

    for named in workbook.named_ranges().iter() {
        if let Some(node) = defined_name_node(workbook, named, None)? {
            defined_names.push_child(node);
        }
    }
    for (index, ws) in workbook.sheets().enumerate() {
        for named in ws.named_ranges().iter() {
            if let Some(node) = defined_name_node(workbook, named, Some(index))? {
                defined_names.push_child(node);
            }
        }
    }

    root.push_child(sheets);
    if !defined_names.children().is_empty() {
        root.push_child(defined_names);
    }

    root.add_child("calcPr")
        .add_attribute("calcId", "124519")
        .add_attribute("calcMode", "auto")
        .add_attribute("fullCalcOnLoad", "1");

    Ok(doc)
}

fn defined_name_node(
    workbook: &Workbook,
    named: &tabula_core::NamedRange,
    local_sheet_id: Option<usize>,
) -> XlsxResult<Option<XmlNode>> {
    if named.targets().is_empty() {
        return Ok(None);
    }

    let areas = named
        .targets()
        .iter()
        .map(|target| workbook.format_target(target))
        .collect::<tabula_core::Result<Vec<_>>>()?;

    let mut node = XmlNode::new("definedName");
    node.add_attribute("name", named.name());
    if let Some(id) = local_sheet_id {
        node.add_attribute("localSheetId", id.to_string());
    }
    if named.hidden {
        node.add_attribute("hidden", "1");
    }
    if let Some(comment) = &named.comment {
        node.add_attribute("comment", comment.as_str());
    }
    node.set_text(areas.join(","));

    Ok(Some(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabula_core::{RangeReference, Relationship};

    fn inventory_fixture() -> (Manifest, RelationshipGraph, Vec<SheetEntry>) {
        let mut manifest = Manifest::with_package_defaults();
        manifest.register_override("/xl/worksheets/sheet1.xml", content_type::WORKSHEET);

        let mut relationships = RelationshipGraph::new();
        relationships.add(Relationship::new(
            "rId1",
            RelationshipType::Worksheet,
            "worksheets/sheet1.xml",
        ));

        (manifest, relationships, vec![SheetEntry::new("rId1", "Data")])
    }

    #[test]
    fn test_detect_worksheets() {
        let (manifest, relationships, sheets) = inventory_fixture();
        let inventory =
            detect_worksheets(&manifest, &relationships, &sheets, "/xl/workbook.xml").unwrap();
        assert_eq!(
            inventory,
            vec![("worksheets/sheet1.xml".to_string(), "Data".to_string())]
        );
    }

    #[test]
    fn test_detect_worksheets_skips_untyped_parts() {
        let (mut manifest, relationships, sheets) = inventory_fixture();
        manifest.remove_override("/xl/worksheets/sheet1.xml");

        let inventory =
            detect_worksheets(&manifest, &relationships, &sheets, "/xl/workbook.xml").unwrap();
        assert!(inventory.is_empty());
    }

    #[test]
    fn test_detect_worksheets_dangling_relationship() {
        let (manifest, mut relationships, sheets) = inventory_fixture();
        relationships.remove("rId1");

        let err = detect_worksheets(&manifest, &relationships, &sheets, "/xl/workbook.xml")
            .unwrap_err();
        assert!(matches!(
            err,
            XlsxError::DanglingRelationship { ref id, ref title } if id == "rId1" && title == "Data"
        ));
    }

    #[test]
    fn test_detect_worksheets_keeps_sheet_list_order() {
        let mut manifest = Manifest::new();
        manifest.register_override("/xl/worksheets/sheet1.xml", content_type::WORKSHEET);
        manifest.register_override("/xl/worksheets/sheet2.xml", content_type::WORKSHEET);

        let mut relationships = RelationshipGraph::new();
        relationships.create(RelationshipType::Worksheet, "worksheets/sheet1.xml");
        relationships.create(RelationshipType::Worksheet, "/xl/worksheets/sheet2.xml");
        relationships.create(RelationshipType::Worksheet, "chartsheets/sheet1.xml");

        let sheets = vec![
            SheetEntry::new("rId2", "Second"),
            SheetEntry::new("rId3", "Chart"),
            SheetEntry::new("rId1", "First"),
        ];
        let inventory =
            detect_worksheets(&manifest, &relationships, &sheets, "/xl/workbook.xml").unwrap();
        let titles: Vec<_> = inventory.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(titles, ["Second", "First"]);
    }

    #[test]
    fn test_sheet_ordinal() {
        assert_eq!(sheet_ordinal("worksheets/sheet1.xml").unwrap(), 1);
        assert_eq!(sheet_ordinal("/xl/worksheets/sheet12.xml").unwrap(), 12);
        assert_eq!(sheet_ordinal("data42.xml").unwrap(), 42);
        assert!(sheet_ordinal("worksheets/summary.xml").is_err());
        assert!(sheet_ordinal("worksheets/sheet0.xml").is_err());
    }

    #[test]
    fn test_write_requires_visible_sheet() {
        let mut wb = Workbook::new();
        wb.create_sheet();
        for ws in wb.sheets_mut() {
            ws.set_sheet_state(SheetState::Hidden);
        }
        assert!(matches!(
            write_workbook_part(&wb),
            Err(XlsxError::NoVisibleSheets)
        ));

        wb.sheet_mut(1).unwrap().set_sheet_state(SheetState::Visible);
        let doc = write_workbook_part(&wb).unwrap();
        let view = doc.root().child("bookViews").unwrap().child("workbookView").unwrap();
        assert_eq!(view.attribute("activeTab"), Some("1"));
    }

    #[test]
    fn test_write_sheets_and_filter_database() {
        let mut wb = Workbook::new();
        wb.create_sheet_with_title("My Data").unwrap();
        {
            let ws = wb.sheet_mut(1).unwrap();
            ws.set_auto_filter(RangeReference::parse("A1:C10").unwrap());
            ws.set_sheet_state(SheetState::VeryHidden);
        }

        let doc = write_workbook_part(&wb).unwrap();
        let root = doc.root();

        let order: Vec<_> = root.children().iter().map(|n| n.name()).collect();
        assert_eq!(
            order,
            ["fileVersion", "workbookPr", "bookViews", "sheets", "definedNames", "calcPr"]
        );

        let sheets: Vec<_> = root
            .child("sheets")
            .unwrap()
            .children()
            .iter()
            .map(|s| {
                (
                    s.attribute("name").unwrap(),
                    s.attribute("sheetId").unwrap(),
                    s.attribute("r:id").unwrap(),
                    s.attribute("state"),
                )
            })
            .collect();
        assert_eq!(
            sheets,
            [
                ("Sheet1", "1", "rId1", None),
                ("My Data", "2", "rId2", Some("veryHidden")),
            ]
        );

        let name = root.child("definedNames").unwrap().child("definedName").unwrap();
        assert_eq!(name.attribute("name"), Some("_xlnm._FilterDatabase"));
        assert_eq!(name.attribute("hidden"), Some("1"));
        assert_eq!(name.attribute("localSheetId"), Some("1"));
        assert_eq!(name.text(), "'My Data'!$A$1:$C$10");
    }

    #[test]
    fn test_write_omits_unset_filter_and_empty_names() {
        let wb = Workbook::new();
        let doc = write_workbook_part(&wb).unwrap();
        assert!(doc.root().child("definedNames").is_none());
        assert_eq!(
            doc.root().child("workbookPr").unwrap().attribute("date1904"),
            Some("0")
        );
    }

    #[test]
    fn test_user_names_roundtrip_through_part() {
        let mut wb = Workbook::new();
        wb.create_named_range("Totals", 0, RangeReference::parse("B2:B9").unwrap())
            .unwrap();
        wb.sheet_mut(0)
            .unwrap()
            .create_named_range("Local", RangeReference::parse("C3").unwrap());

        let xml = write_workbook_part(&wb).unwrap().to_xml_string();
        let part = read_workbook_part(xml.as_bytes()).unwrap();

        assert_eq!(part.sheets, vec![SheetEntry::new("rId1", "Sheet1")]);
        assert_eq!(
            part.defined_names,
            vec![
                DefinedName {
                    name: "Totals".to_string(),
                    local_sheet_id: None,
                    hidden: false,
                    comment: None,
                    value: "'Sheet1'!$B$2:$B$9".to_string(),
                },
                DefinedName {
                    name: "Local".to_string(),
                    local_sheet_id: Some(0),
                    hidden: false,
                    comment: None,
                    value: "'Sheet1'!$C$3".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_read_workbook_part() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<x:workbook xmlns:x="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <x:workbookPr date1904="true"/>
    <x:sheets>
        <x:sheet name="Visible" sheetId="1" r:id="rId1"/>
        <x:sheet name="Secret" sheetId="2" state="hidden" r:id="rId2"/>
    </x:sheets>
    <x:definedNames>
        <x:definedName name="_xlnm._FilterDatabase" localSheetId="0" hidden="1">Visible!$A$1:$B$3</x:definedName>
    </x:definedNames>
</x:workbook>"#;

        let part = read_workbook_part(xml).unwrap();
        assert!(part.date1904);
        assert_eq!(part.sheets.len(), 2);
        assert_eq!(part.sheets[1].state, SheetState::Hidden);
        assert_eq!(part.defined_names[0].local_sheet_id, Some(0));
        assert!(part.defined_names[0].hidden);
        assert_eq!(part.defined_names[0].value, "Visible!$A$1:$B$3");
    }

    #[test]
    fn test_read_sheet_ids_under_any_prefix() {
        let xml = br#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:rel="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <sheets>
        <sheet name="Data" sheetId="1" rel:id="rId7"/>
        <sheet xmlns:s="http://purl.oclc.org/ooxml/officeDocument/relationships" name="Strict" sheetId="2" s:id="rId8"/>
    </sheets>
</workbook>"#;

        let part = read_workbook_part(xml).unwrap();
        assert_eq!(
            part.sheets,
            vec![SheetEntry::new("rId7", "Data"), SheetEntry::new("rId8", "Strict")]
        );
    }

    #[test]
    fn test_foreign_id_attribute_is_not_a_relationship() {
        let xml = br#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:o="urn:other">
    <sheets>
        <sheet name="Data" sheetId="1" o:id="nope" r:id="rId1"/>
    </sheets>
</workbook>"#;

        let part = read_workbook_part(xml).unwrap();
        assert_eq!(part.sheets[0].relationship_id, "rId1");
    }
}
