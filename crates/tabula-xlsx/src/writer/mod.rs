//! XLSX writer

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use log::debug;
use tabula_core::manifest::{absolute_part_name, part_name};
use tabula_core::{Relationship, RelationshipGraph, RelationshipType, Workbook};

use crate::archive::{ArchiveWrite, ZipArchiveWriter};
use crate::constants::{DEFAULT_STYLESHEET, PACKAGE_ROOT};
use crate::content_types::write_content_types;
use crate::error::{XlsxError, XlsxResult};
use crate::options::WriteOptions;
use crate::properties::{write_app_properties, write_core_properties};
use crate::relationships::{relationships_part, resolve_target, write_relationships};
use crate::workbook_part::{sheet_ordinal, write_workbook_part};
use crate::worksheet_part::write_worksheet;

/// XLSX file writer
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write a workbook to a file path
    pub fn write_file<P: AsRef<Path>>(workbook: &Workbook, path: P) -> XlsxResult<()> {
        let file = File::create(path)?;
        Self::write(workbook, file)
    }

    /// Write a workbook to a writer
    pub fn write<W: Write + Seek>(workbook: &Workbook, writer: W) -> XlsxResult<()> {
        Self::write_with(workbook, writer, &WriteOptions::default())
    }

    /// Write a workbook to a writer with explicit options
    pub fn write_with<W: Write + Seek>(
        workbook: &Workbook,
        writer: W,
        options: &WriteOptions,
    ) -> XlsxResult<()> {
        let mut zip = ZipArchiveWriter::new(writer, options.compression);
        Self::write_archive(workbook, &mut zip, options)?;
        zip.finish()?;
        Ok(())
    }

    /// Write every part of the package into `archive`.
    ///
    /// Nothing is written when the workbook cannot be saved. Content-type
    /// overrides and workbook relationships are limited to the parts written
    /// here (and external targets).
    pub fn write_archive<A: ArchiveWrite>(
        workbook: &Workbook,
        archive: &mut A,
        options: &WriteOptions,
    ) -> XlsxResult<()> {
        let mut parts: Vec<(String, Vec<u8>)> = Vec::new();

        // xl/workbook.xml
        let workbook_xml = write_workbook_part(workbook)?.to_xml_string();
        parts.push((part_name::WORKBOOK.to_string(), workbook_xml.into_bytes()));

        // xl/styles.xml
        let styles_part = workbook
            .relationships()
            .of_type(&RelationshipType::Styles)
            .next()
            .map(|r| resolve_target(part_name::WORKBOOK, &r.target))
            .unwrap_or_else(|| part_name::STYLES.to_string());
        let stylesheet = workbook
            .stylesheet()
            .unwrap_or(DEFAULT_STYLESHEET.as_bytes());
        parts.push((styles_part, stylesheet.to_vec()));

        // Worksheets and their relationships
        for relationship in workbook.relationships().of_type(&RelationshipType::Worksheet) {
            let ordinal = sheet_ordinal(&relationship.target)?;
            let worksheet = workbook.sheet(ordinal - 1).ok_or_else(|| {
                XlsxError::InvalidFormat(format!("Sheet {} not found", ordinal))
            })?;
            let sheet_part = resolve_target(part_name::WORKBOOK, &relationship.target);

            if !worksheet.relationships().is_empty() {
                let mut graph = RelationshipGraph::new();
                for relationship in worksheet.relationships() {
                    graph.add(relationship.clone());
                }
                parts.push((
                    relationships_part(&sheet_part),
                    write_relationships(&graph).to_xml_string().into_bytes(),
                ));
            }
            parts.push((sheet_part, write_worksheet(worksheet).into_bytes()));
        }

        // docProps
        parts.push((
            part_name::CORE_PROPERTIES.to_string(),
            write_core_properties(workbook.properties())
                .to_xml_string()
                .into_bytes(),
        ));
        parts.push((
            part_name::APP_PROPERTIES.to_string(),
            write_app_properties(workbook, options)
                .to_xml_string()
                .into_bytes(),
        ));

        let written: BTreeSet<String> = parts
            .iter()
            .map(|(part, _)| absolute_part_name(part))
            .collect();

        // [Content_Types].xml
        let mut manifest = workbook.manifest().clone();
        manifest.retain_overrides(|part, _| {
            let keep = written.contains(part);
            if !keep {
                debug!("Leaving out content type of unwritten part {}", part);
            }
            keep
        });
        Self::put(
            archive,
            part_name::CONTENT_TYPES,
            write_content_types(&manifest).to_xml_string(),
        )?;

        // _rels/.rels
        Self::put(
            archive,
            &relationships_part(PACKAGE_ROOT),
            write_relationships(&Self::package_relationships()).to_xml_string(),
        )?;

        // xl/_rels/workbook.xml.rels
        let mut workbook_relationships = RelationshipGraph::new();
        for relationship in workbook.relationships().iter() {
            let target = resolve_target(part_name::WORKBOOK, &relationship.target);
            if relationship.external || written.contains(&target) {
                workbook_relationships.add(relationship.clone());
            } else {
                debug!(
                    "Leaving out relationship {} to unwritten part {}",
                    relationship.id, target
                );
            }
        }
        Self::put(
            archive,
            &relationships_part(part_name::WORKBOOK),
            write_relationships(&workbook_relationships).to_xml_string(),
        )?;

        for (part, bytes) in &parts {
            Self::put(archive, part, bytes)?;
        }

        Ok(())
    }

    fn package_relationships() -> RelationshipGraph {
        let mut graph = RelationshipGraph::new();
        for (rel_type, part) in [
            (RelationshipType::OfficeDocument, part_name::WORKBOOK),
            (RelationshipType::CoreProperties, part_name::CORE_PROPERTIES),
            (RelationshipType::ExtendedProperties, part_name::APP_PROPERTIES),
        ] {
            let id = graph.next_id();
            graph.add(Relationship::new(id, rel_type, part.trim_start_matches('/')));
        }
        graph
    }

    fn put<A: ArchiveWrite>(
        archive: &mut A,
        part: &str,
        content: impl AsRef<[u8]>,
    ) -> XlsxResult<()> {
        debug!("Writing part {}", part);
        archive.write(part, content.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveRead, MemoryArchive};
    use crate::options::Compression;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use tabula_core::manifest::content_type;
    use tabula_core::SheetState;

    #[test]
    fn test_package_entries() {
        let mut wb = Workbook::new();
        wb.create_sheet_with_title("Data").unwrap();

        let mut archive = MemoryArchive::new();
        XlsxWriter::write_archive(&wb, &mut archive, &WriteOptions::default()).unwrap();

        assert_eq!(
            archive.entries(),
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "docProps/app.xml",
                "docProps/core.xml",
                "xl/_rels/workbook.xml.rels",
                "xl/styles.xml",
                "xl/workbook.xml",
                "xl/worksheets/sheet1.xml",
                "xl/worksheets/sheet2.xml",
            ]
        );

        let root_rels = archive.get_str("_rels/.rels").unwrap();
        assert!(root_rels.contains(r#"Target="xl/workbook.xml""#));
        assert!(root_rels.contains(r#"Target="docProps/core.xml""#));
    }

    #[test]
    fn test_no_visible_sheets_writes_nothing() {
        let mut wb = Workbook::new();
        wb.sheet_mut(0).unwrap().set_sheet_state(SheetState::Hidden);

        let mut archive = MemoryArchive::new();
        let result = XlsxWriter::write_archive(&wb, &mut archive, &WriteOptions::default());
        assert!(matches!(result, Err(XlsxError::NoVisibleSheets)));
        assert!(archive.is_empty());
    }

    #[test]
    fn test_stylesheet_pass_through() {
        let mut wb = Workbook::new();
        wb.set_stylesheet(Some(b"<styleSheet custom=\"1\"/>".to_vec()));

        let mut archive = MemoryArchive::new();
        XlsxWriter::write_archive(&wb, &mut archive, &WriteOptions::default()).unwrap();
        assert_eq!(
            archive.get_str("xl/styles.xml"),
            Some("<styleSheet custom=\"1\"/>")
        );
    }

    #[test]
    fn test_unwritten_parts_are_left_out() {
        let mut wb = Workbook::new();
        wb.manifest_mut().register_override("/xl/theme/theme1.xml", content_type::THEME);
        wb.relationships_mut().create(RelationshipType::Theme, "theme/theme1.xml");
        let mut link =
            Relationship::new("rId9", RelationshipType::Hyperlink, "https://example.com");
        link.external = true;
        wb.relationships_mut().add(link);

        let mut archive = MemoryArchive::new();
        XlsxWriter::write_archive(&wb, &mut archive, &WriteOptions::default()).unwrap();

        let content_types = archive.get_str("[Content_Types].xml").unwrap();
        assert!(!content_types.contains("theme1.xml"));
        assert!(content_types.contains("/xl/worksheets/sheet1.xml"));

        let rels = archive.get_str("xl/_rels/workbook.xml.rels").unwrap();
        assert!(!rels.contains("theme/theme1.xml"));
        assert!(rels.contains(r#"Target="styles.xml""#));
        assert!(rels.contains("https://example.com"));
    }

    #[test]
    fn test_write_to_stored_zip() {
        let wb = Workbook::new();
        let options = WriteOptions {
            compression: Compression::Stored,
            ..WriteOptions::default()
        };

        let mut buf = Cursor::new(Vec::new());
        XlsxWriter::write_with(&wb, &mut buf, &options).unwrap();

        let archive = zip::ZipArchive::new(Cursor::new(buf.into_inner())).unwrap();
        assert!(archive.file_names().any(|n| n == "xl/worksheets/sheet1.xml"));
    }
}
