//! `docProps/core.xml` and `docProps/app.xml`, and document-type detection

use std::fmt;

use tabula_core::manifest::content_type;
use tabula_core::{DocumentProperties, Manifest, Workbook};

use crate::constants::namespace;
use crate::datetime::{format_w3cdtf, parse_w3cdtf};
use crate::error::XlsxResult;
use crate::options::WriteOptions;
use crate::xml::XmlDocument;

/// Decode core properties into `props`.
///
/// Absent elements leave the corresponding property untouched; a malformed
/// timestamp is an error.
pub fn read_core_properties(doc: &XmlDocument, props: &mut DocumentProperties) -> XlsxResult<()> {
    let root = doc.root();

    if let Some(node) = root.child("creator") {
        props.creator = node.text().to_string();
    }
    if let Some(node) = root.child("lastModifiedBy") {
        props.last_modified_by = node.text().to_string();
    }
    if let Some(node) = root.child("title") {
        props.title = node.text().to_string();
    }
    if let Some(node) = root.child("created") {
        props.created = parse_w3cdtf(node.text().trim())?;
    }
    if let Some(node) = root.child("modified") {
        props.modified = parse_w3cdtf(node.text().trim())?;
    }

    Ok(())
}

/// Encode core properties
pub fn write_core_properties(props: &DocumentProperties) -> XmlDocument {
    let mut doc = XmlDocument::new("cp:coreProperties");
    doc.add_namespace("cp", namespace::CORE_PROPERTIES)
        .add_namespace("dc", namespace::DUBLIN_CORE)
        .add_namespace("dcmitype", namespace::DCMI_TYPE)
        .add_namespace("dcterms", namespace::DC_TERMS)
        .add_namespace("xsi", namespace::XSI);

    let root = doc.root_mut();
    root.add_child("dc:creator").set_text(props.creator.as_str());
    root.add_child("cp:lastModifiedBy")
        .set_text(props.last_modified_by.as_str());
    root.add_child("dcterms:created")
        .add_attribute("xsi:type", "dcterms:W3CDTF")
        .set_text(format_w3cdtf(&props.created));
    root.add_child("dcterms:modified")
        .add_attribute("xsi:type", "dcterms:W3CDTF")
        .set_text(format_w3cdtf(&props.modified));
    root.add_child("dc:title").set_text(props.title.as_str());
    root.add_child("dc:description");
    root.add_child("dc:subject");
    root.add_child("cp:keywords");
    root.add_child("cp:category");

    doc
}

/// The parts of `docProps/app.xml` a reader cares about
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppProperties {
    pub application: Option<String>,
    pub app_version: Option<String>,
    /// Entries of the "titles of parts" vector
    pub titles: Vec<String>,
}

/// Decode extended (application) properties
pub fn read_app_properties(doc: &XmlDocument) -> AppProperties {
    let root = doc.root();
    let text_of = |name: &str| root.child(name).map(|n| n.text().to_string());

    let titles = root
        .child("TitlesOfParts")
        .and_then(|n| n.child("vector"))
        .map(|vector| {
            vector
                .children_named("lpstr")
                .map(|n| n.text().to_string())
                .collect()
        })
        .unwrap_or_default();

    AppProperties {
        application: text_of("Application"),
        app_version: text_of("AppVersion"),
        titles,
    }
}

/// Encode extended properties: fixed flags, then the worksheet heading pair
/// and the worksheet titles in workbook order
pub fn write_app_properties(workbook: &Workbook, options: &WriteOptions) -> XmlDocument {
    let mut doc = XmlDocument::new("Properties");
    doc.add_namespace("", namespace::EXTENDED_PROPERTIES)
        .add_namespace("vt", namespace::DOC_PROPS_VTYPES);

    let root = doc.root_mut();
    root.add_child("Application")
        .set_text(options.application.as_str());
    root.add_child("DocSecurity").set_text("0");
    root.add_child("ScaleCrop").set_text("false");
    root.add_child("Company");
    root.add_child("LinksUpToDate").set_text("false");
    root.add_child("SharedDoc").set_text("false");
    root.add_child("HyperlinksChanged").set_text("false");
    root.add_child("AppVersion")
        .set_text(options.app_version.as_str());

    let sheet_count = workbook.sheet_count().to_string();

    let heading_pairs = root.add_child("HeadingPairs").add_child("vt:vector");
    heading_pairs
        .add_attribute("baseType", "variant")
        .add_attribute("size", "2");
    heading_pairs
        .add_child("vt:variant")
        .add_child("vt:lpstr")
        .set_text("Worksheets");
    heading_pairs
        .add_child("vt:variant")
        .add_child("vt:i4")
        .set_text(sheet_count.as_str());

    let titles = root.add_child("TitlesOfParts").add_child("vt:vector");
    titles
        .add_attribute("baseType", "lpstr")
        .add_attribute("size", sheet_count);
    for title in workbook.sheet_titles() {
        titles.add_child("vt:lpstr").set_text(title);
    }

    doc
}

/// Kind of document a package holds, judged by its main part's content type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    Spreadsheet,
    Presentation,
    WordProcessing,
    Unsupported,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Spreadsheet => "spreadsheet",
            DocumentType::Presentation => "presentation",
            DocumentType::WordProcessing => "word-processing",
            DocumentType::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a package by the override declared for its main part.
///
/// A missing override or an unknown content type is
/// [`DocumentType::Unsupported`].
pub fn determine_document_type(manifest: &Manifest, main_part: &str) -> DocumentType {
    match manifest.override_type(main_part) {
        Some(
            content_type::WORKBOOK
            | content_type::WORKBOOK_TEMPLATE
            | content_type::WORKBOOK_MACRO_ENABLED
            | content_type::WORKBOOK_TEMPLATE_MACRO_ENABLED,
        ) => DocumentType::Spreadsheet,
        Some(content_type::PRESENTATION) => DocumentType::Presentation,
        Some(content_type::WORD_DOCUMENT) => DocumentType::WordProcessing,
        _ => DocumentType::Unsupported,
    }
}
