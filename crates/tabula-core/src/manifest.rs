//! Package manifest: part name → content type
//!
//! Serialized as `[Content_Types].xml`. A part's content type comes from an
//! explicit override when one exists, otherwise from the default registered
//! for its file extension.

use std::collections::BTreeMap;

/// Content-type strings used in OOXML packages
pub mod content_type {
    pub const RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
    pub const XML: &str = "application/xml";

    pub const WORKBOOK: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
    pub const WORKBOOK_TEMPLATE: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.template.main+xml";
    pub const WORKBOOK_MACRO_ENABLED: &str = "application/vnd.ms-excel.sheet.macroEnabled.main+xml";
    pub const WORKBOOK_TEMPLATE_MACRO_ENABLED: &str =
        "application/vnd.ms-excel.template.macroEnabled.main+xml";
    pub const WORKSHEET: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
    pub const STYLES: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
    pub const SHARED_STRINGS: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";
    pub const COMMENTS: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.comments+xml";
    pub const THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";

    pub const CORE_PROPERTIES: &str = "application/vnd.openxmlformats-package.core-properties+xml";
    pub const APP_PROPERTIES: &str =
        "application/vnd.openxmlformats-officedocument.extended-properties+xml";

    pub const PRESENTATION: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
    pub const WORD_DOCUMENT: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
}

/// Fixed part names of a spreadsheet package
pub mod part_name {
    pub const CONTENT_TYPES: &str = "[Content_Types].xml";
    pub const ROOT_RELATIONSHIPS: &str = "_rels/.rels";
    pub const WORKBOOK: &str = "/xl/workbook.xml";
    pub const STYLES: &str = "/xl/styles.xml";
    pub const CORE_PROPERTIES: &str = "/docProps/core.xml";
    pub const APP_PROPERTIES: &str = "/docProps/app.xml";

    /// Worksheet part for a 1-based sheet ordinal (`/xl/worksheets/sheet3.xml`)
    pub fn worksheet(ordinal: usize) -> String {
        format!("/xl/worksheets/sheet{}.xml", ordinal)
    }

    /// Worksheet target relative to the workbook part (`worksheets/sheet3.xml`)
    pub fn worksheet_target(ordinal: usize) -> String {
        format!("worksheets/sheet{}.xml", ordinal)
    }
}

/// Default and override content-type declarations of a package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Extension (without dot, lowercase) → content type
    defaults: BTreeMap<String, String>,
    /// Absolute part name (leading `/`) → content type
    overrides: BTreeMap<String, String>,
}

/// Normalize a part name to its absolute form (`/xl/workbook.xml`)
pub fn absolute_part_name(part: &str) -> String {
    if part.starts_with('/') {
        part.to_string()
    } else {
        format!("/{}", part)
    }
}

impl Manifest {
    /// Create an empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// A manifest with the `rels` and `xml` defaults every package carries
    pub fn with_package_defaults() -> Self {
        let mut manifest = Self::new();
        manifest.register_default("rels", content_type::RELATIONSHIPS);
        manifest.register_default("xml", content_type::XML);
        manifest
    }

    pub fn register_default(&mut self, extension: &str, content_type: &str) {
        self.defaults.insert(
            extension.trim_start_matches('.').to_ascii_lowercase(),
            content_type.to_string(),
        );
    }

    pub fn remove_default(&mut self, extension: &str) -> Option<String> {
        self.defaults
            .remove(&extension.trim_start_matches('.').to_ascii_lowercase())
    }

    pub fn default_type(&self, extension: &str) -> Option<&str> {
        self.defaults
            .get(&extension.trim_start_matches('.').to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Iterate over `(extension, content type)` defaults
    pub fn defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defaults.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn register_override(&mut self, part: &str, content_type: &str) {
        self.overrides
            .insert(absolute_part_name(part), content_type.to_string());
    }

    pub fn remove_override(&mut self, part: &str) -> Option<String> {
        self.overrides.remove(&absolute_part_name(part))
    }

    pub fn has_override(&self, part: &str) -> bool {
        self.overrides.contains_key(&absolute_part_name(part))
    }

    pub fn override_type(&self, part: &str) -> Option<&str> {
        self.overrides
            .get(&absolute_part_name(part))
            .map(String::as_str)
    }

    /// Iterate over `(part name, content type)` overrides
    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.overrides.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Resolve a part's content type (override first, then extension default)
    pub fn content_type(&self, part: &str) -> Option<&str> {
        if let Some(ct) = self.override_type(part) {
            return Some(ct);
        }
        let extension = part.rsplit_once('.').map(|(_, ext)| ext)?;
        self.default_type(extension)
    }

    /// Part names whose override declares the given content type
    pub fn parts_with_type<'a>(&'a self, content_type: &'a str) -> impl Iterator<Item = &'a str> {
        self.overrides
            .iter()
            .filter(move |(_, ct)| ct.as_str() == content_type)
            .map(|(part, _)| part.as_str())
    }

    /// Keep only the overrides for which `f(part, content type)` holds
    pub fn retain_overrides<F: FnMut(&str, &str) -> bool>(&mut self, mut f: F) {
        self.overrides.retain(|part, ct| f(part, ct));
    }

    /// Drop every override with the given content type
    pub fn remove_overrides_of_type(&mut self, content_type: &str) {
        self.overrides.retain(|_, ct| ct != content_type);
    }
}
