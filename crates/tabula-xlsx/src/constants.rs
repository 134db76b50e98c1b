//! XML namespaces and fixed archive paths

/// Namespace URIs
pub mod namespace {
    pub const SPREADSHEETML: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
    pub const RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
    pub const RELATIONSHIPS_STRICT: &str =
        "http://purl.oclc.org/ooxml/officeDocument/relationships";
    pub const PACKAGE_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships";
    pub const CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

    pub const CORE_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
    pub const DUBLIN_CORE: &str = "http://purl.org/dc/elements/1.1/";
    pub const DCMI_TYPE: &str = "http://purl.org/dc/dcmitype/";
    pub const DC_TERMS: &str = "http://purl.org/dc/terms/";
    pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

    pub const EXTENDED_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";
    pub const DOC_PROPS_VTYPES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes";
}

/// Package root (source of `_rels/.rels`)
pub const PACKAGE_ROOT: &str = "/";

/// Shared strings part used when the workbook relationships do not name one
pub const DEFAULT_SHARED_STRINGS: &str = "/xl/sharedStrings.xml";

/// Defined name Excel uses for a sheet's auto-filter range
pub const FILTER_DATABASE: &str = "_xlnm._FilterDatabase";

/// Prefix of every built-in defined name
pub const BUILTIN_NAME_PREFIX: &str = "_xlnm.";

/// Written when a workbook carries no stylesheet of its own
pub const DEFAULT_STYLESHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <fonts count="1"><font><sz val="11"/><name val="Calibri"/><family val="2"/><scheme val="minor"/></font></fonts>
    <fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
    <borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
    <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
    <cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>
    <cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>"#;
