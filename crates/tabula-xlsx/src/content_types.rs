//! `[Content_Types].xml` ↔ [`Manifest`]

use log::warn;
use tabula_core::Manifest;

use crate::constants::namespace;
use crate::error::XlsxResult;
use crate::xml::XmlDocument;

/// Decode a content-types part
pub fn read_content_types(bytes: &[u8]) -> XlsxResult<Manifest> {
    let doc = XmlDocument::parse(bytes)?;
    let mut manifest = Manifest::new();

    for node in doc.root().children() {
        match node.local_name() {
            "Default" => match (node.attribute("Extension"), node.attribute("ContentType")) {
                (Some(ext), Some(ct)) => manifest.register_default(ext, ct),
                _ => warn!("Skipping incomplete Default content type"),
            },
            "Override" => match (node.attribute("PartName"), node.attribute("ContentType")) {
                (Some(part), Some(ct)) => manifest.register_override(part, ct),
                _ => warn!("Skipping incomplete Override content type"),
            },
            _ => {}
        }
    }

    Ok(manifest)
}

/// Encode a manifest: defaults first, then overrides
pub fn write_content_types(manifest: &Manifest) -> XmlDocument {
    let mut doc = XmlDocument::new("Types");
    doc.add_namespace("", namespace::CONTENT_TYPES);

    let root = doc.root_mut();
    for (extension, content_type) in manifest.defaults() {
        root.add_child("Default")
            .add_attribute("Extension", extension)
            .add_attribute("ContentType", content_type);
    }
    for (part, content_type) in manifest.overrides() {
        root.add_child("Override")
            .add_attribute("PartName", part)
            .add_attribute("ContentType", content_type);
    }

    doc
}
