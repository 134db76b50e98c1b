//! `*.rels` parts ↔ [`RelationshipGraph`], plus part-name arithmetic

use log::warn;
use tabula_core::{Relationship, RelationshipGraph, RelationshipType};

use crate::constants::namespace;
use crate::error::XlsxResult;
use crate::xml::XmlDocument;

/// Relationships part of a source part (`/xl/workbook.xml` → `/xl/_rels/workbook.xml.rels`).
///
/// The package root `/` maps to `/_rels/.rels`.
pub fn relationships_part(source: &str) -> String {
    let source = source.trim_start_matches('/');
    match source.rsplit_once('/') {
        Some((dir, file)) => format!("/{}/_rels/{}.rels", dir, file),
        None => format!("/_rels/{}.rels", source),
    }
}

/// Resolve a relationship target against its source part to an absolute part name.
///
/// Targets starting with `/` are already absolute; `..` and `.` segments are
/// normalized.
pub fn resolve_target(source: &str, target: &str) -> String {
    let joined = if target.starts_with('/') {
        target.to_string()
    } else {
        let base = source.rsplit_once('/').map_or("", |(dir, _)| dir);
        format!("{}/{}", base, target)
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}

/// Decode a relationships part
pub fn read_relationships(bytes: &[u8]) -> XlsxResult<RelationshipGraph> {
    let doc = XmlDocument::parse(bytes)?;
    let mut graph = RelationshipGraph::new();

    for node in doc.root().children_named("Relationship") {
        let (Some(id), Some(rel_type), Some(target)) = (
            node.attribute("Id"),
            node.attribute("Type"),
            node.attribute("Target"),
        ) else {
            warn!("Skipping incomplete relationship");
            continue;
        };

        let mut relationship = Relationship::new(id, RelationshipType::from_uri(rel_type), target);
        relationship.external = node
            .attribute("TargetMode")
            .map_or(false, |mode| mode.eq_ignore_ascii_case("External"));
        graph.add(relationship);
    }

    Ok(graph)
}

/// Encode a relationship graph in its stored order
pub fn write_relationships(graph: &RelationshipGraph) -> XmlDocument {
    let mut doc = XmlDocument::new("Relationships");
    doc.add_namespace("", namespace::PACKAGE_RELATIONSHIPS);

    let root = doc.root_mut();
    for relationship in graph {
        let node = root.add_child("Relationship");
        node.add_attribute("Id", relationship.id.as_str())
            .add_attribute("Type", relationship.rel_type.uri())
            .add_attribute("Target", relationship.target.as_str());
        if relationship.external {
            node.add_attribute("TargetMode", "External");
        }
    }

    doc
}
