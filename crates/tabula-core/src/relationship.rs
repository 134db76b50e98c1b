//! Typed relationships between package parts
//!
//! Serialized as `*.rels` parts. Ids are stable string tokens (`rId1`, ...);
//! targets are URIs relative to the referencing part.

use std::fmt;

use ahash::AHashMap;

use crate::error::{Error, Result};

const OFFICE_DOCUMENT_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PACKAGE_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Relationship type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RelationshipType {
    OfficeDocument,
    Worksheet,
    Styles,
    SharedStrings,
    Theme,
    CoreProperties,
    ExtendedProperties,
    Comments,
    Drawing,
    VmlDrawing,
    Hyperlink,
    /// Any type URI not listed above
    Other(String),
}

impl RelationshipType {
    /// The type URI written to the `Type` attribute
    pub fn uri(&self) -> String {
        let suffix = match self {
            RelationshipType::OfficeDocument => "officeDocument",
            RelationshipType::Worksheet => "worksheet",
            RelationshipType::Styles => "styles",
            RelationshipType::SharedStrings => "sharedStrings",
            RelationshipType::Theme => "theme",
            RelationshipType::CoreProperties => {
                return format!("{}/metadata/core-properties", PACKAGE_NS)
            }
            RelationshipType::ExtendedProperties => "extended-properties",
            RelationshipType::Comments => "comments",
            RelationshipType::Drawing => "drawing",
            RelationshipType::VmlDrawing => "vmlDrawing",
            RelationshipType::Hyperlink => "hyperlink",
            RelationshipType::Other(uri) => return uri.clone(),
        };
        format!("{}/{}", OFFICE_DOCUMENT_NS, suffix)
    }

    /// Map a type URI back to its variant
    pub fn from_uri(uri: &str) -> Self {
        if uri == format!("{}/metadata/core-properties", PACKAGE_NS) {
            return RelationshipType::CoreProperties;
        }
        let Some(suffix) = uri
            .strip_prefix(OFFICE_DOCUMENT_NS)
            .and_then(|s| s.strip_prefix('/'))
        else {
            return RelationshipType::Other(uri.to_string());
        };
        match suffix {
            "officeDocument" => RelationshipType::OfficeDocument,
            "worksheet" => RelationshipType::Worksheet,
            "styles" => RelationshipType::Styles,
            "sharedStrings" => RelationshipType::SharedStrings,
            "theme" => RelationshipType::Theme,
            "extended-properties" => RelationshipType::ExtendedProperties,
            "comments" => RelationshipType::Comments,
            "drawing" => RelationshipType::Drawing,
            "vmlDrawing" => RelationshipType::VmlDrawing,
            "hyperlink" => RelationshipType::Hyperlink,
            _ => RelationshipType::Other(uri.to_string()),
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// One directed, typed link from a part to a target
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Relationship {
    pub id: String,
    pub rel_type: RelationshipType,
    /// Target URI relative to the referencing part
    pub target: String,
    /// `TargetMode="External"`
    pub external: bool,
}

impl Relationship {
    pub fn new(
        id: impl Into<String>,
        rel_type: RelationshipType,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            rel_type,
            target: target.into(),
            external: false,
        }
    }
}

/// Ordered relationships of one part, indexed by id
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    relationships: Vec<Relationship>,
    index: AHashMap<String, usize>,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a relationship, replacing any existing one with the same id
    pub fn add(&mut self, relationship: Relationship) {
        match self.index.get(&relationship.id) {
            Some(&i) => self.relationships[i] = relationship,
            None => {
                self.index
                    .insert(relationship.id.clone(), self.relationships.len());
                self.relationships.push(relationship);
            }
        }
    }

    /// Add a relationship under a freshly allocated id, returning the id
    pub fn create(&mut self, rel_type: RelationshipType, target: impl Into<String>) -> String {
        let id = self.next_id();
        self.add(Relationship::new(id.clone(), rel_type, target));
        id
    }

    /// Smallest free `rId{n}` starting from `len + 1`
    pub fn next_id(&self) -> String {
        let mut n = self.relationships.len() + 1;
        loop {
            let id = format!("rId{}", n);
            if !self.index.contains_key(&id) {
                return id;
            }
            n += 1;
        }
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.index.get(id).map(|&i| &self.relationships[i])
    }

    /// Look up a relationship that must exist
    pub fn resolve(&self, id: &str) -> Result<&Relationship> {
        self.get(id)
            .ok_or_else(|| Error::NotFound(format!("relationship {}", id)))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Relationship> {
        let i = self.index.remove(id)?;
        let removed = self.relationships.remove(i);
        self.reindex();
        Some(removed)
    }

    /// Keep only relationships matching the predicate
    pub fn retain<F: FnMut(&Relationship) -> bool>(&mut self, f: F) {
        self.relationships.retain(f);
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .relationships
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter()
    }

    pub fn of_type<'a>(
        &'a self,
        rel_type: &'a RelationshipType,
    ) -> impl Iterator<Item = &'a Relationship> {
        self.relationships.iter().filter(move |r| &r.rel_type == rel_type)
    }

    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    pub fn clear(&mut self) {
        self.relationships.clear();
        self.index.clear();
    }
}

impl PartialEq for RelationshipGraph {
    fn eq(&self, other: &Self) -> bool {
        self.relationships == other.relationships
    }
}

impl<'a> IntoIterator for &'a RelationshipGraph {
    type Item = &'a Relationship;
    type IntoIter = std::slice::Iter<'a, Relationship>;

    fn into_iter(self) -> Self::IntoIter {
        self.relationships.iter()
    }
}
