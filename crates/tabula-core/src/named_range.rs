//! Named range definitions
//!
//! A named range binds a user-defined name to one or more worksheet areas.
//! Names are case-insensitive. Lookups that need a single area use the first
//! target in insertion order.

use std::collections::BTreeMap;

use crate::cell::RangeReference;
use crate::error::{Error, Result};
use crate::worksheet::SheetId;

/// One area of a named range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamedRangeTarget {
    pub sheet: SheetId,
    pub range: RangeReference,
}

/// A named range definition
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamedRange {
    /// The name (e.g., "SalesData"); case-insensitive
    name: String,
    /// Areas the name refers to, in insertion order
    targets: Vec<NamedRangeTarget>,
    /// Optional comment/description for documentation
    pub comment: Option<String>,
    /// Whether this name is hidden from the UI
    pub hidden: bool,
}

impl NamedRange {
    /// Create a named range with no targets
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            targets: Vec::new(),
            comment: None,
            hidden: false,
        }
    }

    /// Create a named range with exactly one area
    pub fn single(name: impl Into<String>, sheet: SheetId, range: RangeReference) -> Self {
        let mut named = Self::new(name);
        named.add_target(sheet, range);
        named
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn targets(&self) -> &[NamedRangeTarget] {
        &self.targets
    }

    /// The first area in insertion order
    pub fn first_target(&self) -> Option<&NamedRangeTarget> {
        self.targets.first()
    }

    pub fn add_target(&mut self, sheet: SheetId, range: RangeReference) {
        self.targets.push(NamedRangeTarget { sheet, range });
    }

    /// Set a comment for this named range
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Mark this named range as hidden
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Drop every area on the given sheet
    pub(crate) fn remove_sheet(&mut self, sheet: SheetId) {
        self.targets.retain(|t| t.sheet != sheet);
    }
}

/// Collection of named ranges with case-insensitive lookup
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NamedRangeCollection {
    /// Keyed by lowercase name; iteration is alphabetical
    ranges: BTreeMap<String, NamedRange>,
}

impl NamedRangeCollection {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        name.to_lowercase()
    }

    /// Define a new named range
    ///
    /// Returns an error if the name already exists
    pub fn define(&mut self, range: NamedRange) -> Result<()> {
        let key = Self::key(&range.name);
        if self.ranges.contains_key(&key) {
            return Err(Error::other(format!(
                "Named range '{}' already exists",
                range.name
            )));
        }
        self.ranges.insert(key, range);
        Ok(())
    }

    /// Define or replace a named range, returning the previous definition
    pub fn define_or_update(&mut self, range: NamedRange) -> Option<NamedRange> {
        self.ranges.insert(Self::key(&range.name), range)
    }

    pub fn get(&self, name: &str) -> Option<&NamedRange> {
        self.ranges.get(&Self::key(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut NamedRange> {
        self.ranges.get_mut(&Self::key(name))
    }

    /// First area of a name; fails if the name is unknown or has no areas
    pub fn first_target(&self, name: &str) -> Result<&NamedRangeTarget> {
        self.get(name)
            .and_then(NamedRange::first_target)
            .ok_or_else(|| Error::NotFound(format!("named range '{}'", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ranges.contains_key(&Self::key(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<NamedRange> {
        self.ranges.remove(&Self::key(name))
    }

    /// Drop areas on a removed sheet, and names left without areas
    pub fn remove_sheet(&mut self, sheet: SheetId) {
        self.ranges.retain(|_, range| {
            range.remove_sheet(sheet);
            !range.targets.is_empty()
        });
    }

    /// Iterate over all named ranges
    pub fn iter(&self) -> impl Iterator<Item = &NamedRange> {
        self.ranges.values()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(s: &str) -> RangeReference {
        RangeReference::parse(s).unwrap()
    }

    #[test]
    fn test_first_target_in_insertion_order() {
        let mut named = NamedRange::single("Areas", SheetId(1), range("C1:C4"));
        named.add_target(SheetId(1), range("A1:A2"));

        let mut coll = NamedRangeCollection::new();
        coll.define(named).unwrap();

        assert_eq!(coll.first_target("areas").unwrap().range, range("C1:C4"));
    }

    #[test]
    fn test_case_insensitive() {
        let mut coll = NamedRangeCollection::new();
        coll.define(NamedRange::single("TaxRate", SheetId(1), range("B1")))
            .unwrap();

        assert!(coll.contains("taxrate"));
        assert!(coll.get("TAXRATE").is_some());
        assert!(coll
            .define(NamedRange::single("TAXRATE", SheetId(1), range("B2")))
            .is_err());

        let previous =
            coll.define_or_update(NamedRange::single("TAXRATE", SheetId(1), range("B2")));
        assert_eq!(previous.unwrap().name(), "TaxRate");
        assert_eq!(coll.first_target("TaxRate").unwrap().range, range("B2"));
    }

    #[test]
    fn test_missing_name_not_found() {
        let coll = NamedRangeCollection::new();
        assert!(matches!(coll.first_target("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_remove_sheet_drops_empty_names() {
        let mut coll = NamedRangeCollection::new();
        let mut both = NamedRange::single("Both", SheetId(1), range("A1"));
        both.add_target(SheetId(2), range("B2"));
        coll.define(both).unwrap();
        coll.define(NamedRange::single("Only", SheetId(1), range("A1")))
            .unwrap();

        coll.remove_sheet(SheetId(1));

        assert_eq!(coll.len(), 1);
        assert_eq!(coll.first_target("Both").unwrap().sheet, SheetId(2));
    }
}
