//! Row display properties

/// Row metadata
///
/// Stored sparsely by the worksheet; rows without an entry use the default
/// height.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowProperties {
    /// Custom height in points (None = default)
    pub height: Option<f64>,
    /// Row is hidden
    pub hidden: bool,
    /// Outline/grouping level (0-7)
    pub outline_level: u8,
    /// Row is collapsed (in outline)
    pub collapsed: bool,
    /// Row-level style index (None = no row style)
    pub style_index: Option<u32>,
}

impl RowProperties {
    /// Create row properties with a custom height
    pub fn with_height(height: f64) -> Self {
        Self {
            height: Some(height),
            ..Self::default()
        }
    }

    /// Check if this row has any custom settings
    pub fn has_custom_settings(&self) -> bool {
        self.height.is_some()
            || self.hidden
            || self.outline_level > 0
            || self.style_index.is_some()
            || self.collapsed
    }
}
