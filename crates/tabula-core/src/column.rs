//! Column display properties

/// Column metadata
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnProperties {
    /// Custom width (None = default)
    pub width: Option<f64>,
    /// Column is hidden
    pub hidden: bool,
    /// Outline/grouping level (0-7)
    pub outline_level: u8,
    /// Column is collapsed (in outline)
    pub collapsed: bool,
    /// Best fit (auto-sized)
    pub best_fit: bool,
    /// Column-level style index (None = no column style)
    pub style_index: Option<u32>,
}

impl ColumnProperties {
    /// Create column properties with a custom width
    pub fn with_width(width: f64) -> Self {
        Self {
            width: Some(width),
            ..Self::default()
        }
    }

    /// Check if this column has any custom settings
    pub fn has_custom_settings(&self) -> bool {
        self.width.is_some()
            || self.hidden
            || self.outline_level > 0
            || self.style_index.is_some()
            || self.collapsed
            || self.best_fit
    }
}
