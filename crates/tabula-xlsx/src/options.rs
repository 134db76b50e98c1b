//! Reader and writer options

/// Options for reading XLSX packages
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Drop empty, unmerged, unstyled cells after each worksheet is loaded
    pub collect_garbage: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            collect_garbage: true,
        }
    }
}

/// Options for writing XLSX packages
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Archive entry compression
    pub compression: Compression,
    /// `Application` written to `docProps/app.xml`
    pub application: String,
    /// `AppVersion` written to `docProps/app.xml`
    pub app_version: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compression: Compression::Deflated,
            application: "Microsoft Excel".to_string(),
            app_version: "12.0000".to_string(),
        }
    }
}

/// Archive entry compression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Deflate (smaller files)
    #[default]
    Deflated,
    /// No compression
    Stored,
}

impl Compression {
    pub(crate) fn method(self) -> zip::CompressionMethod {
        match self {
            Compression::Deflated => zip::CompressionMethod::Deflated,
            Compression::Stored => zip::CompressionMethod::Stored,
        }
    }
}
