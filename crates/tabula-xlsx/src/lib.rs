//! # tabula-xlsx
//!
//! XLSX (Office Open XML) package reader and writer for tabula.
//!
//! Package metadata parts (content types, relationships, the workbook part,
//! document properties) go through a small XML tree; worksheets are streamed.
//! Any [`ArchiveRead`] / [`ArchiveWrite`] implementation can back a package,
//! zip files and [`MemoryArchive`] included.

pub mod archive;
pub mod constants;
pub mod content_types;
pub mod datetime;
pub mod error;
pub mod options;
pub mod properties;
pub mod reader;
pub mod relationships;
pub mod shared_strings;
pub mod workbook_part;
pub mod worksheet_part;
pub mod writer;
pub mod xml;

pub use archive::{ArchiveRead, ArchiveWrite, MemoryArchive};
pub use error::{XlsxError, XlsxResult};
pub use options::{Compression, ReadOptions, WriteOptions};
pub use properties::DocumentType;
pub use reader::XlsxReader;
pub use workbook_part::{detect_worksheets, SheetEntry};
pub use writer::XlsxWriter;
