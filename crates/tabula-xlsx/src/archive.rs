//! Archive adapters
//!
//! The codec reads and writes named entries through [`ArchiveRead`] and
//! [`ArchiveWrite`]; zip archives and an in-memory archive implement them.
//! Entry names never carry a leading `/`, part names do; both forms are
//! accepted by every method.

use std::collections::BTreeMap;
use std::io::{Read, Seek, Write};

use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{XlsxError, XlsxResult};
use crate::options::Compression;

/// Upper bound on the buffer reserved up front for one entry
const MAX_ENTRY_PREALLOCATION: u64 = 16 * 1024 * 1024;

/// Reservation for an entry whose header declares `declared` bytes
fn initial_capacity(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_ENTRY_PREALLOCATION)).unwrap_or(0)
}

/// Archive entry name for a part name (`/xl/workbook.xml` → `xl/workbook.xml`)
pub fn entry_name(part: &str) -> &str {
    part.trim_start_matches('/')
}

/// Read access to a package archive
pub trait ArchiveRead {
    /// Read a whole entry; a missing entry is [`XlsxError::MissingPart`]
    fn read(&mut self, name: &str) -> XlsxResult<Vec<u8>>;

    /// Names of all entries
    fn entries(&self) -> Vec<String>;

    fn contains(&self, name: &str) -> bool {
        let name = entry_name(name);
        self.entries().iter().any(|e| e == name)
    }

    /// Read an entry if it exists
    fn read_optional(&mut self, name: &str) -> XlsxResult<Option<Vec<u8>>> {
        match self.read(name) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(XlsxError::MissingPart(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Write access to a package archive
pub trait ArchiveWrite {
    /// Write a whole entry
    fn write(&mut self, name: &str, bytes: &[u8]) -> XlsxResult<()>;
}

impl<R: Read + Seek> ArchiveRead for ZipArchive<R> {
    fn read(&mut self, name: &str) -> XlsxResult<Vec<u8>> {
        let name = entry_name(name);
        let mut file = match self.by_name(name) {
            Ok(f) => f,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(XlsxError::MissingPart(name.to_string()))
            }
            Err(e) => return Err(XlsxError::Zip(e)),
        };

        let mut bytes = Vec::with_capacity(initial_capacity(file.size()));
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn entries(&self) -> Vec<String> {
        self.file_names().map(String::from).collect()
    }
}

/// Zip archive writer with a fixed compression method
pub struct ZipArchiveWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
}

impl<W: Write + Seek> ZipArchiveWriter<W> {
    pub fn new(writer: W, compression: Compression) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            options: SimpleFileOptions::default().compression_method(compression.method()),
        }
    }

    /// Write the central directory and return the underlying writer
    pub fn finish(self) -> XlsxResult<W> {
        Ok(self.zip.finish()?)
    }
}

impl<W: Write + Seek> ArchiveWrite for ZipArchiveWriter<W> {
    fn write(&mut self, name: &str, bytes: &[u8]) -> XlsxResult<()> {
        self.zip.start_file(entry_name(name), self.options)?;
        self.zip.write_all(bytes)?;
        Ok(())
    }
}

/// An archive held entirely in memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryArchive {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, name: &str, bytes: impl Into<Vec<u8>>) {
        self.entries
            .insert(entry_name(name).to_string(), bytes.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.entries.remove(entry_name(name))
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(entry_name(name)).map(Vec::as_slice)
    }

    /// Entry contents as UTF-8 text
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ArchiveRead for MemoryArchive {
    fn read(&mut self, name: &str) -> XlsxResult<Vec<u8>> {
        self.get(name)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| XlsxError::MissingPart(entry_name(name).to_string()))
    }

    fn entries(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(entry_name(name))
    }
}

impl ArchiveWrite for MemoryArchive {
    fn write(&mut self, name: &str, bytes: &[u8]) -> XlsxResult<()> {
        self.insert(name, bytes);
        Ok(())
    }
}
