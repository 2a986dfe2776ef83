//! Access to the named parts of a workbook container
//!
//! The reader and writer never touch files or zip archives directly; they go
//! through [`PartSource`] and [`PartSink`]. [`Package`] is the in-memory
//! implementation of both and is what the reader snapshots an archive into.

use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{XlsxError, XlsxResult};

/// Something parts can be listed and read from
pub trait PartSource {
    /// Names of every part, in archive order
    fn list_parts(&self) -> Vec<String>;

    /// Bytes of one part; fails with [`XlsxError::PartNotFound`]
    fn read_part(&mut self, name: &str) -> XlsxResult<Vec<u8>>;
}

/// Something parts can be written to
///
/// Creating the sink opens it for writing. Nothing is visible at the target
/// until [`PartSink::finalize`] succeeds.
pub trait PartSink {
    /// Add one part
    fn write_part(&mut self, name: &str, data: &[u8]) -> XlsxResult<()>;

    /// Complete the target
    fn finalize(self) -> XlsxResult<()>;
}

/// Compression used for parts written to a zip archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Deflate (what spreadsheet applications write)
    #[default]
    Deflated,
    /// No compression
    Stored,
}

impl Compression {
    fn method(self) -> CompressionMethod {
        match self {
            Compression::Deflated => CompressionMethod::Deflated,
            Compression::Stored => CompressionMethod::Stored,
        }
    }
}

/// Options for writing an archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Compression for every part
    pub compression: Compression,
}

/// In-memory set of named parts, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    parts: IndexMap<String, Vec<u8>>,
}

impl Package {
    /// Create an empty package
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every part out of a source
    pub fn from_source<S: PartSource + ?Sized>(source: &mut S) -> XlsxResult<Self> {
        let mut package = Package::new();
        for name in source.list_parts() {
            let data = source.read_part(&name)?;
            package.parts.insert(name, data);
        }
        Ok(package)
    }

    /// Read a whole zip archive into memory
    ///
    /// The archive is released before this returns, on success or failure.
    pub fn from_zip<R: Read + Seek>(reader: R) -> XlsxResult<Self> {
        let mut source = ZipSource::new(reader)?;
        Self::from_source(&mut source)
    }

    /// Read a zip archive from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Self> {
        let file = File::open(path)?;
        Self::from_zip(file)
    }

    /// Bytes of a part, if present
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(Vec::as_slice)
    }

    /// Check if a part is present
    pub fn contains(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    /// Add or replace a part; a replaced part keeps its position
    pub fn insert<N: Into<String>, D: Into<Vec<u8>>>(&mut self, name: N, data: D) {
        self.parts.insert(name.into(), data.into());
    }

    /// Remove a part
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.parts.shift_remove(name)
    }

    /// Part names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    /// Parts in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.parts.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of parts
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Check if there are no parts
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Write every part to a sink and finalize it
    pub fn write_to<S: PartSink>(&self, mut sink: S) -> XlsxResult<()> {
        for (name, data) in &self.parts {
            sink.write_part(name, data)?;
        }
        sink.finalize()
    }

    /// Write the package as a zip archive
    pub fn write_zip<W: Write + Seek>(&self, writer: W, options: &WriteOptions) -> XlsxResult<W> {
        let mut sink = ZipSink::new(writer, options);
        for (name, data) in &self.parts {
            sink.write_part(name, data)?;
        }
        sink.finish()
    }
}

impl PartSource for Package {
    fn list_parts(&self) -> Vec<String> {
        self.parts.keys().cloned().collect()
    }

    fn read_part(&mut self, name: &str) -> XlsxResult<Vec<u8>> {
        self.parts
            .get(name)
            .cloned()
            .ok_or_else(|| XlsxError::PartNotFound(name.to_string()))
    }
}

impl PartSink for &mut Package {
    fn write_part(&mut self, name: &str, data: &[u8]) -> XlsxResult<()> {
        self.insert(name, data);
        Ok(())
    }

    fn finalize(self) -> XlsxResult<()> {
        Ok(())
    }
}

/// Parts read from a zip archive
pub struct ZipSource<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> ZipSource<R> {
    /// Open an archive
    pub fn new(reader: R) -> XlsxResult<Self> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
        })
    }
}

impl<R: Read + Seek> PartSource for ZipSource<R> {
    fn list_parts(&self) -> Vec<String> {
        self.archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(str::to_string)
            .collect()
    }

    fn read_part(&mut self, name: &str) -> XlsxResult<Vec<u8>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(XlsxError::PartNotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        Ok(data)
    }
}

/// Parts written into a zip archive over any seekable writer
pub struct ZipSink<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
}

impl<W: Write + Seek> ZipSink<W> {
    /// Start an archive
    pub fn new(writer: W, options: &WriteOptions) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            options: SimpleFileOptions::default().compression_method(options.compression.method()),
        }
    }

    /// Finish the archive and hand back the writer
    pub fn finish(self) -> XlsxResult<W> {
        Ok(self.zip.finish()?)
    }
}

impl<W: Write + Seek> PartSink for ZipSink<W> {
    fn write_part(&mut self, name: &str, data: &[u8]) -> XlsxResult<()> {
        self.zip.start_file(name, self.options)?;
        self.zip.write_all(data)?;
        Ok(())
    }

    fn finalize(self) -> XlsxResult<()> {
        self.finish().map(|_| ())
    }
}

/// A zip archive written next to its target and moved into place on finalize
///
/// If the sink is dropped without finalizing, or finalizing fails, the
/// temporary file is removed and the target is left untouched.
pub struct FileSink {
    inner: ZipSink<NamedTempFile>,
    target: PathBuf,
}

impl FileSink {
    /// Open a sink for `target`
    pub fn create<P: AsRef<Path>>(target: P, options: &WriteOptions) -> XlsxResult<Self> {
        let target = target.as_ref().to_path_buf();
        let dir = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = NamedTempFile::new_in(dir)?;
        Ok(Self {
            inner: ZipSink::new(temp, options),
            target,
        })
    }
}

impl PartSink for FileSink {
    fn write_part(&mut self, name: &str, data: &[u8]) -> XlsxResult<()> {
        self.inner.write_part(name, data)
    }

    fn finalize(self) -> XlsxResult<()> {
        let temp = self.inner.finish()?;
        temp.as_file().sync_all()?;
        temp.persist(&self.target).map_err(|e| XlsxError::Io(e.error))?;
        log::debug!("wrote {}", self.target.display());
        Ok(())
    }
}
