//! Memory-mapped storage for the vector matrix.
//!
//! # Storage Format
//!
//! - Header (16 bytes): magic, version, dimension, row count
//! - Rows: contiguous little-endian f32 arrays, `dimension` values each,
//!   in index row order (row `i` of the file is row `i` of the index)
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! reader either sees the previous complete file or the new complete file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::MmapOptions;
use thiserror::Error;

use crate::vector::{VectorDimension, VectorError, VectorIndex};

/// Current storage format version.
const STORAGE_VERSION: u32 = 1;

/// Size of the storage header in bytes.
const HEADER_SIZE: usize = 16;

/// Magic bytes to identify vector matrix files.
const MAGIC_BYTES: &[u8; 4] = b"TRVX";

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = 4;

/// File name of the matrix inside the index directory.
pub const VECTORS_FILE: &str = "vectors.bin";

/// Errors specific to vector storage operations.
#[derive(Error, Debug)]
pub enum VectorStorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid storage format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported storage version: expected {expected}, got {actual}")]
    VersionMismatch { expected: u32, actual: u32 },

    #[error("Vector error: {0}")]
    Vector(#[from] VectorError),
}

/// Header fields decoded from a matrix file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    version: u32,
    dimension: VectorDimension,
    rows: usize,
}

/// Reader/writer for the persisted vector matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmapVectorStorage {
    /// Path to the storage file.
    path: PathBuf,
}

impl MmapVectorStorage {
    /// Storage rooted at `base_path/vectors.bin`.
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            path: base_path.as_ref().join(VECTORS_FILE),
        }
    }

    /// Writes every row of `index` with the given dimension.
    ///
    /// `dimension` is needed for the header even when the index has no rows.
    pub fn write_index(
        &self,
        index: &VectorIndex,
        dimension: VectorDimension,
    ) -> Result<(), VectorStorageError> {
        if let Some(actual) = index.dimension() {
            if actual != dimension {
                return Err(VectorError::DimensionMismatch {
                    expected: dimension.get(),
                    actual: actual.get(),
                }
                .into());
            }
        }

        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            Self::write_header(&mut writer, dimension, index.row_count())?;
            for &value in index.as_slice() {
                writer.write_all(&value.to_le_bytes())?;
            }
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }

    /// Maps the file and rebuilds the index it describes.
    pub fn read_index(&self) -> Result<VectorIndex, VectorStorageError> {
        let file = File::open(&self.path)?;
        // SAFETY: the file is only ever replaced by rename, never modified in place.
        let mmap = unsafe { MmapOptions::new().map(&file)? };

        let header = Self::read_header(&mmap)?;
        if header.version != STORAGE_VERSION {
            return Err(VectorStorageError::VersionMismatch {
                expected: STORAGE_VERSION,
                actual: header.version,
            });
        }

        let dim = header.dimension.get();
        let expected_len = header
            .rows
            .checked_mul(dim)
            .and_then(|n| n.checked_mul(BYTES_PER_F32))
            .and_then(|n| n.checked_add(HEADER_SIZE))
            .ok_or_else(|| {
                VectorStorageError::InvalidFormat(format!(
                    "header claims {} rows of dimension {dim}, which overflows the file size",
                    header.rows
                ))
            })?;
        if mmap.len() != expected_len {
            return Err(VectorStorageError::InvalidFormat(format!(
                "expected {expected_len} bytes for {} rows of dimension {dim}, found {}",
                header.rows,
                mmap.len()
            )));
        }

        let data: Vec<f32> = mmap[HEADER_SIZE..]
            .chunks_exact(BYTES_PER_F32)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(VectorIndex::from_normalized_rows(header.dimension, data)?)
    }

    /// Checks if the storage file exists on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Returns the size of the storage file in bytes.
    pub fn file_size(&self) -> Result<u64, io::Error> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// Deletes the storage file if present.
    pub fn remove(&self) -> Result<(), io::Error> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // Private helper methods

    fn write_header(
        writer: &mut impl Write,
        dimension: VectorDimension,
        rows: usize,
    ) -> Result<(), VectorStorageError> {
        let dimension = u32::try_from(dimension.get())
            .map_err(|_| VectorStorageError::InvalidFormat("dimension exceeds u32".to_string()))?;
        let rows = u32::try_from(rows)
            .map_err(|_| VectorStorageError::InvalidFormat("row count exceeds u32".to_string()))?;

        writer.write_all(MAGIC_BYTES)?;
        writer.write_all(&STORAGE_VERSION.to_le_bytes())?;
        writer.write_all(&dimension.to_le_bytes())?;
        writer.write_all(&rows.to_le_bytes())?;
        Ok(())
    }

    fn read_header(bytes: &[u8]) -> Result<Header, VectorStorageError> {
        if bytes.len() < HEADER_SIZE {
            return Err(VectorStorageError::InvalidFormat(
                "File too small to contain header".to_string(),
            ));
        }

        if &bytes[0..4] != MAGIC_BYTES {
            return Err(VectorStorageError::InvalidFormat(
                "Invalid magic bytes".to_string(),
            ));
        }

        let word = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

        Ok(Header {
            version: word(4),
            dimension: VectorDimension::new(word(8) as usize)?,
            rows: word(12) as usize,
        })
    }
}
