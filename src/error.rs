//! Error handling for column storage, mappings and the file loader.

use std::io;
use std::path::PathBuf;
use std::result;

use thiserror::Error;

use crate::columnar::stype::StorageType;

/// A specialized `Result` type for table operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while building columns, mappings and tables.
#[derive(Error, Debug)]
pub enum Error {
    /// A type token is not known to the type registry.
    #[error("unknown column type `{token}` in {origin}")]
    UnknownType {
        /// The unrecognized token
        token: String,
        /// Where the token came from (a file path or the token itself)
        origin: String,
    },

    /// A column file name carries no `.<type>` suffix.
    #[error("cannot find a type suffix in column file {path:?}")]
    MissingTypeSuffix {
        /// The offending path
        path: PathBuf,
    },

    /// Opening or inspecting a column file failed.
    #[error("error opening file {path:?}: {source}")]
    Io {
        /// The offending path
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// A column file has no content.
    #[error("file is empty: {path:?}")]
    EmptyFile {
        /// The offending path
        path: PathBuf,
    },

    /// A column file cannot be addressed on this platform.
    #[error("file {path:?} is too big for this platform: {size} bytes")]
    FileTooLarge {
        /// The offending path
        path: PathBuf,
        /// File length in bytes
        size: u64,
    },

    /// The OS refused to memory-map a column file.
    #[error("failed to memory-map the file {path:?}: {source}")]
    MapFailed {
        /// The offending path
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// A column's element count differs from the table's row count.
    #[error("column `{column}` contains {actual} rows, whereas {reference} has {expected} rows")]
    RowCountMismatch {
        /// Column that disagrees
        column: String,
        /// Its element count
        actual: usize,
        /// Row count of the table
        expected: usize,
        /// What established the row count, e.g. the first column
        reference: String,
    },

    /// A buffer length is not a whole number of elements.
    #[error("buffer of {byte_length} bytes is not a multiple of the {stype} element width ({elemsize} bytes)")]
    SizeMismatch {
        /// Element type of the column
        stype: StorageType,
        /// Element width in bytes
        elemsize: usize,
        /// Offending buffer length
        byte_length: usize,
    },

    /// An index lies outside of the extent it refers to.
    #[error("index {index} is out of range for extent {extent}")]
    OutOfRange {
        /// Offending index (may be negative for slices)
        index: i64,
        /// Number of valid positions
        extent: usize,
    },

    /// A column has a different storage type than the operation requires.
    #[error("expected a column of type {expected}, found {actual}")]
    TypeMismatch {
        /// Required type
        expected: StorageType,
        /// Actual type
        actual: StorageType,
    },

    /// Two extents that must agree do not.
    #[error("extent mismatch: expected {expected}, got {actual}")]
    ExtentMismatch {
        /// Required extent
        expected: usize,
        /// Supplied extent
        actual: usize,
    },

    /// Memory mapping is not available on this platform.
    #[error("memory mapping is not supported on this platform")]
    Unsupported,
}
