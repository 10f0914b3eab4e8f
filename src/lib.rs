//! # datatable-core
//!
//! `datatable_core` is the storage kernel of a columnar data-table engine.
//! It keeps typed columns in owned heap buffers or read-only memory-mapped
//! files, and narrows tables into zero-copy views through composable row and
//! column mappings.
//!
//! ## Features
//!
//! - Static registry of fixed-width storage types with NA sentinels
//! - Columns that know whether their buffer is owned, mapped or borrowed
//! - Row mappings as slices, index arrays or slice lists, composed without copying
//! - Views that keep their source table alive and never nest
//! - All-or-nothing loading of `<name>.<type>` column files, optionally in parallel
//!
//! ## Example
//!
//! ```
//! use datatable_core::{load_mapped, RowMapping, Value};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let ids = dir.path().join("id.int64");
//! let bytes: Vec<u8> = [3i64, 1, 4, 1, 5].iter().flat_map(|v| v.to_ne_bytes()).collect();
//! std::fs::write(&ids, bytes)?;
//!
//! let table = Arc::new(load_mapped(&[&ids])?);
//! assert_eq!(table.names(), &["id"]);
//!
//! // Every other row, read through the mapped file
//! let view = table.select_rows(RowMapping::from_slice(0, 3, 2, table.nrows())?)?;
//! assert_eq!(view.value(2, 0)?, Value::Int(5));
//! # Ok(())
//! # }
//! ```

pub mod columnar;
pub mod error;
pub mod mmap;
pub mod platform;

pub use columnar::{
    load_mapped, ColMapping, Column, DataTable, LoadOptions, MemoryKind, RowMapping,
    RowMappingKind, Slice, StorageType, TableBuilder, Value,
};
pub use error::{Error, Result};
pub use mmap::{Mmap, MmapOptions};
pub use platform::Advice;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
