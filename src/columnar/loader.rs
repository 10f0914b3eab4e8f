//! Building tables from memory-mapped column files.
//!
//! Each file holds one column: raw, densely packed native-endian elements
//! with no header. Its name encodes the column name and the element type as
//! `<name>.<type-token>`, for example `price.double`.
//!
//! Loading is all-or-nothing. Every mapping acquired during a failed load is
//! unmapped before the error is returned.

use std::fs::File;
use std::io;
use std::num::NonZeroUsize;
use std::panic;
use std::path::Path;
use std::thread;
use std::time::Instant;

use crate::columnar::column::Column;
use crate::columnar::stype::StorageType;
use crate::columnar::table::DataTable;
use crate::error::{Error, Result};
use crate::mmap::MmapOptions;
use crate::platform::Advice;

/// Options for loading a table from column files.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Map the files on scoped worker threads, at most one per available core.
    pub parallel: bool,

    /// Access hint applied to every mapping.
    pub advice: Option<Advice>,

    /// Prefault every mapping while loading.
    pub populate: bool,

    /// Ignore a partial element at the end of a file instead of failing.
    pub allow_trailing_bytes: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            parallel: true,
            advice: None,
            populate: false,
            allow_trailing_bytes: false,
        }
    }
}

impl LoadOptions {
    /// Create the default load options.
    #[inline]
    pub fn new() -> LoadOptions {
        LoadOptions::default()
    }

    /// Configure whether files are mapped concurrently.
    #[inline]
    pub fn parallel(mut self, parallel: bool) -> LoadOptions {
        self.parallel = parallel;
        self
    }

    /// Configure the access hint applied to every mapping.
    #[inline]
    pub fn advice(mut self, advice: Advice) -> LoadOptions {
        self.advice = Some(advice);
        self
    }

    /// Configure whether mappings are prefaulted while loading.
    #[inline]
    pub fn populate(mut self, populate: bool) -> LoadOptions {
        self.populate = populate;
        self
    }

    /// Configure whether a trailing partial element is silently dropped.
    #[inline]
    pub fn allow_trailing_bytes(mut self, allow: bool) -> LoadOptions {
        self.allow_trailing_bytes = allow;
        self
    }

    /// Map every file in `paths` and assemble them, in order, into a data-owning table.
    ///
    /// All type suffixes are resolved before the first file is opened. The
    /// first file fixes the row count that every other file must match.
    pub fn load<P: AsRef<Path>>(&self, paths: &[P]) -> Result<DataTable> {
        let started = Instant::now();

        let files = paths
            .iter()
            .map(|path| resolve(path.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let loaded: Result<Vec<Column>> = if self.parallel && files.len() > 1 {
            self.map_parallel(&files)
        } else {
            files.iter().map(|file| self.map_column(file)).collect()
        };

        let table = loaded.and_then(|columns| {
            let names = files.iter().map(|file| file.name.clone()).collect::<Vec<_>>();
            let nrows = columns.first().map_or(0, Column::nrows);
            let reference = names
                .first()
                .map_or_else(|| "the table".to_string(), |name| format!("column `{name}`"));
            DataTable::assemble(nrows, &reference, names, columns)
        });

        match &table {
            Ok(table) => log::info!(
                "loaded {} columns of {} rows in {:?}",
                table.ncols(),
                table.nrows(),
                started.elapsed()
            ),
            Err(err) => log::debug!("rolled back load of {} files: {err}", files.len()),
        }
        table
    }

    /// Map `files` on scoped worker threads, each taking a contiguous share.
    ///
    /// A share whose thread cannot be spawned is mapped on the calling thread.
    /// Results keep the order of `files`; collecting stops at the first failure
    /// and drops every column mapped so far.
    fn map_parallel(&self, files: &[ColumnFile<'_>]) -> Result<Vec<Column>> {
        let workers = thread::available_parallelism()
            .map_or(1, NonZeroUsize::get)
            .min(files.len());
        let share_len = files.len().div_ceil(workers);

        thread::scope(|scope| {
            let shares = files
                .chunks(share_len)
                .map(|share| {
                    thread::Builder::new()
                        .name("column-loader".to_string())
                        .spawn_scoped(scope, move || self.map_share(share))
                        .map_err(|err| {
                            log::debug!("mapping {} files inline, cannot spawn a loader thread: {err}", share.len());
                            share
                        })
                })
                .collect::<Vec<_>>();

            let mut loaded = Vec::with_capacity(files.len());
            for share in shares {
                let mapped = match share {
                    Ok(handle) => handle
                        .join()
                        .unwrap_or_else(|payload| panic::resume_unwind(payload)),
                    Err(share) => self.map_share(share),
                };
                loaded.extend(mapped);
            }
            loaded.into_iter().collect()
        })
    }

    fn map_share(&self, share: &[ColumnFile<'_>]) -> Vec<Result<Column>> {
        share.iter().map(|file| self.map_column(file)).collect()
    }

    /// Open, check and map a single column file.
    fn map_column(&self, file: &ColumnFile<'_>) -> Result<Column> {
        let path = file.path;
        let handle = File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let size = handle
            .metadata()
            .map_err(|source| Error::Io {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        if size == 0 {
            return Err(Error::EmptyFile {
                path: path.to_path_buf(),
            });
        }
        let len = usize::try_from(size)
            .ok()
            .filter(|&len| len <= isize::MAX as usize)
            .ok_or_else(|| Error::FileTooLarge {
                path: path.to_path_buf(),
                size,
            })?;

        let mut options = MmapOptions::new().len(len).populate(self.populate);
        options.advice = self.advice;
        // SAFETY: the mapping is read-only and private; callers must not
        // truncate column files while a table built from them is alive
        let map = unsafe { options.map(&handle) }.map_err(|source| match source.kind() {
            io::ErrorKind::Unsupported => Error::Unsupported,
            _ => Error::MapFailed {
                path: path.to_path_buf(),
                source,
            },
        })?;
        drop(handle);

        let elemsize = file.stype.elemsize();
        let byte_length = if self.allow_trailing_bytes {
            len - len % elemsize
        } else {
            len
        };
        let column = Column::from_mapped(file.stype, map, byte_length)?;

        log::debug!(
            "mapped column `{}` ({}, {} rows) from {}",
            file.name,
            file.stype,
            column.nrows(),
            path.display()
        );
        Ok(column)
    }
}

/// A column file whose name has been resolved, before anything is opened.
#[derive(Debug)]
struct ColumnFile<'a> {
    path: &'a Path,
    name: String,
    stype: StorageType,
}

/// Load a table from column files with the default options.
pub fn load_mapped<P: AsRef<Path>>(paths: &[P]) -> Result<DataTable> {
    LoadOptions::default().load(paths)
}

/// Split a column file name into column name and storage type.
fn resolve(path: &Path) -> Result<ColumnFile<'_>> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    let (name, token) = file_name
        .rsplit_once('.')
        .ok_or_else(|| Error::MissingTypeSuffix {
            path: path.to_path_buf(),
        })?;

    let stype = StorageType::parse(token).map_err(|_| Error::UnknownType {
        token: token.to_string(),
        origin: path.display().to_string(),
    })?;

    Ok(ColumnFile {
        path,
        name: name.to_string(),
        stype,
    })
}
