//! Tables of equally long columns, and zero-copy views over them.
//!
//! A [`DataTable`] is either data-owning, holding its columns directly, or a
//! view, holding a shared reference to an owning source plus a row and/or
//! column mapping. Views never own column buffers; reading `(row, col)` of a
//! view resolves both indices through its mappings into the source.
//!
//! Views of views are flattened on construction: the new mapping is composed
//! with the existing one and the new view points at the original owner.

use std::sync::Arc;

use crate::columnar::colmapping::ColMapping;
use crate::columnar::column::{Column, Value};
use crate::columnar::rowmapping::RowMapping;
use crate::columnar::stype::StorageType;
use crate::error::{Error, Result};

/// A table in the columnar store.
#[derive(Debug)]
pub struct DataTable {
    /// Number of visible rows
    nrows: usize,

    /// Names of the visible columns
    names: Vec<String>,

    /// Column buffers; empty for views
    columns: Vec<Arc<Column>>,

    /// Row selection into `source`
    rowmapping: Option<Arc<RowMapping>>,

    /// Column selection into `source`
    colmapping: Option<Arc<ColMapping>>,

    /// Owning table this view reads from
    source: Option<Arc<DataTable>>,
}

impl DataTable {
    /// Assemble a data-owning table. Columns are named `C0`, `C1`, ...
    ///
    /// Fails with [`Error::RowCountMismatch`] if any column does not hold
    /// exactly `nrows` elements.
    pub fn from_columns(nrows: usize, columns: Vec<Column>) -> Result<Self> {
        let names = (0..columns.len()).map(|i| format!("C{i}")).collect();
        Self::assemble(nrows, "the table", names, columns)
    }

    /// Assemble a data-owning table from named columns.
    pub fn from_named_columns(nrows: usize, columns: Vec<(String, Column)>) -> Result<Self> {
        let (names, columns) = columns.into_iter().unzip();
        Self::assemble(nrows, "the table", names, columns)
    }

    /// Shared owning constructor; `reference` names what fixed `nrows` in errors.
    pub(crate) fn assemble(
        nrows: usize,
        reference: &str,
        names: Vec<String>,
        columns: Vec<Column>,
    ) -> Result<Self> {
        debug_assert_eq!(names.len(), columns.len());

        for (name, column) in names.iter().zip(&columns) {
            if column.nrows() != nrows {
                return Err(Error::RowCountMismatch {
                    column: name.clone(),
                    actual: column.nrows(),
                    expected: nrows,
                    reference: reference.to_string(),
                });
            }
        }

        Ok(DataTable {
            nrows,
            names,
            columns: columns.into_iter().map(Arc::new).collect(),
            rowmapping: None,
            colmapping: None,
            source: None,
        })
    }

    /// A view of `self`'s rows selected by `rowmapping`, sharing all column data.
    ///
    /// `rowmapping` must index into `self`'s rows.
    pub fn select_rows(self: &Arc<Self>, rowmapping: RowMapping) -> Result<DataTable> {
        if rowmapping.source_len() != self.nrows {
            return Err(Error::ExtentMismatch {
                expected: self.nrows,
                actual: rowmapping.source_len(),
            });
        }

        let (source, rowmapping) = match &self.source {
            Some(source) => {
                let rowmapping = match &self.rowmapping {
                    Some(outer) => RowMapping::compose(outer, &rowmapping)?,
                    None => rowmapping,
                };
                (Arc::clone(source), rowmapping)
            }
            None => (Arc::clone(self), rowmapping),
        };
        log::trace!(
            "row view of {} rows ({:?}) over {} source rows",
            rowmapping.len(),
            rowmapping.kind(),
            source.nrows
        );

        Ok(DataTable {
            nrows: rowmapping.len(),
            names: self.names.clone(),
            columns: Vec::new(),
            rowmapping: Some(Arc::new(rowmapping)),
            colmapping: self.colmapping.clone(),
            source: Some(source),
        })
    }

    /// A view of `self`'s columns selected by `colmapping`, sharing all column data.
    pub fn select_columns(self: &Arc<Self>, colmapping: ColMapping) -> Result<DataTable> {
        if colmapping.source_ncols() != self.ncols() {
            return Err(Error::ExtentMismatch {
                expected: self.ncols(),
                actual: colmapping.source_ncols(),
            });
        }

        let names = colmapping.iter().map(|i| self.names[i].clone()).collect();
        let (source, colmapping) = match &self.source {
            Some(source) => {
                let colmapping = match &self.colmapping {
                    Some(outer) => ColMapping::compose(outer, &colmapping)?,
                    None => colmapping,
                };
                (Arc::clone(source), colmapping)
            }
            None => (Arc::clone(self), colmapping),
        };

        Ok(DataTable {
            nrows: self.nrows,
            names,
            columns: Vec::new(),
            rowmapping: self.rowmapping.clone(),
            colmapping: Some(Arc::new(colmapping)),
            source: Some(source),
        })
    }

    /// Number of visible columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.names.len()
    }

    /// Number of visible rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Names of the visible columns.
    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Index of the column called `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Whether this table reads through another table's columns.
    #[inline]
    pub fn is_view(&self) -> bool {
        self.source.is_some()
    }

    /// The owning table behind a view.
    #[inline]
    pub fn source(&self) -> Option<&Arc<DataTable>> {
        self.source.as_ref()
    }

    /// Row selection of a view.
    #[inline]
    pub fn rowmapping(&self) -> Option<&Arc<RowMapping>> {
        self.rowmapping.as_ref()
    }

    /// Column selection of a view.
    #[inline]
    pub fn colmapping(&self) -> Option<&Arc<ColMapping>> {
        self.colmapping.as_ref()
    }

    /// The full-length column behind visible column `col`.
    ///
    /// For a row view this is the source's column: its rows are not
    /// restricted by the view's row mapping.
    pub fn column(&self, col: usize) -> Result<&Arc<Column>> {
        if col >= self.ncols() {
            return Err(Error::OutOfRange {
                index: col as i64,
                extent: self.ncols(),
            });
        }

        match &self.source {
            None => Ok(&self.columns[col]),
            Some(source) => {
                let index = match &self.colmapping {
                    Some(colmapping) => colmapping.indices()[col],
                    None => col,
                };
                Ok(&source.columns[index])
            }
        }
    }

    /// Storage type of visible column `col`.
    pub fn column_stype(&self, col: usize) -> Result<StorageType> {
        Ok(self.column(col)?.stype())
    }

    /// Read the element at `(row, col)`, resolving the view's mappings.
    pub fn value(&self, row: usize, col: usize) -> Result<Value> {
        if row >= self.nrows {
            return Err(Error::OutOfRange {
                index: row as i64,
                extent: self.nrows,
            });
        }

        let column = self.column(col)?;
        let source_row = match &self.rowmapping {
            Some(rowmapping) => rowmapping.get(row).ok_or(Error::OutOfRange {
                index: row as i64,
                extent: rowmapping.len(),
            })?,
            None => row,
        };
        column.value(source_row)
    }

    /// A data-owning table with the same visible content.
    ///
    /// Columns that need no row selection are shared, contiguous step-1 row
    /// slices become view columns, and everything else is copied.
    pub fn materialize(&self) -> Result<DataTable> {
        let mut columns = Vec::with_capacity(self.ncols());
        for col in 0..self.ncols() {
            let base = self.column(col)?;
            let column = match self.rowmapping.as_deref() {
                None => Arc::clone(base),
                Some(rowmapping) => match rowmapping.as_slice() {
                    Some(slice) if slice.step == 1 || slice.count <= 1 => {
                        let start = if slice.count == 0 { 0 } else { slice.start };
                        Arc::new(Column::view(Arc::clone(base), start, slice.count)?)
                    }
                    _ => Arc::new(base.gather(rowmapping.iter(), rowmapping.len())),
                },
            };
            columns.push(column);
        }

        Ok(DataTable {
            nrows: self.nrows,
            names: self.names.clone(),
            columns,
            rowmapping: None,
            colmapping: None,
            source: None,
        })
    }
}

/// Builder collecting named columns into a data-owning table.
#[derive(Debug, Default)]
pub struct TableBuilder {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl TableBuilder {
    /// Create a new table builder.
    pub fn new() -> Self {
        TableBuilder::default()
    }

    /// Append a named column.
    pub fn column(mut self, name: impl Into<String>, column: Column) -> Self {
        self.names.push(name.into());
        self.columns.push(column);
        self
    }

    /// Build the table; the first column fixes the row count.
    pub fn build(self) -> Result<DataTable> {
        let (nrows, reference) = match (self.columns.first(), self.names.first()) {
            (Some(column), Some(name)) => (column.nrows(), format!("column `{name}`")),
            _ => (0, "the table".to_string()),
        };
        DataTable::assemble(nrows, &reference, self.names, self.columns)
    }
}
