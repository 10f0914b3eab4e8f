//! Column selections over a source table.

use crate::error::{Error, Result};

/// An ordered, validated list of source column indices.
///
/// Selects a subset and/or permutation of a source's columns. The same
/// source column may appear several times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColMapping {
    indices: Box<[usize]>,
    source_ncols: usize,
}

impl ColMapping {
    /// Column indices into a source with `source_ncols` columns.
    pub fn from_array(indices: Vec<usize>, source_ncols: usize) -> Result<Self> {
        if let Some(&index) = indices.iter().find(|&&index| index >= source_ncols) {
            return Err(Error::OutOfRange {
                index: index as i64,
                extent: source_ncols,
            });
        }

        Ok(ColMapping {
            indices: indices.into_boxed_slice(),
            source_ncols,
        })
    }

    /// Number of selected columns.
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether no column is selected.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of columns of the source.
    #[inline]
    pub fn source_ncols(&self) -> usize {
        self.source_ncols
    }

    /// Source column of the `i`-th selected column.
    #[inline]
    pub fn get(&self, i: usize) -> Option<usize> {
        self.indices.get(i).copied()
    }

    /// The selected source columns, in order.
    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Iterate over the selected source columns.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    /// Selecting `inner`'s columns out of `outer`'s selection.
    pub fn compose(outer: &ColMapping, inner: &ColMapping) -> Result<ColMapping> {
        if inner.source_ncols != outer.len() {
            return Err(Error::ExtentMismatch {
                expected: outer.len(),
                actual: inner.source_ncols,
            });
        }

        Ok(ColMapping {
            indices: inner.iter().map(|i| outer.indices[i]).collect(),
            source_ncols: outer.source_ncols,
        })
    }
}
