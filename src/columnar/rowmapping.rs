//! Row selections over a source table.
//!
//! A [`RowMapping`] lists, in order, the absolute source rows that a view
//! exposes. It is validated against the source extent once, at construction,
//! and is immutable afterwards, so it can be shared freely between views and
//! threads.
//!
//! Three representations are kept:
//! - a single arithmetic [`Slice`],
//! - an explicit index array,
//! - a list of slices, which stays compact for range-filter results.
//!
//! [`RowMapping::compose`] keeps the slice forms whenever both operands are
//! slice-shaped and falls back to an index array otherwise.

use std::cmp::min;
use std::iter::FusedIterator;

use crate::columnar::column::{Column, Value};
use crate::columnar::stype::StorageType;
use crate::columnar::table::DataTable;
use crate::error::{Error, Result};

/// Arithmetic progression `start, start + step, ...` of `count` row indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    /// First index
    pub start: usize,
    /// Number of indices
    pub count: usize,
    /// Distance between consecutive indices; may be zero or negative
    pub step: i64,
}

impl Slice {
    /// Create a new slice.
    #[inline]
    pub fn new(start: usize, count: usize, step: i64) -> Self {
        Slice { start, count, step }
    }

    /// Slice selecting nothing.
    #[inline]
    pub fn empty() -> Self {
        Slice::new(0, 0, 1)
    }

    /// The `i`-th index of the progression. `i` must be below `count`.
    #[inline]
    pub fn get(&self, i: usize) -> usize {
        (self.start as i64 + i as i64 * self.step) as usize
    }

    /// Check that every index lies in `[0, extent)`.
    fn validate(&self, extent: usize) -> Result<()> {
        if self.count == 0 {
            return Ok(());
        }

        let first = self.start as i128;
        let last = first + (self.count as i128 - 1) * self.step as i128;
        for index in [first, last] {
            if index < 0 || index >= extent as i128 {
                return Err(Error::OutOfRange {
                    index: index.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
                    extent,
                });
            }
        }

        Ok(())
    }

    /// The progression obtained by reading `inner`'s positions through `self`.
    fn compose(&self, inner: &Slice) -> Slice {
        if inner.count == 0 {
            return Slice::empty();
        }

        Slice {
            start: self.get(inner.start),
            count: inner.count,
            step: self.step.saturating_mul(inner.step),
        }
    }
}

/// Representation tag of a [`RowMapping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowMappingKind {
    /// Single arithmetic progression
    Slice,
    /// Explicit index array
    Array,
    /// Ordered list of arithmetic progressions
    SliceList,
}

#[derive(Debug, Clone)]
enum Repr {
    Slice(Slice),
    Array(Box<[usize]>),
    /// `offsets[k]` is the number of rows selected by `slices[..k]`. No slice is empty.
    SliceList {
        slices: Box<[Slice]>,
        offsets: Box<[usize]>,
    },
}

/// An immutable, validated selection of source rows.
#[derive(Debug, Clone)]
pub struct RowMapping {
    repr: Repr,
    len: usize,
    source_len: usize,
}

impl RowMapping {
    /// Rows `start, start + step, ...` (`count` of them) of a source with `source_len` rows.
    pub fn from_slice(start: usize, count: usize, step: i64, source_len: usize) -> Result<Self> {
        let slice = Slice::new(start, count, step);
        slice.validate(source_len)?;

        Ok(RowMapping {
            repr: Repr::Slice(slice),
            len: count,
            source_len,
        })
    }

    /// Explicit row indices, in any order, duplicates allowed.
    pub fn from_array(indices: Vec<usize>, source_len: usize) -> Result<Self> {
        if let Some(&index) = indices.iter().find(|&&index| index >= source_len) {
            return Err(Error::OutOfRange {
                index: index as i64,
                extent: source_len,
            });
        }

        Ok(RowMapping {
            len: indices.len(),
            repr: Repr::Array(indices.into_boxed_slice()),
            source_len,
        })
    }

    /// Concatenation of several slices.
    ///
    /// Slices are expected in ascending, non-overlapping order. That is not
    /// re-checked here; only the range of every index is.
    pub fn from_slicelist(slices: Vec<Slice>, source_len: usize) -> Result<Self> {
        for slice in &slices {
            slice.validate(source_len)?;
        }

        Ok(Self::slicelist_unchecked(slices, source_len))
    }

    /// Rows whose value in the boolean column `column` is true, ascending.
    ///
    /// False and NA entries are skipped.
    pub fn from_boolean_column(column: &Column) -> Result<Self> {
        if column.stype() != StorageType::BooleanI1 {
            return Err(Error::TypeMismatch {
                expected: StorageType::BooleanI1,
                actual: column.stype(),
            });
        }

        let indices = column
            .as_bytes()
            .iter()
            .enumerate()
            .filter(|&(_, &byte)| byte == 1)
            .map(|(row, _)| row)
            .collect::<Vec<_>>();

        Ok(RowMapping {
            len: indices.len(),
            repr: Repr::Array(indices.into_boxed_slice()),
            source_len: column.nrows(),
        })
    }

    /// Rows of `table` selected by its single boolean column.
    ///
    /// `table` may itself be a view; its rows are read through its mappings,
    /// so the result indexes `table`'s rows, not its source's.
    pub fn from_boolean_table(table: &DataTable) -> Result<Self> {
        if table.ncols() != 1 {
            return Err(Error::ExtentMismatch {
                expected: 1,
                actual: table.ncols(),
            });
        }
        let stype = table.column_stype(0)?;
        if stype != StorageType::BooleanI1 {
            return Err(Error::TypeMismatch {
                expected: StorageType::BooleanI1,
                actual: stype,
            });
        }

        let mut indices = Vec::new();
        for row in 0..table.nrows() {
            if table.value(row, 0)? == Value::Bool(true) {
                indices.push(row);
            }
        }

        RowMapping::from_array(indices, table.nrows())
    }

    fn slicelist_unchecked(slices: Vec<Slice>, source_len: usize) -> Self {
        let slices = slices
            .into_iter()
            .filter(|slice| slice.count > 0)
            .collect::<Vec<_>>();

        let mut offsets = Vec::with_capacity(slices.len());
        let mut len = 0;
        for slice in &slices {
            offsets.push(len);
            len += slice.count;
        }

        RowMapping {
            repr: Repr::SliceList {
                slices: slices.into_boxed_slice(),
                offsets: offsets.into_boxed_slice(),
            },
            len,
            source_len,
        }
    }

    /// Number of selected rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no row is selected.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of rows of the source this mapping indexes into.
    #[inline]
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// Representation of this mapping.
    #[inline]
    pub fn kind(&self) -> RowMappingKind {
        match self.repr {
            Repr::Slice(_) => RowMappingKind::Slice,
            Repr::Array(_) => RowMappingKind::Array,
            Repr::SliceList { .. } => RowMappingKind::SliceList,
        }
    }

    /// The single progression behind this mapping, if it is slice-shaped.
    #[inline]
    pub fn as_slice(&self) -> Option<Slice> {
        match self.repr {
            Repr::Slice(slice) => Some(slice),
            _ => None,
        }
    }

    /// Absolute source row of the `i`-th selected row.
    pub fn get(&self, i: usize) -> Option<usize> {
        if i >= self.len {
            return None;
        }

        match &self.repr {
            Repr::Slice(slice) => Some(slice.get(i)),
            Repr::Array(indices) => Some(indices[i]),
            Repr::SliceList { slices, offsets } => {
                let k = offsets.partition_point(|&offset| offset <= i) - 1;
                Some(slices[k].get(i - offsets[k]))
            }
        }
    }

    /// Iterate over the selected source rows in order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            mapping: self,
            pos: 0,
            slice: 0,
            within: 0,
        }
    }

    /// Mapping equivalent to selecting `inner`'s rows and reading them through
    /// `outer`: `result[i] == outer[inner[i]]`.
    ///
    /// `inner` must index into `outer`'s rows. Column data is never touched.
    pub fn compose(outer: &RowMapping, inner: &RowMapping) -> Result<RowMapping> {
        if inner.source_len != outer.len {
            return Err(Error::ExtentMismatch {
                expected: outer.len,
                actual: inner.source_len,
            });
        }

        let source_len = outer.source_len;
        let composed = match (&outer.repr, &inner.repr) {
            (Repr::Slice(o), Repr::Slice(i)) => RowMapping {
                repr: Repr::Slice(o.compose(i)),
                len: inner.len,
                source_len,
            },
            (Repr::Slice(o), Repr::SliceList { slices, .. }) => {
                let slices = slices.iter().map(|i| o.compose(i)).collect();
                Self::slicelist_unchecked(slices, source_len)
            }
            (Repr::SliceList { slices, offsets }, Repr::Slice(i)) => {
                let mut out = Vec::new();
                map_progression(slices, offsets, i, &mut out);
                Self::slicelist_unchecked(out, source_len)
            }
            (
                Repr::SliceList { slices, offsets },
                Repr::SliceList {
                    slices: inner_slices,
                    ..
                },
            ) => {
                let mut out = Vec::new();
                for i in inner_slices.iter() {
                    map_progression(slices, offsets, i, &mut out);
                }
                Self::slicelist_unchecked(out, source_len)
            }
            (_, Repr::Array(_)) | (Repr::Array(_), _) => {
                let indices = inner
                    .iter()
                    .map(|pos| outer.get(pos))
                    .collect::<Option<Vec<_>>>()
                    .ok_or(Error::ExtentMismatch {
                        expected: outer.len,
                        actual: inner.source_len,
                    })?;
                RowMapping {
                    len: indices.len(),
                    repr: Repr::Array(indices.into_boxed_slice()),
                    source_len,
                }
            }
        };

        debug_assert_eq!(composed.len, inner.len);
        Ok(composed)
    }
}

/// Split the positional progression `inner` over the segments of an outer
/// slice list, emitting one absolute slice per segment it touches.
fn map_progression(slices: &[Slice], offsets: &[usize], inner: &Slice, out: &mut Vec<Slice>) {
    let mut pos = inner.start as i64;
    let mut remaining = inner.count;

    while remaining > 0 {
        let k = offsets.partition_point(|&offset| offset as i64 <= pos) - 1;
        let segment = &slices[k];
        let local = pos as usize - offsets[k];

        let take = match inner.step {
            0 => remaining,
            step if step > 0 => min(remaining, (segment.count - 1 - local) / step as usize + 1),
            step => min(remaining, local / step.unsigned_abs() as usize + 1),
        };

        out.push(Slice {
            start: segment.get(local),
            count: take,
            step: segment.step.saturating_mul(inner.step),
        });

        pos += take as i64 * inner.step;
        remaining -= take;
    }
}

/// Iterator over the source rows of a [`RowMapping`].
#[derive(Debug)]
pub struct Iter<'a> {
    mapping: &'a RowMapping,
    pos: usize,
    slice: usize,
    within: usize,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.pos >= self.mapping.len {
            return None;
        }

        let row = match &self.mapping.repr {
            Repr::Slice(slice) => slice.get(self.pos),
            Repr::Array(indices) => indices[self.pos],
            Repr::SliceList { slices, .. } => {
                while self.within >= slices[self.slice].count {
                    self.slice += 1;
                    self.within = 0;
                }
                let row = slices[self.slice].get(self.within);
                self.within += 1;
                row
            }
        };

        self.pos += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.mapping.len - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a RowMapping {
    type Item = usize;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}
