//! Typed column buffers.
//!
//! A [`Column`] is one contiguous buffer of fixed-width elements plus the
//! knowledge of where that buffer came from. The origin is a tagged variant
//! (`ColumnData`) so that releasing a column is an exhaustive match: owned
//! buffers are freed, mapped regions are unmapped, views leave the referenced
//! data alone.

use std::sync::Arc;

use crate::columnar::stype::StorageType;
use crate::error::{Error, Result};
use crate::mmap::Mmap;

/// Where the memory of a column comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    /// Heap buffer owned by the column
    OwnedHeap,
    /// Read-only file mapping owned by the column
    MemoryMapped,
    /// Window into another column's buffer
    View,
}

/// Backing storage of a column, carrying exactly what its release needs.
#[derive(Debug)]
pub(crate) enum ColumnData {
    /// Freed on drop.
    Owned(Box<[u8]>),
    /// Unmapped on drop. `len` is the usable prefix of the mapping.
    Mapped { map: Mmap, len: usize },
    /// Byte range `[offset, offset + len)` of `source`, which is never released from here.
    View {
        source: Arc<Column>,
        offset: usize,
        len: usize,
    },
}

/// A single typed element read from a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Missing value
    Na,
    /// Boolean value
    Bool(bool),
    /// Integer value, widened to 64 bits
    Int(i64),
    /// Real value, widened to 64 bits
    Real(f64),
}

/// A column of fixed-width elements.
#[derive(Debug)]
pub struct Column {
    stype: StorageType,
    data: ColumnData,
    meta: Option<Box<[u8]>>,
}

impl Column {
    /// Allocate a zero-filled column of `nrows` elements.
    ///
    /// Fails with [`Error::OutOfRange`] if the buffer would exceed `isize::MAX` bytes.
    pub fn new_owned(stype: StorageType, nrows: usize) -> Result<Self> {
        let elemsize = stype.elemsize();
        let size = nrows
            .checked_mul(elemsize)
            .filter(|&size| size <= isize::MAX as usize)
            .ok_or(Error::OutOfRange {
                index: i64::try_from(nrows).unwrap_or(i64::MAX),
                extent: isize::MAX as usize / elemsize,
            })?;

        Ok(Column {
            stype,
            data: ColumnData::Owned(vec![0u8; size].into_boxed_slice()),
            meta: None,
        })
    }

    /// Take ownership of a pre-filled buffer of densely packed native-endian elements.
    pub fn from_bytes(stype: StorageType, bytes: Vec<u8>) -> Result<Self> {
        check_whole_elements(stype, bytes.len())?;

        Ok(Column {
            stype,
            data: ColumnData::Owned(bytes.into_boxed_slice()),
            meta: None,
        })
    }

    /// Wrap a file mapping, using its first `byte_length` bytes as column data.
    pub fn from_mapped(stype: StorageType, map: Mmap, byte_length: usize) -> Result<Self> {
        if byte_length > map.len() {
            return Err(Error::ExtentMismatch {
                expected: map.len(),
                actual: byte_length,
            });
        }
        check_whole_elements(stype, byte_length)?;

        Ok(Column {
            stype,
            data: ColumnData::Mapped {
                map,
                len: byte_length,
            },
            meta: None,
        })
    }

    /// A column sharing rows `[start_row, start_row + nrows)` of `source` without copying.
    ///
    /// Views of views point straight at the underlying buffer owner.
    pub fn view(source: Arc<Column>, start_row: usize, nrows: usize) -> Result<Self> {
        if start_row
            .checked_add(nrows)
            .map_or(true, |end| end > source.nrows())
        {
            return Err(Error::OutOfRange {
                index: start_row.saturating_add(nrows) as i64,
                extent: source.nrows(),
            });
        }

        let elemsize = source.stype.elemsize();
        let stype = source.stype;
        let parent = match &source.data {
            ColumnData::View { source, offset, .. } => Some((Arc::clone(source), *offset)),
            ColumnData::Owned(_) | ColumnData::Mapped { .. } => None,
        };
        let (owner, base) = parent.unwrap_or((source, 0));

        Ok(Column {
            stype,
            data: ColumnData::View {
                source: owner,
                offset: base + start_row * elemsize,
                len: nrows * elemsize,
            },
            meta: None,
        })
    }

    /// Column of booleans.
    pub fn from_bools(values: &[bool]) -> Self {
        let bytes = values.iter().map(|&v| v as u8).collect::<Vec<_>>();
        Column {
            stype: StorageType::BooleanI1,
            data: ColumnData::Owned(bytes.into_boxed_slice()),
            meta: None,
        }
    }

    /// Column of 64-bit integers.
    pub fn from_i64s(values: &[i64]) -> Self {
        let bytes = values.iter().flat_map(|v| v.to_ne_bytes()).collect::<Vec<_>>();
        Column {
            stype: StorageType::IntegerI8,
            data: ColumnData::Owned(bytes.into_boxed_slice()),
            meta: None,
        }
    }

    /// Column of 64-bit reals.
    pub fn from_f64s(values: &[f64]) -> Self {
        let bytes = values.iter().flat_map(|v| v.to_ne_bytes()).collect::<Vec<_>>();
        Column {
            stype: StorageType::RealF8,
            data: ColumnData::Owned(bytes.into_boxed_slice()),
            meta: None,
        }
    }

    /// Attach auxiliary data for variable-width encodings.
    pub fn with_meta(mut self, meta: Vec<u8>) -> Self {
        self.meta = Some(meta.into_boxed_slice());
        self
    }

    /// Element type of the column.
    #[inline]
    pub fn stype(&self) -> StorageType {
        self.stype
    }

    /// Origin of the column's memory.
    #[inline]
    pub fn memory_kind(&self) -> MemoryKind {
        match self.data {
            ColumnData::Owned(_) => MemoryKind::OwnedHeap,
            ColumnData::Mapped { .. } => MemoryKind::MemoryMapped,
            ColumnData::View { .. } => MemoryKind::View,
        }
    }

    /// Auxiliary data, if any.
    #[inline]
    pub fn meta(&self) -> Option<&[u8]> {
        self.meta.as_deref()
    }

    /// Length of the column's data in bytes.
    #[inline]
    pub fn alloc_size(&self) -> usize {
        match &self.data {
            ColumnData::Owned(bytes) => bytes.len(),
            ColumnData::Mapped { len, .. } | ColumnData::View { len, .. } => *len,
        }
    }

    /// Number of elements.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.alloc_size() / self.stype.elemsize()
    }

    /// The raw data, densely packed.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.data {
            ColumnData::Owned(bytes) => bytes,
            ColumnData::Mapped { map, len } => &map[..*len],
            ColumnData::View {
                source,
                offset,
                len,
            } => &source.as_bytes()[*offset..*offset + *len],
        }
    }

    /// Bytes of the element at `row`.
    #[inline]
    pub fn element_bytes(&self, row: usize) -> Option<&[u8]> {
        let width = self.stype.elemsize();
        let start = row.checked_mul(width)?;
        self.as_bytes().get(start..start.checked_add(width)?)
    }

    /// Typed element at `row`.
    pub fn value(&self, row: usize) -> Result<Value> {
        let bytes = self.element_bytes(row).ok_or(Error::OutOfRange {
            index: row as i64,
            extent: self.nrows(),
        })?;
        Ok(decode(self.stype, bytes))
    }

    /// Get a boolean value at the given row index.
    pub fn get_bool(&self, row: usize) -> Option<bool> {
        match self.value(row).ok()? {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Get an integer value at the given row index.
    pub fn get_i64(&self, row: usize) -> Option<i64> {
        match self.value(row).ok()? {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Get a real value at the given row index.
    pub fn get_f64(&self, row: usize) -> Option<f64> {
        match self.value(row).ok()? {
            Value::Real(v) => Some(v),
            _ => None,
        }
    }

    /// Copy the elements at `rows` into a new owned column.
    ///
    /// Every index must be below `self.nrows()`; row mappings guarantee this
    /// at construction.
    pub(crate) fn gather(&self, rows: impl Iterator<Item = usize>, count: usize) -> Column {
        let width = self.stype.elemsize();
        let src = self.as_bytes();
        let mut bytes = Vec::with_capacity(count * width);
        for row in rows {
            bytes.extend_from_slice(&src[row * width..(row + 1) * width]);
        }

        Column {
            stype: self.stype,
            data: ColumnData::Owned(bytes.into_boxed_slice()),
            meta: None,
        }
    }

    /// Release the column's buffer according to its memory kind.
    ///
    /// Consuming `self` makes a second release impossible.
    pub fn release(self) -> MemoryKind {
        let kind = self.memory_kind();
        drop(self);
        kind
    }
}

impl Drop for Column {
    fn drop(&mut self) {
        match &self.data {
            ColumnData::Owned(bytes) => log::trace!("freeing {} bytes of {} column", bytes.len(), self.stype),
            ColumnData::Mapped { map, .. } => log::trace!("unmapping {} bytes of {} column", map.len(), self.stype),
            ColumnData::View { .. } => log::trace!("dropping {} view column", self.stype),
        }
    }
}

fn check_whole_elements(stype: StorageType, byte_length: usize) -> Result<()> {
    let elemsize = stype.elemsize();
    if byte_length % elemsize != 0 {
        return Err(Error::SizeMismatch {
            stype,
            elemsize,
            byte_length,
        });
    }
    Ok(())
}

fn fixed<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

fn decode(stype: StorageType, bytes: &[u8]) -> Value {
    match stype {
        StorageType::BooleanI1 => match bytes[0] {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            _ => Value::Na,
        },
        StorageType::IntegerI4 => match i32::from_ne_bytes(fixed(bytes)) {
            i32::MIN => Value::Na,
            v => Value::Int(v as i64),
        },
        StorageType::IntegerI8 => match i64::from_ne_bytes(fixed(bytes)) {
            i64::MIN => Value::Na,
            v => Value::Int(v),
        },
        StorageType::RealF4 => {
            let v = f32::from_ne_bytes(fixed(bytes));
            if v.is_nan() {
                Value::Na
            } else {
                Value::Real(v as f64)
            }
        }
        StorageType::RealF8 => {
            let v = f64::from_ne_bytes(fixed(bytes));
            if v.is_nan() {
                Value::Na
            } else {
                Value::Real(v)
            }
        }
    }
}
