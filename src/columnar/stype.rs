//! Storage type registry.
//!
//! Every column stores densely packed fixed-width elements of one
//! [`StorageType`]. The registry is a static table: it is complete at compile
//! time and has no write path.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Element encodings a column can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    /// Boolean stored in 1 byte: `0` false, `1` true, anything else NA.
    BooleanI1,

    /// 32-bit signed integer, `i32::MIN` is NA.
    IntegerI4,

    /// 64-bit signed integer, `i64::MIN` is NA.
    IntegerI8,

    /// 32-bit IEEE float, NaN is NA.
    RealF4,

    /// 64-bit IEEE float, NaN is NA.
    RealF8,
}

/// Static description of a storage type.
#[derive(Debug)]
pub struct STypeInfo {
    /// The storage type this entry describes
    pub stype: StorageType,
    /// Width of one element in bytes
    pub elemsize: usize,
    /// Short internal code
    pub code: &'static str,
    /// File-name suffix selecting this type
    pub token: &'static str,
    /// NA marker of one element, in native byte order
    pub na: &'static [u8],
}

/// NA marker for boolean columns.
pub const NA_I1: i8 = -128;

const NA_I1_BYTES: [u8; 1] = NA_I1.to_ne_bytes();
const NA_I4_BYTES: [u8; 4] = i32::MIN.to_ne_bytes();
const NA_I8_BYTES: [u8; 8] = i64::MIN.to_ne_bytes();
// Quiet NaN, the bit pattern of `f32::NAN` and `f64::NAN`
const NA_F4_BYTES: [u8; 4] = 0x7fc0_0000u32.to_ne_bytes();
const NA_F8_BYTES: [u8; 8] = 0x7ff8_0000_0000_0000u64.to_ne_bytes();

static STYPE_INFO: [STypeInfo; 5] = [
    STypeInfo {
        stype: StorageType::BooleanI1,
        elemsize: 1,
        code: "i1b",
        token: "bool",
        na: &NA_I1_BYTES,
    },
    STypeInfo {
        stype: StorageType::IntegerI4,
        elemsize: 4,
        code: "i4i",
        token: "int32",
        na: &NA_I4_BYTES,
    },
    STypeInfo {
        stype: StorageType::IntegerI8,
        elemsize: 8,
        code: "i8i",
        token: "int64",
        na: &NA_I8_BYTES,
    },
    STypeInfo {
        stype: StorageType::RealF4,
        elemsize: 4,
        code: "f4r",
        token: "float",
        na: &NA_F4_BYTES,
    },
    STypeInfo {
        stype: StorageType::RealF8,
        elemsize: 8,
        code: "f8r",
        token: "double",
        na: &NA_F8_BYTES,
    },
];

impl StorageType {
    /// Registry entry for this type.
    #[inline]
    pub fn info(self) -> &'static STypeInfo {
        let index = match self {
            StorageType::BooleanI1 => 0,
            StorageType::IntegerI4 => 1,
            StorageType::IntegerI8 => 2,
            StorageType::RealF4 => 3,
            StorageType::RealF8 => 4,
        };
        &STYPE_INFO[index]
    }

    /// Width of one element in bytes.
    #[inline]
    pub fn elemsize(self) -> usize {
        self.info().elemsize
    }

    /// File-name suffix of this type.
    #[inline]
    pub fn token(self) -> &'static str {
        self.info().token
    }

    /// Resolve a file-name type token such as `int64`.
    pub fn parse(token: &str) -> Result<StorageType> {
        STYPE_INFO
            .iter()
            .find(|info| info.token == token)
            .map(|info| info.stype)
            .ok_or_else(|| Error::UnknownType {
                token: token.to_string(),
                origin: "type token".to_string(),
            })
    }

    /// All registered types, in registry order.
    pub fn all() -> impl Iterator<Item = StorageType> {
        STYPE_INFO.iter().map(|info| info.stype)
    }

    /// Short internal code, e.g. `i8i`.
    #[inline]
    pub fn code(self) -> &'static str {
        self.info().code
    }

    /// Bytes of the NA marker of this type, in native byte order.
    #[inline]
    pub fn na_bytes(self) -> &'static [u8] {
        self.info().na
    }
}

impl FromStr for StorageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        StorageType::parse(s)
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
