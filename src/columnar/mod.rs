//! Columnar tables built on top of the memory mapping layer.
//!
//! Tables own typed columns that live on the heap, in read-only file
//! mappings, or in another column's buffer. Row and column mappings narrow a
//! table into views that share the same buffers.

pub mod colmapping;
pub mod column;
pub mod loader;
pub mod rowmapping;
pub mod stype;
pub mod table;

pub use colmapping::ColMapping;
pub use column::{Column, MemoryKind, Value};
pub use loader::{load_mapped, LoadOptions};
pub use rowmapping::{RowMapping, RowMappingKind, Slice};
pub use stype::{STypeInfo, StorageType};
pub use table::{DataTable, TableBuilder};
