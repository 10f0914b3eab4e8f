//! Read-only memory mapping of column files.
//!
//! A column file is mapped whole, read-only and private. The mapping lives in
//! an [`Mmap`] whose `Drop` unmaps the region, so every mapping the loader
//! acquires is released on every exit path without explicit bookkeeping.

use std::fs::File;
use std::io;
use std::ops::Deref;
use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::platform::{self, Advice};

/// Statistics for memory mapping operations
static TOTAL_MAPPED_MEMORY: AtomicUsize = AtomicUsize::new(0);
static ACTIVE_MAPPINGS: AtomicUsize = AtomicUsize::new(0);

/// Configuration options for memory mapping.
#[derive(Debug, Clone, Default)]
pub struct MmapOptions {
    /// The length of the memory map; the file length when unset.
    len: Option<usize>,

    /// Access hint passed to the kernel once the map exists.
    pub advice: Option<Advice>,

    /// Whether to populate (prefault) the map.
    pub populate: bool,
}

impl MmapOptions {
    /// Create a new set of options for configuring memory maps.
    #[inline]
    pub fn new() -> MmapOptions {
        MmapOptions::default()
    }

    /// Set the length of the memory map.
    #[inline]
    pub fn len(mut self, len: usize) -> MmapOptions {
        self.len = Some(len);
        self
    }

    /// Configure the access hint applied after mapping.
    #[inline]
    pub fn advice(mut self, advice: Advice) -> MmapOptions {
        self.advice = Some(advice);
        self
    }

    /// Configure the memory map to be pre-populated (prefaulted).
    #[inline]
    pub fn populate(mut self, populate: bool) -> MmapOptions {
        self.populate = populate;
        self
    }

    /// Create a read-only memory map backed by a file.
    ///
    /// The file descriptor may be closed as soon as this returns; the mapping
    /// stays valid on its own.
    ///
    /// # Safety
    ///
    /// The map aliases the file. If the file is truncated or rewritten by
    /// another process while mapped, reads may observe the change or fault.
    pub unsafe fn map(&self, file: &File) -> io::Result<Mmap> {
        let len = match self.len {
            Some(len) => len,
            None => {
                let metadata = file.metadata()?;
                metadata.len().try_into().map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "file length exceeds the addressable size",
                    )
                })?
            }
        };

        if len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "memory map size cannot be zero",
            ));
        }

        let raw = platform::map_file(file, len, self.populate)?;

        TOTAL_MAPPED_MEMORY.fetch_add(len, Ordering::Relaxed);
        ACTIVE_MAPPINGS.fetch_add(1, Ordering::Relaxed);

        // From here on `raw` unmaps on drop, including when advising fails
        if let Some(advice) = self.advice {
            raw.advise(advice)?;
        }

        Ok(Mmap { inner: raw })
    }
}

/// Raw memory map handle.
#[derive(Debug)]
pub struct MmapRaw {
    /// Pointer to the mapped memory.
    pub(crate) ptr: *mut u8,

    /// Length of the mapped memory.
    pub(crate) len: usize,
}

impl MmapRaw {
    /// Advise the kernel about how the memory map will be accessed.
    #[inline]
    pub fn advise(&self, advice: Advice) -> io::Result<()> {
        unsafe { platform::advise(self.ptr, self.len, advice) }
    }
}

impl Drop for MmapRaw {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }

        ACTIVE_MAPPINGS.fetch_sub(1, Ordering::Relaxed);
        TOTAL_MAPPED_MEMORY.fetch_sub(self.len, Ordering::Relaxed);

        if let Err(err) = unsafe { platform::unmap(self.ptr, self.len) } {
            log::warn!("failed to unmap {} bytes at {:p}: {err}", self.len, self.ptr);
        }
    }
}

/// A read-only memory map.
#[derive(Debug)]
pub struct Mmap {
    inner: MmapRaw,
}

// The region is never written after mapping, so sharing it across threads is sound.
unsafe impl Send for Mmap {}
unsafe impl Sync for Mmap {}

impl Mmap {
    /// Create a read-only memory map of a whole file.
    ///
    /// # Safety
    ///
    /// See [`MmapOptions::map`].
    #[inline]
    pub unsafe fn map(file: &File) -> io::Result<Mmap> {
        MmapOptions::new().map(file)
    }

    /// Return the length of the memory map.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len
    }

    /// Return true if the memory map is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }
}

impl Deref for Mmap {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.inner.ptr, self.inner.len) }
    }
}

impl AsRef<[u8]> for Mmap {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self
    }
}

/// Get the total amount of memory currently mapped by this process through this crate.
#[inline]
pub fn total_mapped_memory() -> usize {
    TOTAL_MAPPED_MEMORY.load(Ordering::Relaxed)
}

/// Get the number of live memory mappings created through this crate.
#[inline]
pub fn active_mappings() -> usize {
    ACTIVE_MAPPINGS.load(Ordering::Relaxed)
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use test_log::test;

    use super::{Mmap, MmapOptions};
    use crate::platform::Advice;

    #[test]
    fn map_reads_file_content() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"Hello, columns!").unwrap();
        file.sync_all().unwrap();

        let map = unsafe { MmapOptions::new().advice(Advice::Sequential).map(&file).unwrap() };
        assert_eq!(map.len(), 15);
        assert_eq!(&map[..], b"Hello, columns!");
    }

    #[test]
    fn populated_map_reads_file_content() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&[3u8; 10_000]).unwrap();
        file.sync_all().unwrap();

        let map = unsafe { MmapOptions::new().populate(true).len(4096).map(&file).unwrap() };
        assert_eq!(map.len(), 4096);
        assert!(map.iter().all(|&b| b == 3));
    }

    #[test]
    fn map_outlives_descriptor() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&[7u8; 64]).unwrap();
        file.sync_all().unwrap();

        let map = unsafe { Mmap::map(&file).unwrap() };
        drop(file);
        assert!(map.iter().all(|&b| b == 7));
    }

    #[test]
    fn zero_length_is_rejected() {
        let file = tempfile::tempfile().unwrap();
        let err = unsafe { Mmap::map(&file) }.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }
}
