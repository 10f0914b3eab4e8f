//! Platform-specific memory mapping implementations.
//!
//! Column files are only ever mapped read-only and private, so the platform
//! layer exposes exactly that: map a whole file, unmap it, and pass access
//! hints to the kernel.

use std::fs::File;
use std::io;

use crate::mmap::MmapRaw;

/// Memory access advice for the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advice {
    /// Normal access pattern.
    Normal,

    /// Random access pattern, e.g. reads through an `Array` row mapping.
    Random,

    /// Sequential access pattern, e.g. full column scans.
    Sequential,

    /// Will need soon.
    WillNeed,

    /// Don't need anymore.
    DontNeed,
}

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod windows;

#[cfg(not(any(unix, windows)))]
mod unsupported;

/// Map `len` bytes of a file, starting at its beginning, read-only and private.
///
/// # Safety
///
/// The returned region aliases the file. If another process truncates or
/// rewrites the file while it is mapped, reads may observe the change or fault.
pub unsafe fn map_file(file: &File, len: usize, populate: bool) -> io::Result<MmapRaw> {
    #[cfg(unix)]
    return unix::map_file(file, len, populate);

    #[cfg(windows)]
    return windows::map_file(file, len, populate);

    #[cfg(not(any(unix, windows)))]
    return unsupported::map_file(file, len, populate);
}

/// Unmap memory.
///
/// # Safety
///
/// `addr` and `len` must describe a region returned by [`map_file`] that has
/// not been unmapped yet, and nothing may read from it afterwards.
pub unsafe fn unmap(addr: *mut u8, len: usize) -> io::Result<()> {
    #[cfg(unix)]
    return unix::unmap(addr, len);

    #[cfg(windows)]
    return windows::unmap(addr, len);

    #[cfg(not(any(unix, windows)))]
    return unsupported::unmap(addr, len);
}

/// Advise the kernel about how the memory map will be accessed.
///
/// # Safety
///
/// `addr` and `len` must describe a live mapping.
pub unsafe fn advise(addr: *mut u8, len: usize, advice: Advice) -> io::Result<()> {
    #[cfg(unix)]
    return unix::advise(addr, len, advice);

    #[cfg(windows)]
    return windows::advise(addr, len, advice);

    #[cfg(not(any(unix, windows)))]
    return unsupported::advise(addr, len, advice);
}
