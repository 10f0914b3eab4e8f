//! Fallback for targets without memory mapping.

use std::fs::File;
use std::io;

use crate::mmap::MmapRaw;
use crate::platform::Advice;

fn unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "memory mapping is not supported on this platform",
    )
}

pub unsafe fn map_file(_file: &File, _len: usize, _populate: bool) -> io::Result<MmapRaw> {
    Err(unsupported())
}

pub unsafe fn unmap(_addr: *mut u8, _len: usize) -> io::Result<()> {
    Err(unsupported())
}

pub unsafe fn advise(_addr: *mut u8, _len: usize, _advice: Advice) -> io::Result<()> {
    Err(unsupported())
}
