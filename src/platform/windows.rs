//! Windows memory mapping implementation.

use std::fs::File;
use std::io;
use std::os::windows::io::AsRawHandle;
use std::ptr;

use winapi::shared::basetsd::SIZE_T;
use winapi::shared::minwindef::LPVOID;
use winapi::um::handleapi::CloseHandle;
use winapi::um::memoryapi::{CreateFileMappingW, MapViewOfFile, UnmapViewOfFile, FILE_MAP_COPY};
use winapi::um::sysinfoapi::GetSystemInfo;
use winapi::um::winnt::{PAGE_WRITECOPY, SEC_COMMIT};

use crate::mmap::MmapRaw;
use crate::platform::Advice;

/// Map a file read-only and private.
///
/// `FILE_MAP_COPY` gives the same copy-on-write view as `MAP_PRIVATE`; nothing
/// writes through it.
///
/// # Safety
///
/// See [`crate::platform::map_file`].
pub unsafe fn map_file(file: &File, len: usize, populate: bool) -> io::Result<MmapRaw> {
    let file_mapping = CreateFileMappingW(
        file.as_raw_handle() as _,
        ptr::null_mut(),
        PAGE_WRITECOPY | SEC_COMMIT,
        0,
        0,
        ptr::null(),
    );

    if file_mapping.is_null() {
        return Err(io::Error::last_os_error());
    }

    let addr = MapViewOfFile(file_mapping, FILE_MAP_COPY, 0, 0, len as SIZE_T);
    let map_error = io::Error::last_os_error();

    // The view stays valid after the mapping handle is closed
    CloseHandle(file_mapping);

    if addr.is_null() {
        return Err(map_error);
    }

    if populate {
        let page_size = page_size();
        for i in (0..len).step_by(page_size) {
            ptr::read_volatile((addr as usize + i) as *const u8);
        }
    }

    Ok(MmapRaw {
        ptr: addr as *mut u8,
        len,
    })
}

/// Unmap memory.
///
/// # Safety
///
/// See [`crate::platform::unmap`].
pub unsafe fn unmap(addr: *mut u8, _len: usize) -> io::Result<()> {
    if UnmapViewOfFile(addr as LPVOID) != 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Windows has no `madvise`; hints are accepted and ignored.
///
/// # Safety
///
/// See [`crate::platform::advise`].
pub unsafe fn advise(_addr: *mut u8, _len: usize, _advice: Advice) -> io::Result<()> {
    Ok(())
}

#[inline]
fn page_size() -> usize {
    let mut system_info: winapi::um::sysinfoapi::SYSTEM_INFO = unsafe { std::mem::zeroed() };
    unsafe { GetSystemInfo(&mut system_info) };
    system_info.dwPageSize as usize
}
