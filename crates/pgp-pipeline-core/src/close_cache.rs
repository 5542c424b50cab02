//! The process-wide close cache (spec.md §4.B).
//!
//! A repeated open/close on the same path — common while a caller parses a
//! message packet by packet — reuses a single OS handle instead of paying
//! syscall cost for each logical close/open pair. Grounded on
//! `examples/original_source/common/iobuf.c`'s `fd_cache_*` family.

use std::os::unix::io::RawFd;
use std::sync::{Mutex, OnceLock};

use log::debug;

use crate::error::Result;

struct CacheSlot {
    path: String,
    /// `None` means the slot is free (its handle already closed, or never
    /// filled); `Some(fd)` means the slot holds a live, reusable handle.
    fd: Option<RawFd>,
}

struct CloseCache {
    slots: Vec<CacheSlot>,
}

impl CloseCache {
    fn new() -> Self {
        CloseCache { slots: Vec::new() }
    }
}

fn cache() -> &'static Mutex<CloseCache> {
    static CACHE: OnceLock<Mutex<CloseCache>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(CloseCache::new()))
}

/// Byte-exact path comparison, except `/` and `\` are interchangeable
/// (spec.md §4.B). We treat any target as the two-separator case; a
/// single-separator target degenerates to plain equality since paths
/// never contain `\`.
fn path_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).all(|(x, y)| {
        let norm = |c: u8| if c == b'\\' { b'/' } else { c };
        norm(x) == norm(y)
    })
}

/// Close `fd` via the cache: reuse a free slot for `path` if one exists,
/// otherwise allocate and prepend one. Closes immediately (bypassing the
/// cache) when `path` is empty or `cacheable` is false.
pub fn close_via_cache(path: &str, fd: RawFd, cacheable: bool) {
    if path.is_empty() || !cacheable {
        close_raw(fd);
        return;
    }
    let mut cache = cache().lock().unwrap();
    if let Some(slot) = cache
        .slots
        .iter_mut()
        .find(|s| s.fd.is_none() && path_eq(&s.path, path))
    {
        slot.fd = Some(fd);
        debug!("close_via_cache({path}) reused existing slot");
        return;
    }
    cache.slots.insert(
        0,
        CacheSlot {
            path: path.to_string(),
            fd: Some(fd),
        },
    );
    debug!("close_via_cache({path}) new slot created");
}

/// Look for a live cached handle for `path`; on success, detach it and
/// rewind it to offset 0. A rewind failure invalidates that slot only and
/// falls back to `None` (caller performs a fresh open).
pub fn open_via_cache(path: &str) -> Option<RawFd> {
    let mut cache = cache().lock().unwrap();
    let idx = cache
        .slots
        .iter()
        .position(|s| s.fd.is_some() && path_eq(&s.path, path))?;
    let fd = cache.slots[idx].fd.take().unwrap();
    drop(cache);

    let rc = unsafe { libc::lseek(fd, 0, libc::SEEK_SET) };
    if rc < 0 {
        debug!("open_via_cache({path}) rewind failed, invalidating slot");
        close_raw(fd);
        return None;
    }
    debug!("open_via_cache({path}) using cached fd");
    Some(fd)
}

/// Close and free every live slot matching `path`. Must be called before
/// opening `path` for writing.
pub fn invalidate(path: &str) {
    let mut cache = cache().lock().unwrap();
    for slot in cache.slots.iter_mut() {
        if slot.fd.is_some() && path_eq(&slot.path, path) {
            let fd = slot.fd.take().unwrap();
            close_raw(fd);
        }
    }
}

/// `fsync` any live slot matching `path`.
pub fn synchronize(path: &str) -> Result<()> {
    let cache = cache().lock().unwrap();
    for slot in cache.slots.iter() {
        if let Some(fd) = slot.fd {
            if path_eq(&slot.path, path) {
                let rc = unsafe { libc::fsync(fd) };
                if rc < 0 {
                    return Err(std::io::Error::last_os_error().into());
                }
            }
        }
    }
    Ok(())
}

fn close_raw(fd: RawFd) {
    unsafe {
        libc::close(fd);
    }
}

/// Number of live (open) slots, for diagnostics and tests.
#[cfg(test)]
pub fn live_slot_count() -> usize {
    cache().lock().unwrap().slots.iter().filter(|s| s.fd.is_some()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn open_tmp(path: &str) -> RawFd {
        let c = CString::new(path).unwrap();
        unsafe { libc::open(c.as_ptr(), libc::O_RDWR | libc::O_CREAT, 0o600) }
    }

    #[test]
    fn reuse_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache-test").to_string_lossy().to_string();
        let fd = open_tmp(&path);
        assert!(fd >= 0);
        unsafe {
            libc::write(fd, b"hello".as_ptr() as *const _, 5);
            libc::lseek(fd, 2, libc::SEEK_SET);
        }
        close_via_cache(&path, fd, true);
        let reopened = open_via_cache(&path).expect("should reuse cached fd");
        let pos = unsafe { libc::lseek(reopened, 0, libc::SEEK_CUR) };
        assert_eq!(pos, 0, "reuse must rewind to offset 0");
        close_raw(reopened);
    }

    #[test]
    fn path_separator_equivalence() {
        assert!(path_eq("a/b/c", "a\\b\\c"));
        assert!(!path_eq("a/b/c", "a/b/d"));
    }
}
