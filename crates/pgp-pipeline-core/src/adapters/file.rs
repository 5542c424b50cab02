//! The file filter (spec.md §4.C): the terminal adapter over a real
//! descriptor. Grounded on `examples/original_source/common/iobuf.c`'s
//! `file_filter` plus its `fd_cache_*` interplay (see
//! [`crate::close_cache`]).

use std::ffi::CString;
use std::os::unix::io::RawFd;

use crate::close_cache;
use crate::config::PEEK_BUFFER_SIZE;
use crate::error::{PipelineError, Result};
use crate::filter::{Downstream, Filter, UnderflowOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Read,
    Write,
}

/// A raw, syscall-backed file/descriptor adapter. One instance serves
/// either a read-mode or a write-mode node; which methods are callable
/// follows from the node's `Direction`, same as every other filter.
#[derive(Debug)]
pub struct FileFilter {
    fd: RawFd,
    mode: Mode,
    /// Empty for fd-attached (stdio, inherited handle) adapters: those
    /// never participate in the close cache or unlink-on-cancel.
    path: String,
    keep_open: bool,
    no_cache: bool,
    eof_seen: bool,
    peek_buf: [u8; PEEK_BUFFER_SIZE],
    peek_len: usize,
    peek_pos: usize,
    peek_valid: bool,
}

impl FileFilter {
    /// Open `path` for reading, transparently reusing a cached handle.
    pub fn open_read(path: &str) -> Result<Self> {
        let fd = match close_cache::open_via_cache(path) {
            Some(fd) => fd,
            None => {
                let c = CString::new(path)
                    .map_err(|_| PipelineError::Misuse("path contains NUL".into()))?;
                let fd = unsafe { libc::open(c.as_ptr(), libc::O_RDONLY) };
                if fd < 0 {
                    return Err(PipelineError::Io(std::io::Error::last_os_error()));
                }
                fd
            }
        };
        Ok(Self::new(fd, Mode::Read, path.to_string(), false, false))
    }

    /// Open `path` for writing. Any cached handle for the same path is
    /// invalidated first (spec.md §4.B: "must be invalidated before the
    /// same path is opened for writing"). `mode700` restricts the file's
    /// permission bits to `0o700` (owner-only) instead of the default
    /// `0o600` (spec.md §4.D: "`create_write(path, mode700)` ...
    /// mode700 restricts permissions").
    pub fn open_write(path: &str, append: bool, mode700: bool) -> Result<Self> {
        close_cache::invalidate(path);
        let flags = libc::O_WRONLY
            | libc::O_CREAT
            | if append { libc::O_APPEND } else { libc::O_TRUNC };
        let c = CString::new(path).map_err(|_| PipelineError::Misuse("path contains NUL".into()))?;
        let mode = if mode700 { 0o700 } else { 0o600 };
        let fd = unsafe { libc::open(c.as_ptr(), flags, mode) };
        if fd < 0 {
            return Err(PipelineError::Io(std::io::Error::last_os_error()));
        }
        Ok(Self::new(fd, Mode::Write, path.to_string(), false, false))
    }

    /// Wrap an already-open descriptor (stdio, an inherited handle, a
    /// socket). `keep_open` means `free` never closes it.
    pub fn from_raw_fd(fd: RawFd, mode_is_read: bool, keep_open: bool) -> Self {
        Self::new(
            fd,
            if mode_is_read { Mode::Read } else { Mode::Write },
            String::new(),
            keep_open,
            true,
        )
    }

    fn new(fd: RawFd, mode: Mode, path: String, keep_open: bool, no_cache: bool) -> Self {
        FileFilter {
            fd,
            mode,
            path,
            keep_open,
            no_cache,
            eof_seen: false,
            peek_buf: [0u8; PEEK_BUFFER_SIZE],
            peek_len: 0,
            peek_pos: 0,
            peek_valid: true,
        }
    }

    fn raw_read(&self, buf: &mut [u8]) -> Result<isize> {
        loop {
            let rc = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut _, buf.len()) };
            if rc < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(PipelineError::Io(err));
            }
            return Ok(rc);
        }
    }
}

impl Filter for FileFilter {
    fn init(&mut self) {
        self.eof_seen = false;
    }

    fn underflow(&mut self, _down: &mut dyn Downstream, buf: &mut [u8]) -> Result<UnderflowOutcome> {
        if self.mode != Mode::Read {
            return Err(PipelineError::Misuse("file filter (write) does not support underflow".into()));
        }
        self.peek_valid = false;
        if self.peek_pos < self.peek_len {
            let n = (self.peek_len - self.peek_pos).min(buf.len());
            buf[..n].copy_from_slice(&self.peek_buf[self.peek_pos..self.peek_pos + n]);
            self.peek_pos += n;
            return Ok(UnderflowOutcome::Filled(n));
        }
        if self.eof_seen {
            return Ok(UnderflowOutcome::Eof);
        }
        let n = self.raw_read(buf)?;
        if n == 0 {
            self.eof_seen = true;
            Ok(UnderflowOutcome::Eof)
        } else {
            Ok(UnderflowOutcome::Filled(n as usize))
        }
    }

    fn flush(&mut self, _down: &mut dyn Downstream, buf: &[u8]) -> Result<()> {
        if self.mode != Mode::Write {
            return Err(PipelineError::Misuse("file filter (read) does not support flush".into()));
        }
        let mut off = 0;
        while off < buf.len() {
            let rc = unsafe { libc::write(self.fd, buf[off..].as_ptr() as *const _, buf.len() - off) };
            if rc < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(PipelineError::Io(err));
            }
            off += rc as usize;
        }
        Ok(())
    }

    fn peek(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.mode != Mode::Read {
            return Err(PipelineError::Misuse("file filter (write) does not support peek".into()));
        }
        if !self.peek_valid {
            return Err(PipelineError::Misuse(
                "peek buffer is no longer valid after a read or seek".into(),
            ));
        }
        if self.peek_len == 0 && !self.eof_seen {
            let mut tmp = [0u8; PEEK_BUFFER_SIZE];
            let n = self.raw_read(&mut tmp)?;
            if n == 0 {
                self.eof_seen = true;
            } else {
                self.peek_len = n as usize;
                self.peek_buf[..self.peek_len].copy_from_slice(&tmp[..self.peek_len]);
            }
        }
        let n = self.peek_len.min(buf.len());
        buf[..n].copy_from_slice(&self.peek_buf[..n]);
        Ok(n)
    }

    fn free(&mut self, _down: &mut dyn Downstream, cancel: bool) -> Result<()> {
        if self.keep_open {
            return Ok(());
        }
        if cancel && self.mode == Mode::Write && !self.path.is_empty() {
            unsafe {
                libc::close(self.fd);
            }
            if let Ok(c) = CString::new(self.path.clone()) {
                unsafe {
                    libc::unlink(c.as_ptr());
                }
            }
            return Ok(());
        }
        close_cache::close_via_cache(&self.path, self.fd, !self.no_cache);
        Ok(())
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        seek_raw(self.fd, pos)?;
        self.eof_seen = false;
        self.invalidate_peek();
        Ok(())
    }

    fn describe(&self) -> &'static str {
        match self.mode {
            Mode::Read => "file-filter(read)",
            Mode::Write => "file-filter(write)",
        }
    }
}

/// Raw `lseek` on the underlying descriptor. Only called by
/// `Pipeline::seek`, and only when the file filter is the sole node left
/// in the chain (see DESIGN.md's seek-safety decision).
pub fn seek_raw(fd: RawFd, pos: u64) -> Result<()> {
    let rc = unsafe { libc::lseek(fd, pos as libc::off_t, libc::SEEK_SET) };
    if rc < 0 {
        Err(PipelineError::Io(std::io::Error::last_os_error()))
    } else {
        Ok(())
    }
}

impl FileFilter {
    pub fn raw_fd(&self) -> RawFd {
        self.fd
    }

    pub fn invalidate_peek(&mut self) {
        self.peek_valid = false;
        self.peek_len = 0;
        self.peek_pos = 0;
    }
}
