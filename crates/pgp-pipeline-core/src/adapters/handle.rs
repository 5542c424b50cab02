//! Adapters over descriptors the caller already owns: inherited handles,
//! stdio, and sockets (spec.md §4.A "attach_handle / attach_stream /
//! attach_socket"). Socket I/O is grounded on
//! `examples/original_source/sm/server.c`'s blocking line-protocol use of
//! `recv`/`send` rather than `read`/`write`.

use std::os::unix::io::RawFd;

use crate::adapters::file::FileFilter;
use crate::error::{PipelineError, Result};
use crate::filter::{Downstream, Filter, UnderflowOutcome};

/// Wrap an inherited descriptor (e.g. a pipe fd passed down by a parent
/// process) for reading or writing. Never participates in the close
/// cache; `free` only closes it when `keep_open` is false.
pub fn attach_handle(fd: RawFd, is_read: bool, keep_open: bool) -> FileFilter {
    FileFilter::from_raw_fd(fd, is_read, keep_open)
}

/// Wrap the process's own stdin/stdout.
pub fn attach_stdio(is_read: bool) -> FileFilter {
    let fd = if is_read { 0 } else { 1 };
    FileFilter::from_raw_fd(fd, is_read, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Read,
    Write,
}

/// A connected stream socket, read/written with `recv(2)`/`send(2)`
/// rather than `read`/`write` so `MSG_NOSIGNAL` can suppress `SIGPIPE` on
/// a peer that has gone away mid-write.
#[derive(Debug)]
pub struct SocketFilter {
    fd: RawFd,
    mode: Mode,
    eof_seen: bool,
}

impl SocketFilter {
    pub fn new(fd: RawFd, is_read: bool) -> Self {
        SocketFilter {
            fd,
            mode: if is_read { Mode::Read } else { Mode::Write },
            eof_seen: false,
        }
    }
}

impl Filter for SocketFilter {
    fn underflow(&mut self, _down: &mut dyn Downstream, buf: &mut [u8]) -> Result<UnderflowOutcome> {
        if self.mode != Mode::Read {
            return Err(PipelineError::Misuse("socket filter (write) does not support underflow".into()));
        }
        if self.eof_seen {
            return Ok(UnderflowOutcome::Eof);
        }
        loop {
            let rc = unsafe { libc::recv(self.fd, buf.as_mut_ptr() as *mut _, buf.len(), 0) };
            if rc < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(PipelineError::Io(err));
            }
            if rc == 0 {
                self.eof_seen = true;
                return Ok(UnderflowOutcome::Eof);
            }
            return Ok(UnderflowOutcome::Filled(rc as usize));
        }
    }

    fn flush(&mut self, _down: &mut dyn Downstream, buf: &[u8]) -> Result<()> {
        if self.mode != Mode::Write {
            return Err(PipelineError::Misuse("socket filter (read) does not support flush".into()));
        }
        let mut off = 0;
        while off < buf.len() {
            let rc = unsafe {
                libc::send(
                    self.fd,
                    buf[off..].as_ptr() as *const _,
                    buf.len() - off,
                    libc::MSG_NOSIGNAL,
                )
            };
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

    fn free(&mut self, _down: &mut dyn Downstream, _cancel: bool) -> Result<()> {
        unsafe {
            libc::close(self.fd);
        }
        Ok(())
    }

    fn describe(&self) -> &'static str {
        match self.mode {
            Mode::Read => "socket-filter(read)",
            Mode::Write => "socket-filter(write)",
        }
    }
}

pub fn attach_socket(fd: RawFd, is_read: bool) -> SocketFilter {
    SocketFilter::new(fd, is_read)
}
