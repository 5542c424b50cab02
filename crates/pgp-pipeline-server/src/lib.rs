//! Blocking command dispatch server (spec.md §4.G).
//!
//! One connection, one session, one command at a time — no concurrent
//! pipelines (spec.md §5). Grounded on
//! `examples/original_source/sm/server.c`'s line-oriented Assuan
//! protocol: unlike the teacher's `openentropy-server` (an HTTP JSON
//! API, axum/tokio), this domain is stateful and fd-oriented, so the
//! loop here is a plain blocking `BufRead` reader (see DESIGN.md for
//! the axum/tokio drop rationale).

mod session;
mod status;

pub use session::{Session, VerbOutcome};
pub use status::StatusLine;

use std::io::{BufRead, Write};
use std::net::TcpListener;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

/// Run one request/response loop to completion (EOF or `BYE`) over an
/// already-connected reader/writer pair — the shape used for both stdin
/// mode and a single accepted socket connection.
pub fn serve_connection<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> std::io::Result<()> {
    let conn_id = uuid::Uuid::new_v4();
    info!("connection {conn_id} started");
    let mut session = Session::new();
    let mut line = String::new();
    loop {
        line.clear();
        let n = input.read_line(&mut line)?;
        if n == 0 {
            break;
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            continue;
        }
        let outcome = session.dispatch(trimmed);
        for status_line in outcome.status_lines() {
            writeln!(output, "{status_line}")?;
        }
        output.flush()?;
        if outcome.should_close() {
            break;
        }
    }
    info!("connection {conn_id} ended");
    Ok(())
}

/// Serve stdin/stdout (the default mode an Assuan-style helper is
/// spawned in by a parent process that already holds the socket).
pub fn serve_stdio() -> std::io::Result<()> {
    let stdin = std::io::stdin();
    let mut reader = stdin.lock();
    let stdout = std::io::stdout();
    let mut writer = stdout.lock();
    serve_connection(&mut reader, &mut writer)
}

/// Accept loop over a TCP listener, one connection at a time, until
/// `shutdown` is set (normally by a `ctrlc` handler — see
/// [`install_sigint_handler`]).
pub fn serve_tcp(listener: &TcpListener, shutdown: Arc<AtomicBool>) -> std::io::Result<()> {
    listener.set_nonblocking(true)?;
    info!("listening on {:?} (fd {})", listener.local_addr(), listener.as_raw_fd());
    while !shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                info!("accepted connection from {peer}");
                stream.set_nonblocking(false)?;
                let mut reader = std::io::BufReader::new(stream.try_clone()?);
                let mut writer = stream;
                if let Err(e) = serve_connection(&mut reader, &mut writer) {
                    warn!("connection from {peer} ended with error: {e}");
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => return Err(e),
        }
    }
    info!("shutdown requested, no longer accepting connections");
    Ok(())
}

/// Install a `ctrlc` handler that flips the returned flag. The caller's
/// accept loop (or, for a single in-flight pipeline, the caller's copy
/// loop) is expected to poll it and call `cancel()` on whatever pipeline
/// is open rather than leaving a partial output file behind.
pub fn install_sigint_handler() -> std::io::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let target = flag.clone();
    ctrlc::set_handler(move || {
        target.store(true, Ordering::SeqCst);
    })
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    Ok(flag)
}
