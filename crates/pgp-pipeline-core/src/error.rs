//! Error taxonomy for the filter engine.
//!
//! `EOF` is deliberately not a variant here: reads and writes return it as a
//! distinguished outcome (see [`crate::pipeline::ReadOutcome`]), never as an
//! error. Misuse (read on an output pipeline, seek on a temp pipeline, pop of
//! a nonexistent filter) is a programmer error; callers that hit
//! [`PipelineError::Misuse`] at the public API boundary are expected to
//! `panic!` rather than propagate it further.

use std::fmt;

/// Sum type for everything that can go wrong below the EOF sentinel.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Source/sink I/O error, recorded sticky on the filter until buffered
    /// bytes have drained.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed framing from the block filter. Immediately propagated,
    /// non-recoverable for the stream.
    #[error("bad data: {0}")]
    BadData(String),

    /// `push` attempted past the 64-filter nesting limit.
    #[error("filter chain nesting exceeds the 64-filter limit")]
    TooDeep,

    /// Node or context allocation failed.
    #[error("allocation failed")]
    Alloc,

    /// Programmer error: read on an Output pipeline, seek on Temp, pop of a
    /// filter that isn't present, etc. Fatal at the call site.
    #[error("misuse: {0}")]
    Misuse(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// A tag describing the origin of an error for status-line reporting
/// (see `pgp-pipeline-server`), without pulling formatting concerns into
/// the engine itself.
impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Io(_) => ErrorKind::Io,
            PipelineError::BadData(_) => ErrorKind::BadData,
            PipelineError::TooDeep => ErrorKind::TooDeep,
            PipelineError::Alloc => ErrorKind::Alloc,
            PipelineError::Misuse(_) => ErrorKind::Misuse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    BadData,
    TooDeep,
    Alloc,
    Misuse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Io => "io",
            ErrorKind::BadData => "bad-data",
            ErrorKind::TooDeep => "too-deep",
            ErrorKind::Alloc => "alloc",
            ErrorKind::Misuse => "misuse",
        };
        f.write_str(s)
    }
}
