//! A single stage of a pipeline (spec.md §3, "Filter node").

use crate::buffer::InternalBuffer;
use crate::config::default_buffer_size;
use crate::error::PipelineError;
use crate::filter::Filter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    InputStream,
    InputTemp,
    OutputStream,
    OutputTemp,
}

impl Direction {
    pub fn is_input(self) -> bool {
        matches!(self, Direction::InputStream | Direction::InputTemp)
    }

    pub fn is_output(self) -> bool {
        matches!(self, Direction::OutputStream | Direction::OutputTemp)
    }

    pub fn is_temp(self) -> bool {
        matches!(self, Direction::InputTemp | Direction::OutputTemp)
    }
}

/// A borrowed drain buffer supplied by the caller for the duration of a
/// single read/write call. When present and large enough, the underflow
/// and flush protocols route bytes directly through it instead of the
/// node's internal buffer (spec.md §4.D zero-copy choice).
pub struct ExternalDrain<'a> {
    pub buf: &'a mut [u8],
    /// Bytes the filter actually produced/consumed this call.
    pub used: usize,
}

impl<'a> ExternalDrain<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        ExternalDrain { buf, used: 0 }
    }
}

/// A single pipeline stage: callback, context (owned by the `Box<dyn
/// Filter>` itself), internal buffer, and the diagnostic/bookkeeping
/// fields from spec.md §3.
pub struct FilterNode {
    pub direction: Direction,
    pub filter: Box<dyn Filter>,
    pub buffer: InternalBuffer,
    /// Read-limit cap, when set (disables the zero-copy fast path).
    pub read_limit: Option<u64>,
    /// Bytes delivered by previous filter stages of this head.
    pub total: u64,
    /// Bytes delivered by the present node.
    pub current: u64,
    pub sticky_error: Option<PipelineError>,
    /// EOF latched but the internal buffer may still have data to drain.
    pub pending_eof: bool,
    /// `Free` already sent to the filter (via EOF auto-free, `pop`, or
    /// `close`/`cancel`); guards against sending it twice.
    pub freed: bool,
    /// Disables the zero-copy fast path (set when a read-limit applies).
    pub nofast: bool,
    /// Diagnostic identifiers; not load-bearing for correctness.
    pub number: u64,
    pub subnumber: u64,
    /// Real filename, for the close cache and diagnostics. `None` for
    /// filters that are not file-backed.
    pub real_filename: Option<String>,
}

impl std::fmt::Debug for FilterNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterNode")
            .field("direction", &self.direction)
            .field("filter", &self.filter.describe())
            .field("number", &self.number)
            .field("subnumber", &self.subnumber)
            .field("pending_eof", &self.pending_eof)
            .finish()
    }
}

impl FilterNode {
    pub fn new(direction: Direction, filter: Box<dyn Filter>, number: u64) -> Self {
        let capacity = if direction.is_temp() { 0 } else { default_buffer_size() };
        FilterNode {
            direction,
            filter,
            buffer: InternalBuffer::with_capacity(capacity),
            read_limit: None,
            total: 0,
            current: 0,
            sticky_error: None,
            pending_eof: false,
            freed: false,
            nofast: false,
            number,
            subnumber: 0,
            real_filename: None,
        }
    }

    pub fn tell(&self) -> u64 {
        self.total + self.current
    }
}
