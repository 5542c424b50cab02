//! The filter-callback contract (spec.md §6): the only interface through
//! which source/sink adapters, the file filter, and the block filter plug
//! into the chain engine.
//!
//! The distilled spec describes this as a single callback dispatched on an
//! integer "control verb". Per the REDESIGN FLAGS in spec.md §9 we instead
//! expose it as a small trait — `Init`/`Free` become lifecycle methods,
//! `Describe` becomes a debug method, and `Underflow`/`Flush`/`Peek`/`Cancel`
//! become typed methods dispatched through a `dyn Filter` object. This gives
//! the same seven verbs without an untyped `(verb, buffer, &mut len)` ABI.

use crate::error::{PipelineError, Result};

/// Outcome of pulling bytes from whatever sits below a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnderflowOutcome {
    /// `n` bytes were written into the caller-supplied buffer, `1 <= n`.
    Filled(usize),
    /// Nothing more to deliver; EOF is now latched.
    Eof,
}

/// What a filter calls to reach the rest of the chain below it. Terminal
/// filters (file, memory, handle, socket adapters) own their I/O directly
/// and never call this; only filters with a `down` chain (e.g. the block
/// filter) do.
pub trait Downstream {
    /// Pull up to `buf.len()` bytes from downstream.
    fn pull(&mut self, buf: &mut [u8]) -> Result<UnderflowOutcome>;
    /// Push exactly `buf.len()` bytes downstream.
    fn push_bytes(&mut self, buf: &[u8]) -> Result<()>;
}

/// A `Downstream` that has nothing below it. Used for the bottom-most
/// (terminal) filter in a chain; calling it is a contract violation.
pub struct NoDownstream;

impl Downstream for NoDownstream {
    fn pull(&mut self, _buf: &mut [u8]) -> Result<UnderflowOutcome> {
        Err(PipelineError::Misuse(
            "terminal filter attempted to read from a nonexistent downstream".into(),
        ))
    }

    fn push_bytes(&mut self, _buf: &[u8]) -> Result<()> {
        Err(PipelineError::Misuse(
            "terminal filter attempted to write to a nonexistent downstream".into(),
        ))
    }
}

/// A single pipeline stage.
///
/// Exactly one of `underflow`/`flush` is meaningful for a given filter,
/// matching its node's direction (input filters implement `underflow`,
/// output filters implement `flush`); the other may be left at its default,
/// which is a `Misuse` error, since calling the wrong one is a programmer
/// error per spec.md §7.
pub trait Filter: std::fmt::Debug {
    /// Reset per-session flags. No I/O.
    fn init(&mut self) {}

    /// Fill up to `buf.len()` bytes. Input filters only.
    fn underflow(&mut self, _down: &mut dyn Downstream, _buf: &mut [u8]) -> Result<UnderflowOutcome> {
        Err(PipelineError::Misuse(format!(
            "{} does not support underflow",
            self.describe()
        )))
    }

    /// Write exactly `buf.len()` bytes. Output filters only.
    fn flush(&mut self, _down: &mut dyn Downstream, _buf: &[u8]) -> Result<()> {
        Err(PipelineError::Misuse(format!(
            "{} does not support flush",
            self.describe()
        )))
    }

    /// Fill the file filter's look-ahead buffer. Only the file filter
    /// implements this; every other filter inherits the default error.
    fn peek(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(PipelineError::Misuse(format!(
            "{} does not support peek",
            self.describe()
        )))
    }

    /// Flush if output, release the context, close the handle (via the
    /// close cache unless keep-open/no-cache is set).
    fn free(&mut self, _down: &mut dyn Downstream, _cancel: bool) -> Result<()> {
        Ok(())
    }

    /// Raw seek on the underlying resource. Only the file filter
    /// overrides this; `Pipeline::seek` refuses to call it on anything
    /// else (see DESIGN.md's seek-safety decision).
    fn seek(&mut self, _pos: u64) -> Result<()> {
        Err(PipelineError::Misuse(format!("{} does not support seek", self.describe())))
    }

    /// Short textual tag, diagnostics only.
    fn describe(&self) -> &'static str;

    /// Hand back accumulated bytes without going through `Downstream`.
    /// Only `MemoryOutput` (the `temp_out` backing filter) overrides
    /// this; everything else has nothing to hand back.
    fn drain_to_vec(&mut self) -> Option<Vec<u8>> {
        None
    }
}
