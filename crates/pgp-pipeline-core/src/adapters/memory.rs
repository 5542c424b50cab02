//! In-memory source/sink adapters backing `temp_in`/`temp_out` pipelines
//! (spec.md §4.D). A `Temp` node's `FilterNode::buffer` never drains
//! anywhere on its own — these adapters only come into play once a
//! `Temp` head is demoted to `Stream` by a later `push` (see
//! `Pipeline::push`), or when the caller asks to harvest the
//! accumulated bytes directly.

use crate::error::Result;
use crate::filter::{Downstream, Filter, UnderflowOutcome};

/// Serves bytes from a fixed, pre-supplied buffer (`attach_stream` over
/// an in-memory slice, or a demoted `InputTemp` node).
#[derive(Debug)]
pub struct MemoryInput {
    data: Vec<u8>,
    pos: usize,
}

impl MemoryInput {
    pub fn new(data: Vec<u8>) -> Self {
        MemoryInput { data, pos: 0 }
    }
}

impl Filter for MemoryInput {
    fn underflow(&mut self, _down: &mut dyn Downstream, buf: &mut [u8]) -> Result<UnderflowOutcome> {
        if self.pos >= self.data.len() {
            return Ok(UnderflowOutcome::Eof);
        }
        let n = (self.data.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(UnderflowOutcome::Filled(n))
    }

    fn describe(&self) -> &'static str {
        "memory-input"
    }
}

/// Accumulates written bytes in memory (`temp_out`'s backing filter once
/// its node is demoted off the head position).
#[derive(Debug, Default)]
pub struct MemoryOutput {
    data: Vec<u8>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        MemoryOutput::default()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Filter for MemoryOutput {
    fn flush(&mut self, _down: &mut dyn Downstream, buf: &[u8]) -> Result<()> {
        self.data.extend_from_slice(buf);
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "memory-output"
    }

    fn drain_to_vec(&mut self) -> Option<Vec<u8>> {
        Some(std::mem::take(&mut self.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::NoDownstream;

    #[test]
    fn memory_input_delivers_then_eofs() {
        let mut src = MemoryInput::new(vec![1, 2, 3]);
        let mut none = NoDownstream;
        let mut buf = [0u8; 2];
        assert_eq!(src.underflow(&mut none, &mut buf).unwrap(), UnderflowOutcome::Filled(2));
        assert_eq!(&buf, &[1, 2]);
        let mut buf2 = [0u8; 2];
        assert_eq!(src.underflow(&mut none, &mut buf2).unwrap(), UnderflowOutcome::Filled(1));
        assert_eq!(src.underflow(&mut none, &mut buf2).unwrap(), UnderflowOutcome::Eof);
    }

    #[test]
    fn memory_output_accumulates() {
        let mut sink = MemoryOutput::new();
        let mut none = NoDownstream;
        sink.flush(&mut none, b"ab").unwrap();
        sink.flush(&mut none, b"cd").unwrap();
        assert_eq!(sink.bytes(), b"abcd");
    }
}
