//! The OpenPGP partial-body-length block filter (spec.md §4.E).
//!
//! Read side decodes RFC 4880 §4.2.2 length octets; write side emits
//! partial chunks in fixed [`OP_MIN_PARTIAL_CHUNK`]-byte strides (the
//! simplification recorded in DESIGN.md — the read side still accepts any
//! power-of-two chunk size, so round-tripping against an externally
//! produced partial-body stream still works). Grounded on
//! `examples/original_source/common/iobuf.c`'s `block_filter`.

use crate::config::{OP_MIN_PARTIAL_CHUNK, OP_MIN_PARTIAL_CHUNK_2POW};
use crate::error::{PipelineError, Result};
use crate::filter::{Downstream, Filter, UnderflowOutcome};

fn read_exact(down: &mut dyn Downstream, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match down.pull(&mut buf[filled..])? {
            UnderflowOutcome::Filled(n) => filled += n,
            UnderflowOutcome::Eof => {
                return Err(PipelineError::BadData(
                    "block filter: short read inside a length header".into(),
                ));
            }
        }
    }
    Ok(())
}

/// Decode a length header whose first octet is `l`, reading any
/// continuation octets from `down`. Returns `(length, more_follows)`.
fn decode_header(l: u8, down: &mut dyn Downstream) -> Result<(u64, bool)> {
    if l < 192 {
        Ok((l as u64, false))
    } else if l < 224 {
        let mut l2 = [0u8; 1];
        read_exact(down, &mut l2)?;
        Ok((((l as u64 - 192) << 8) + l2[0] as u64 + 192, false))
    } else if l == 255 {
        let mut raw = [0u8; 4];
        read_exact(down, &mut raw)?;
        Ok((u32::from_be_bytes(raw) as u64, false))
    } else {
        let shift = l & 0x1F;
        Ok((1u64 << shift, true))
    }
}

/// Encode a *final* (non-partial) length header for `len`.
fn encode_final_header(len: u64) -> Vec<u8> {
    if len < 192 {
        vec![len as u8]
    } else if len < 8384 {
        let biased = len - 192;
        vec![((biased >> 8) + 192) as u8, (biased & 0xFF) as u8]
    } else {
        let len = len as u32;
        vec![
            0xFF,
            (len >> 24) as u8,
            (len >> 16) as u8,
            (len >> 8) as u8,
            len as u8,
        ]
    }
}

#[derive(Debug, Default)]
struct ReadState {
    /// The length octet the caller already consumed before enabling
    /// partial-body mode; used only for the very first segment.
    first_c: Option<u8>,
    remaining: u64,
    more_follows: bool,
    started: bool,
    eof: bool,
}

#[derive(Debug, Default)]
struct WriteState {
    /// Bytes held back because they didn't yet reach a full
    /// `OP_MIN_PARTIAL_CHUNK`. Never exceeds `OP_MIN_PARTIAL_CHUNK`.
    buffered: Vec<u8>,
}

#[derive(Debug)]
enum Mode {
    Read(ReadState),
    Write(WriteState),
}

/// The block filter's context (spec.md §3, "Block filter context").
#[derive(Debug)]
pub struct BlockFilter {
    mode: Mode,
}

impl BlockFilter {
    /// Construct a read-mode block filter. `first_c` is the length octet
    /// the caller already consumed before pushing this filter (spec.md
    /// §4.E: "the *first* length octet has already been consumed by the
    /// caller").
    pub fn for_read(first_c: u8) -> Self {
        BlockFilter {
            mode: Mode::Read(ReadState {
                first_c: Some(first_c),
                ..Default::default()
            }),
        }
    }

    pub fn for_write() -> Self {
        BlockFilter {
            mode: Mode::Write(WriteState::default()),
        }
    }
}

impl Filter for BlockFilter {
    fn init(&mut self) {}

    fn underflow(&mut self, down: &mut dyn Downstream, buf: &mut [u8]) -> Result<UnderflowOutcome> {
        let state = match &mut self.mode {
            Mode::Read(s) => s,
            Mode::Write(_) => return Err(PipelineError::Misuse("block filter (write) does not support underflow".into())),
        };

        loop {
            if state.eof {
                return Ok(UnderflowOutcome::Eof);
            }
            if state.remaining == 0 {
                if state.started && !state.more_follows {
                    state.eof = true;
                    return Ok(UnderflowOutcome::Eof);
                }
                let l = match state.first_c.take() {
                    Some(c) => c,
                    None => {
                        let mut b = [0u8; 1];
                        match down.pull(&mut b)? {
                            UnderflowOutcome::Eof => {
                                return Err(PipelineError::BadData(
                                    "block filter: missing length octet".into(),
                                ));
                            }
                            UnderflowOutcome::Filled(_) => {}
                        }
                        b[0]
                    }
                };
                let (len, partial) = decode_header(l, down)?;
                state.started = true;
                state.more_follows = partial;
                state.remaining = len;
                if len == 0 {
                    if partial {
                        // Degenerate zero-length partial chunk: read the
                        // next header immediately.
                        continue;
                    }
                    state.eof = true;
                    return Ok(UnderflowOutcome::Eof);
                }
                continue;
            }

            let n = buf.len().min(state.remaining as usize);
            return match down.pull(&mut buf[..n])? {
                UnderflowOutcome::Filled(k) => {
                    state.remaining -= k as u64;
                    Ok(UnderflowOutcome::Filled(k))
                }
                UnderflowOutcome::Eof => Err(PipelineError::BadData(
                    "block filter: short read inside a partial body segment".into(),
                )),
            };
        }
    }

    fn flush(&mut self, down: &mut dyn Downstream, buf: &[u8]) -> Result<()> {
        let state = match &mut self.mode {
            Mode::Write(s) => s,
            Mode::Read(_) => return Err(PipelineError::Misuse("block filter (read) does not support flush".into())),
        };

        let mut input = buf;
        if state.buffered.len() + input.len() < OP_MIN_PARTIAL_CHUNK {
            state.buffered.extend_from_slice(input);
            return Ok(());
        }

        if !state.buffered.is_empty() {
            let need = OP_MIN_PARTIAL_CHUNK - state.buffered.len();
            let take = need.min(input.len());
            state.buffered.extend_from_slice(&input[..take]);
            input = &input[take..];
            debug_assert_eq!(state.buffered.len(), OP_MIN_PARTIAL_CHUNK);
            down.push_bytes(&[0xE0 | OP_MIN_PARTIAL_CHUNK_2POW as u8])?;
            down.push_bytes(&state.buffered)?;
            state.buffered.clear();
        }

        while input.len() >= OP_MIN_PARTIAL_CHUNK {
            down.push_bytes(&[0xE0 | OP_MIN_PARTIAL_CHUNK_2POW as u8])?;
            down.push_bytes(&input[..OP_MIN_PARTIAL_CHUNK])?;
            input = &input[OP_MIN_PARTIAL_CHUNK..];
        }

        state.buffered.extend_from_slice(input);
        Ok(())
    }

    fn free(&mut self, down: &mut dyn Downstream, cancel: bool) -> Result<()> {
        if let Mode::Write(state) = &mut self.mode {
            if !cancel {
                let header = encode_final_header(state.buffered.len() as u64);
                down.push_bytes(&header)?;
                if !state.buffered.is_empty() {
                    down.push_bytes(&state.buffered)?;
                }
            }
            state.buffered.clear();
        }
        Ok(())
    }

    fn describe(&self) -> &'static str {
        match self.mode {
            Mode::Read(_) => "block-filter(read)",
            Mode::Write(_) => "block-filter(write)",
        }
    }
}
