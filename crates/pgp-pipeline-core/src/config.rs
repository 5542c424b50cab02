//! Process-wide, write-once configuration.
//!
//! The default internal buffer size is the one knob the spec allows callers
//! to set, and only before any pipeline exists (see spec.md §5).

use std::sync::OnceLock;

/// 64 KiB, matching the zero-copy scenario's "internal buffer may not exceed
/// the default in peak length" test in spec.md §8.3.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Bytes at/above which the engine prefers to route a transfer directly
/// between the caller's buffer and the filter, bypassing the internal
/// buffer entirely.
pub const ZEROCOPY_THRESHOLD: usize = 1024;

/// Minimum OpenPGP partial-body chunk size (2^9).
pub const OP_MIN_PARTIAL_CHUNK: usize = 512;
pub const OP_MIN_PARTIAL_CHUNK_2POW: u32 = 9;

/// Maximum filter chain depth before `push` fails with `TooDeep`.
pub const MAX_NESTING: usize = 64;

/// File filter look-ahead buffer size.
pub const PEEK_BUFFER_SIZE: usize = 32;

static DEFAULT_BUFFER_SIZE_OVERRIDE: OnceLock<usize> = OnceLock::new();

/// Set the process-wide default buffer size. Must be called, if at all,
/// before any pipeline is created; subsequent calls are no-ops (the knob
/// is write-once, matching the close cache's "set at most once" rule).
pub fn set_default_buffer_size(bytes: usize) {
    let _ = DEFAULT_BUFFER_SIZE_OVERRIDE.set(bytes);
}

/// Current default buffer size for new filter-node internal buffers.
pub fn default_buffer_size() -> usize {
    *DEFAULT_BUFFER_SIZE_OVERRIDE.get().unwrap_or(&DEFAULT_BUFFER_SIZE)
}
