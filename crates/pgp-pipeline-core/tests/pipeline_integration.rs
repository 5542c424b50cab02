//! End-to-end tests exercising `Pipeline` as a whole (spec.md §8's
//! cross-cutting scenarios), as opposed to the unit tests next to each
//! module that exercise a single filter in isolation.

use pgp_pipeline_core::{
    block::BlockFilter, Direction, Downstream, Filter, Pipeline, PipelineError, UnderflowOutcome,
};

#[test]
fn zero_copy_drain_large_buffer_in_one_call() {
    let pattern: Vec<u8> = (0..2_000_000u32).map(|i| (i % 251) as u8).collect();
    let mut pipeline = Pipeline::attach_stream(pattern.clone(), true, false, None);
    let mut dest = vec![0u8; pattern.len()];
    let n = pipeline.read(&mut dest).unwrap();
    assert_eq!(n, pattern.len());
    assert_eq!(dest, pattern);
    assert_eq!(pipeline.read(&mut dest[..1]).unwrap(), 0, "must report EOF afterwards");
}

#[test]
fn auto_splice_pops_exhausted_pushed_filter() {
    // Same wire encoding as the block-filter unit test: 5x512-byte
    // partial chunks followed by a zero-length final header.
    let mut pattern = Vec::new();
    for _ in 0..10 {
        pattern.extend((0u8..=255).collect::<Vec<u8>>());
    }
    let mut wire = Vec::new();
    let mut rest = &pattern[..];
    for _ in 0..5 {
        wire.push(0xE9);
        wire.extend_from_slice(&rest[..512]);
        rest = &rest[512..];
    }
    wire.push(0x00);

    let first_c = wire[0];
    let mut pipeline = Pipeline::attach_stream(wire[1..].to_vec(), true, false, None);
    pipeline
        .push(Direction::InputStream, Box::new(BlockFilter::for_read(first_c)))
        .unwrap();
    assert_eq!(pipeline.depth(), 2);

    let mut decoded = Vec::new();
    let mut scratch = [0u8; 333];
    loop {
        let n = pipeline.read(&mut scratch).unwrap();
        if n == 0 {
            break;
        }
        decoded.extend_from_slice(&scratch[..n]);
    }
    assert_eq!(decoded, pattern);
    assert_eq!(pipeline.depth(), 1, "exhausted pushed filter should auto-splice away");
}

#[test]
fn tell_is_monotonic_across_auto_splice() {
    // Same wire encoding as above: push a pushed filter, read across the
    // point where it exhausts and auto-splices away, and check that
    // `tell()` never regresses even though the new head's own counters
    // restart at zero internally.
    let mut pattern = Vec::new();
    for _ in 0..10 {
        pattern.extend((0u8..=255).collect::<Vec<u8>>());
    }
    let mut wire = Vec::new();
    let mut rest = &pattern[..];
    for _ in 0..5 {
        wire.push(0xE9);
        wire.extend_from_slice(&rest[..512]);
        rest = &rest[512..];
    }
    wire.push(0x00);

    let first_c = wire[0];
    let mut pipeline = Pipeline::attach_stream(wire[1..].to_vec(), true, false, None);
    pipeline
        .push(Direction::InputStream, Box::new(BlockFilter::for_read(first_c)))
        .unwrap();

    let mut scratch = [0u8; 333];
    let mut last_tell = pipeline.tell();
    loop {
        let n = pipeline.read(&mut scratch).unwrap();
        let now = pipeline.tell();
        assert!(now >= last_tell, "tell() regressed from {last_tell} to {now}");
        last_tell = now;
        if n == 0 {
            break;
        }
    }
    assert_eq!(last_tell as usize, pattern.len());
}

#[test]
fn read_limit_caps_bytes_and_disables_fast_path() {
    let data = vec![9u8; 4096];
    let mut pipeline = Pipeline::attach_stream(data, true, false, Some(10));

    let mut buf = [0u8; 1024];
    let n = pipeline.read(&mut buf).unwrap();
    assert_eq!(n, 10, "read must stop at the configured limit even though the source has more");

    let n2 = pipeline.read(&mut buf).unwrap();
    assert_eq!(n2, 0, "subsequent reads must report EOF once the limit is exhausted");
}

#[test]
fn close_cache_rewinds_on_reuse() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reused.bin");
    let path_str = path.to_string_lossy().to_string();
    std::fs::write(&path, b"0123456789").unwrap();

    let mut first = Pipeline::open_read(&path_str).unwrap();
    let mut buf = [0u8; 4];
    assert_eq!(first.read(&mut buf).unwrap(), 4);
    assert_eq!(&buf, b"0123");
    first.close().unwrap();

    let mut second = Pipeline::open_read(&path_str).unwrap();
    let mut buf2 = [0u8; 10];
    let n = second.read(&mut buf2).unwrap();
    assert_eq!(&buf2[..n], b"0123456789", "reused handle must rewind to offset 0");
    second.close().unwrap();
}

#[test]
fn cancel_deletes_the_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aborted.bin");
    let path_str = path.to_string_lossy().to_string();

    let mut pipeline = Pipeline::create_write(&path_str, false, false).unwrap();
    pipeline.write(b"never should land on disk").unwrap();
    pipeline.cancel().unwrap();

    assert!(!path.exists());
}

/// A filter that hands back 50 bytes, then a single I/O error, to verify
/// the sticky-error protocol (spec.md §4.D step 4/5d; §7).
#[derive(Debug)]
struct FlakySource {
    first_chunk: Vec<u8>,
    served_first: bool,
}

impl Filter for FlakySource {
    fn underflow(&mut self, _down: &mut dyn Downstream, buf: &mut [u8]) -> pgp_pipeline_core::Result<UnderflowOutcome> {
        if !self.served_first {
            self.served_first = true;
            let n = self.first_chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&self.first_chunk[..n]);
            return Ok(UnderflowOutcome::Filled(n));
        }
        Err(PipelineError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk fell off")))
    }

    fn describe(&self) -> &'static str {
        "flaky-source"
    }
}

#[test]
fn sticky_error_surfaces_only_after_buffer_drains() {
    let mut pipeline = Pipeline::attach_stream(Vec::new(), true, false, None);
    pipeline
        .push(
            Direction::InputStream,
            Box::new(FlakySource { first_chunk: vec![7u8; 50], served_first: false }),
        )
        .unwrap();

    let mut buf = [0u8; 100];
    let n = pipeline.read(&mut buf).unwrap();
    assert_eq!(n, 50, "first call must return exactly the bytes served before the error");

    let err = pipeline.read(&mut buf).unwrap_err();
    assert!(matches!(err, PipelineError::Io(_)), "second call must surface the stored error");
}

#[test]
fn read_line_truncates_long_lines() {
    let long_line: Vec<u8> = std::iter::repeat(b'x').take(100).chain(std::iter::once(b'\n')).collect();
    let mut pipeline = Pipeline::attach_stream(long_line, true, false, None);
    let result = pipeline.read_line(16).unwrap();
    assert!(result.truncated);
    assert_eq!(result.bytes.len(), 16);
    assert_eq!(*result.bytes.last().unwrap(), b'\n');
}

#[test]
fn read_line_returns_short_lines_untouched() {
    let mut pipeline = Pipeline::attach_stream(b"hello\nworld\n".to_vec(), true, false, None);
    let first = pipeline.read_line(256).unwrap();
    assert!(!first.truncated);
    assert_eq!(first.bytes, b"hello\n");
    let second = pipeline.read_line(256).unwrap();
    assert_eq!(second.bytes, b"world\n");
}

/// A no-op filter used purely to exercise the nesting-depth limit;
/// direction and data flow are irrelevant here.
#[derive(Debug)]
struct NoopFilter;

impl Filter for NoopFilter {
    fn underflow(&mut self, _down: &mut dyn Downstream, _buf: &mut [u8]) -> pgp_pipeline_core::Result<UnderflowOutcome> {
        Ok(UnderflowOutcome::Eof)
    }

    fn describe(&self) -> &'static str {
        "noop"
    }
}

#[test]
fn push_past_max_nesting_fails() {
    let mut pipeline = Pipeline::attach_stream(Vec::new(), true, false, None);
    // Pipeline already has 1 node (the attach_stream base); MAX_NESTING
    // more pushes should exhaust the budget.
    for _ in 0..62 {
        pipeline.push(Direction::InputStream, Box::new(NoopFilter)).unwrap();
    }
    assert_eq!(pipeline.depth(), 63);
    pipeline.push(Direction::InputStream, Box::new(NoopFilter)).unwrap();
    assert_eq!(pipeline.depth(), 64);
    let err = pipeline.push(Direction::InputStream, Box::new(NoopFilter)).unwrap_err();
    assert!(matches!(err, PipelineError::TooDeep));
}

#[test]
fn copy_transfers_everything_between_pipelines() {
    let mut src = Pipeline::attach_stream(b"the quick brown fox".to_vec(), true, false, None);
    let mut dst = Pipeline::temp_out();
    let n = Pipeline::copy(&mut src, &mut dst).unwrap();
    assert_eq!(n, 20);
    let out = dst.into_temp_bytes().unwrap();
    assert_eq!(out, b"the quick brown fox");
}

#[test]
fn seek_is_rejected_once_a_filter_is_pushed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seekable.bin");
    std::fs::write(&path, b"0123456789").unwrap();
    let mut pipeline = Pipeline::open_read(&path.to_string_lossy()).unwrap();
    pipeline
        .push(Direction::InputStream, Box::new(NoopFilter))
        .unwrap();
    let err = pipeline.seek(0).unwrap_err();
    assert!(matches!(err, PipelineError::Misuse(_)));
}
