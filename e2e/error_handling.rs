//! E2E Test Suite 03: Error Handling
//!
//! How failures surface through the public API: `NoData` for missing input,
//! `Configuration` for rejected parameters, `Engine` for protocol failures,
//! `Io` for source/sink failures.

use std::io::{self, Cursor, Write};

use lz4framed::{
    compress, decompress, Compressor, CompressorConfig, Decompressor, ErrorCode, FramedError,
    Operation,
};

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn sample() -> Vec<u8> {
    b"error handling sample text; ".repeat(5_000)
}

fn first_error(d: &Decompressor) -> Option<FramedError> {
    d.iter().find_map(Result::err)
}

/// Sink that accepts `budget` bytes and then fails.
struct FullDisk {
    budget: usize,
}

impl Write for FullDisk {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.len() > self.budget {
            return Err(io::Error::new(io::ErrorKind::StorageFull, "disk full"));
        }
        self.budget -= buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compressor side
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn empty_update_is_no_data_and_harmless() {
    let c = Compressor::new(CompressorConfig::default()).unwrap();
    assert!(c.update(b"").unwrap_err().is_no_data());
    let mut frame = c.update(b"still fine").unwrap().unwrap_or_default();
    frame.extend(c.end().unwrap().unwrap_or_default());
    assert_eq!(decompress(&frame).unwrap(), b"still fine");
}

#[test]
fn level_out_of_range_is_a_configuration_error() {
    for level in [-1, 13, i32::MAX] {
        let err = Compressor::new(CompressorConfig::default().level(level)).unwrap_err();
        assert!(matches!(
            err,
            FramedError::Configuration { op: Operation::Begin, code: ErrorCode::CompressionLevelInvalid }
        ));
        assert!(compress(b"x", &CompressorConfig::default().level(level)).is_err());
    }
}

#[test]
fn calls_after_end_are_rejected() {
    let c = Compressor::new(CompressorConfig::default()).unwrap();
    c.end().unwrap();
    assert!(c.is_finished());
    for (result, op) in [
        (c.update(b"late"), Operation::Update),
        (c.flush(), Operation::Flush),
        (c.end(), Operation::End),
    ] {
        let err = result.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::CompressionStateUninitialized));
        assert_eq!(err.operation(), Some(op));
    }
}

#[test]
fn declared_size_mismatch_fails_at_end() {
    let c = Compressor::new(CompressorConfig::default().content_size(100)).unwrap();
    c.update(&[0u8; 60]).unwrap();
    let err = c.end().unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::FrameSizeWrong));
    assert_eq!(err.operation(), Some(Operation::End));
    // the session is finished even though end failed
    assert!(c.is_finished());
}

#[test]
fn sink_failure_is_an_io_error() {
    let c = Compressor::with_sink(CompressorConfig::default(), FullDisk { budget: 10 }).unwrap();
    match c.update(&sample()) {
        Err(FramedError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::StorageFull),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn scoped_body_error_skips_end() {
    let result = Compressor::scoped(CompressorConfig::default(), Vec::new(), |c| {
        c.update(b"partial")?;
        Err::<(), _>(FramedError::NoData)
    });
    assert!(matches!(result, Err(FramedError::NoData)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Decompressor side
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn one_shot_missing_input_is_no_data() {
    assert!(decompress(b"").unwrap_err().is_no_data());
    let frame = compress(&sample(), &CompressorConfig::default()).unwrap();
    for cut in [1, 6, 7, frame.len() / 2, frame.len() - 1] {
        assert!(decompress(&frame[..cut]).unwrap_err().is_no_data(), "cut {cut}");
    }
}

#[test]
fn wrong_magic_is_frame_type_unknown() {
    let mut frame = compress(&sample(), &CompressorConfig::default()).unwrap();
    frame[0] = 0x05;
    let d = Decompressor::new(Cursor::new(frame.clone()));
    let err = first_error(&d).unwrap();
    assert_eq!(err.code(), Some(ErrorCode::FrameTypeUnknown));
    assert_eq!(err.operation(), Some(Operation::Decompress));
    assert_eq!(decompress(&frame).unwrap_err().code(), Some(ErrorCode::FrameTypeUnknown));
}

#[test]
fn header_corruption_is_detected() {
    let frame = compress(&sample(), &CompressorConfig::default()).unwrap();

    let mut bad_checksum = frame.clone();
    bad_checksum[6] ^= 0xFF;
    let err = decompress(&bad_checksum).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::HeaderChecksumInvalid));

    let mut reserved = frame.clone();
    reserved[4] |= 0x02;
    assert_eq!(decompress(&reserved).unwrap_err().code(), Some(ErrorCode::ReservedFlagSet));

    let mut version = frame;
    version[4] = (version[4] & 0x3F) | 0x80;
    assert_eq!(decompress(&version).unwrap_err().code(), Some(ErrorCode::HeaderVersionWrong));
}

#[test]
fn checksum_failures_are_engine_errors() {
    let cfg = CompressorConfig::default().content_checksum(true).block_checksum(true);
    let frame = compress(&sample(), &cfg).unwrap();

    let mut block = frame.clone();
    block[12] ^= 0x01;
    let err = first_error(&Decompressor::new(Cursor::new(block))).unwrap();
    assert!(matches!(err, FramedError::Engine { .. }));
    assert_eq!(err.code(), Some(ErrorCode::BlockChecksumInvalid));

    let mut content = frame;
    let last = content.len() - 2;
    content[last] ^= 0x01;
    let err = first_error(&Decompressor::new(Cursor::new(content))).unwrap();
    assert_eq!(err.code(), Some(ErrorCode::ContentChecksumInvalid));
    assert_eq!(err.to_string(), "decompress failed: ERROR_contentChecksum_invalid");
}

#[test]
fn trailing_bytes_after_frame_in_one_shot() {
    let mut frame = compress(&sample(), &CompressorConfig::default()).unwrap();
    frame.push(0);
    assert_eq!(decompress(&frame).unwrap_err().code(), Some(ErrorCode::SrcSizeTooLarge));
}

#[test]
fn errors_stop_iteration_but_no_data_allows_retry() {
    let frame = compress(&sample(), &CompressorConfig::default()).unwrap();
    let d = Decompressor::new(Cursor::new(frame[..20].to_vec()));
    assert!(first_error(&d).unwrap().is_no_data());
    // no new source: still no data
    assert!(first_error(&d).unwrap().is_no_data());
    d.attach(Cursor::new(frame[20..].to_vec()));
    let out: Vec<u8> = d.iter().collect::<Result<Vec<_>, _>>().unwrap().concat();
    assert_eq!(out, sample());
}
