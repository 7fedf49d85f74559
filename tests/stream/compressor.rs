// Compressor session behaviour: header delivery, NoData, sink vs return mode,
// finalization and the scoped form.

use std::io::Cursor;

use lz4framed::{
    decompress, BlockSizeId, Compressor, CompressorConfig, Decompressor, ErrorCode, FramedError,
    Operation,
};

fn drain(d: &Decompressor) -> Vec<u8> {
    d.iter().collect::<Result<Vec<_>, _>>().expect("decode").concat()
}

#[test]
fn returned_output_concatenates_to_a_frame() {
    let c = Compressor::new(CompressorConfig::default().content_checksum(true)).unwrap();
    let mut frame = Vec::new();
    for part in ["the ", "quick ", "brown ", "fox"] {
        frame.extend(c.update(part.as_bytes()).unwrap().unwrap());
    }
    frame.extend(c.end().unwrap().unwrap());
    assert_eq!(decompress(&frame).unwrap(), b"the quick brown fox");
}

#[test]
fn immediate_end_on_sink_writes_an_empty_frame() {
    let c = Compressor::with_sink(CompressorConfig::default(), Vec::new()).unwrap();
    assert_eq!(c.end().unwrap(), None);
    let sink = c.into_sink().unwrap();
    // header + end mark
    assert_eq!(sink.len(), 7 + 4);

    let d = Decompressor::new(Cursor::new(sink));
    assert_eq!(d.iter().count(), 0);
    assert!(d.frame_info().is_some());
}

#[test]
fn immediate_end_with_checksum_decodes_empty() {
    let c = Compressor::new(CompressorConfig::default().content_checksum(true)).unwrap();
    let frame = c.end().unwrap().unwrap();
    assert_eq!(frame.len(), 7 + 4 + 4);
    assert!(decompress(&frame).unwrap().is_empty());
}

#[test]
fn empty_update_is_no_data_before_and_after_first_success() {
    let c = Compressor::with_sink(CompressorConfig::default(), Vec::new()).unwrap();
    assert!(matches!(c.update(&[]), Err(FramedError::NoData)));
    c.update(b"payload").unwrap();
    assert!(matches!(c.update(&[]), Err(FramedError::NoData)));
    c.end().unwrap();
    let d = Decompressor::new(Cursor::new(c.into_sink().unwrap()));
    assert_eq!(drain(&d), b"payload");
}

#[test]
fn use_after_end_is_an_engine_error() {
    let c = Compressor::new(CompressorConfig::default()).unwrap();
    c.update(b"x").unwrap();
    c.end().unwrap();
    let err = c.update(b"y").unwrap_err();
    assert!(matches!(
        err,
        FramedError::Engine { op: Operation::Update, code: ErrorCode::CompressionStateUninitialized }
    ));
    assert_eq!(c.end().unwrap_err().operation(), Some(Operation::End));
}

#[test]
fn declared_content_size_mismatch_fails_at_end() {
    let c = Compressor::new(CompressorConfig::default().content_size(100)).unwrap();
    c.update(b"too short").unwrap();
    let err = c.end().unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::FrameSizeWrong));
    assert!(c.is_finished());
}

#[test]
fn autoflush_returns_a_block_per_update() {
    let c = Compressor::new(CompressorConfig::default().autoflush(true)).unwrap();
    let header_and_block = c.update(b"abc").unwrap().unwrap();
    assert!(header_and_block.len() > 7);
    assert!(!c.update(b"def").unwrap().unwrap().is_empty());
}

#[test]
fn flush_then_end() {
    let c = Compressor::with_sink(
        CompressorConfig::default().block_size_id(BlockSizeId::Max4Mb),
        Vec::new(),
    )
    .unwrap();
    c.update(b"flushed ").unwrap();
    c.flush().unwrap();
    c.update(b"then ended").unwrap();
    c.end().unwrap();
    let frame = c.into_sink().unwrap();
    assert_eq!(decompress(&frame).unwrap(), b"flushed then ended");
}

#[test]
fn scoped_finalizes_on_success() {
    let (written, sink) = Compressor::scoped(CompressorConfig::default(), Vec::new(), |c| {
        let mut n = 0;
        for line in ["one\n", "two\n", "three\n"] {
            c.update(line.as_bytes())?;
            n += line.len();
        }
        Ok::<_, FramedError>(n)
    })
    .unwrap();
    assert_eq!(written, 14);
    assert_eq!(decompress(&sink).unwrap(), b"one\ntwo\nthree\n");
}

#[test]
fn scoped_leaves_frame_open_on_error() {
    let result: anyhow::Result<((), Vec<u8>)> =
        Compressor::scoped(CompressorConfig::default(), Vec::new(), |c| {
            c.update(b"partial")?;
            anyhow::bail!("producer failed")
        });
    assert_eq!(result.unwrap_err().to_string(), "producer failed");
}

#[test]
fn invalid_configuration_is_reported_with_code() {
    let err = Compressor::new(CompressorConfig::default().level(-3)).err().unwrap();
    assert!(matches!(err, FramedError::Configuration { .. }));
    assert_eq!(err.code(), Some(ErrorCode::CompressionLevelInvalid));
}
