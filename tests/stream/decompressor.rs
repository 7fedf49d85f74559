// Decompressor session behaviour: read accounting, frame info, hints, NoData,
// reconnection, context replacement.

use std::io::{self, Cursor};
use std::sync::{Arc, Mutex};

use lz4framed::frame::DecompressionContext;
use lz4framed::{
    compress, BlockSizeId, CompressorConfig, Decompressor, ErrorCode, FramedError, Operation,
    Source,
};

/// Source that hands out at most `max` bytes per read.
struct Trickle {
    data: Vec<u8>,
    pos: usize,
    max: usize,
}

impl Trickle {
    fn new(data: Vec<u8>, max: usize) -> Self {
        Self { data, pos: 0, max }
    }
}

impl Source for Trickle {
    fn read_up_to(&mut self, max: usize) -> io::Result<Vec<u8>> {
        let n = max.min(self.max).min(self.data.len() - self.pos);
        let out = self.data[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(out)
    }
}

/// Records `(requested, returned)` for every read.
struct Recording {
    inner: Trickle,
    log: Arc<Mutex<Vec<(usize, usize)>>>,
}

impl Source for Recording {
    fn read_up_to(&mut self, max: usize) -> io::Result<Vec<u8>> {
        let out = self.inner.read_up_to(max)?;
        self.log.lock().unwrap().push((max, out.len()));
        Ok(out)
    }
}

/// Source that fails every read.
struct Unplugged;

impl Source for Unplugged {
    fn read_up_to(&mut self, _max: usize) -> io::Result<Vec<u8>> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "unplugged"))
    }
}

fn smallest_checked_linked() -> CompressorConfig {
    CompressorConfig::default()
        .block_size_id(BlockSizeId::Max64Kb)
        .content_checksum(true)
        .linked(true)
}

/// Text with one byte in nine replaced by noise.
fn noisy(len: usize) -> Vec<u8> {
    let text = b"streams of words flowing through a narrow pipe, ";
    let mut state = 0x9E37_79B9u32;
    (0..len)
        .map(|i| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            if (state >> 20) % 9 == 0 {
                (state >> 24) as u8
            } else {
                text[i % text.len()]
            }
        })
        .collect()
}

fn collect(d: &Decompressor) -> Result<Vec<u8>, FramedError> {
    Ok(d.iter().collect::<Result<Vec<_>, _>>()?.concat())
}

#[test]
fn hello_world_through_four_byte_reads() {
    let frame = compress(b"hello world", &smallest_checked_linked()).unwrap();
    let d = Decompressor::new(Trickle::new(frame.clone(), 4));
    assert_eq!(collect(&d).unwrap(), b"hello world");
    assert_eq!(d.data_read(), frame.len() as u64);
    assert_eq!(d.next_data_block(), frame.len() as u64);
}

#[test]
fn empty_source_is_no_data_not_a_protocol_error() {
    let d = Decompressor::new(Trickle::new(Vec::new(), 4));
    let first = d.iter().next().expect("one item");
    assert!(matches!(first, Err(FramedError::NoData)));
    assert_eq!(d.last_hint(), 15);
    assert!(!d.last_read_aligned());
    assert!(d.frame_info().is_none());
    assert!(d.first15().is_none());
}

#[test]
fn last_read_aligned_matches_every_read() {
    let frame = compress(&noisy(300_000), &smallest_checked_linked()).unwrap();
    for max in [usize::MAX, 5_000, 7] {
        let log = Arc::new(Mutex::new(Vec::new()));
        let source = Recording { inner: Trickle::new(frame.clone(), max), log: Arc::clone(&log) };
        let d = Decompressor::new(source);
        let mut reads = 0;
        for chunk in d.iter() {
            chunk.unwrap();
            let log = log.lock().unwrap();
            let &(requested, returned) = log.last().unwrap();
            assert_eq!(d.last_hint(), requested);
            assert_eq!(d.last_read_aligned(), requested == returned);
            reads = log.len();
        }
        assert!(reads > 0);
        if max == 7 {
            assert!(log.lock().unwrap().iter().any(|&(req, got)| got < req));
        }
    }
}

#[test]
fn truncated_source_ends_unaligned() {
    let frame = compress(b"cut short", &smallest_checked_linked()).unwrap();
    let d = Decompressor::new(Cursor::new(frame[..frame.len() - 2].to_vec()));
    let last = d.iter().last().unwrap();
    assert!(last.unwrap_err().is_no_data());
    assert!(!d.last_read_aligned());
    assert_eq!(d.data_read(), frame.len() as u64 - 2);
}

#[test]
fn frame_info_is_stable_after_header_pass() {
    let cfg = CompressorConfig::default()
        .block_size_id(BlockSizeId::Max256Kb)
        .content_checksum(true)
        .block_checksum(true);
    let data = b"stable header ".repeat(50_000);
    let frame = compress(&data, &cfg).unwrap();
    let d = Decompressor::new(Cursor::new(frame.clone()));

    let mut it = d.iter();
    let mut seen = None;
    let mut out = Vec::new();
    while let Some(chunk) = it.next() {
        out.extend(chunk.unwrap());
        let info = d.frame_info().expect("header parsed on first read");
        match seen {
            None => seen = Some(info),
            Some(prev) => assert_eq!(prev, info),
        }
        // chunk size follows the block size once the header is known
        assert!(out.len() <= data.len());
    }
    let info = seen.unwrap();
    assert_eq!(info.block_size_id, BlockSizeId::Max256Kb);
    assert_eq!(out, data);
    assert_eq!(d.first15().unwrap(), frame[..15].to_vec());
}

#[test]
fn chunks_never_exceed_block_size() {
    let data = b"0123456789abcdef".repeat(40_000);
    let frame = compress(&data, &CompressorConfig::default()).unwrap();
    let d = Decompressor::new(Cursor::new(frame));
    let chunks: Vec<Vec<u8>> = d.iter().collect::<Result<_, _>>().unwrap();
    assert!(chunks.iter().all(|c| c.len() <= 64 * 1024));
    assert_eq!(chunks.concat(), data);
}

#[test]
fn small_reads_still_learn_the_header() {
    let frame = compress(&vec![42u8; 100_000], &CompressorConfig::default().content_size(100_000))
        .unwrap();
    let d = Decompressor::new(Trickle::new(frame, 3));
    let out = collect(&d).unwrap();
    assert_eq!(out.len(), 100_000);
    let info = d.frame_info().unwrap();
    assert_eq!(info.content_size, 100_000);
    // snapshot holds the first 15 bytes even though they arrived in pieces
    assert_eq!(d.first15().unwrap().len(), 15);
}

#[test]
fn reconnecting_resumes_mid_frame() {
    let data = b"reconnect me please ".repeat(20_000);
    let frame = compress(&data, &smallest_checked_linked()).unwrap();
    let cut = frame.len() * 2 / 3;

    let d = Decompressor::new(Cursor::new(frame[..cut].to_vec()));
    let mut out = Vec::new();
    let mut it = d.iter();
    let err = loop {
        match it.next() {
            Some(Ok(chunk)) => out.extend(chunk),
            Some(Err(err)) => break err,
            None => panic!("frame cannot be complete"),
        }
    };
    assert!(err.is_no_data());
    assert!(it.next().is_none());
    assert_eq!(d.data_read(), cut as u64);

    d.attach(Cursor::new(frame[cut..].to_vec()));
    out.extend(collect(&d).unwrap());
    assert_eq!(out, data);
    assert_eq!(d.data_read(), frame.len() as u64);
}

#[test]
fn set_context_continues_from_an_unmarshalled_copy() {
    let data = noisy(480_000);
    let frame = compress(&data, &smallest_checked_linked()).unwrap();

    let first = Decompressor::new(Trickle::new(frame.clone(), 10_000));
    let mut it = first.iter();
    let mut out = Vec::new();
    while first.data_read() < 20_000 {
        out.extend(it.next().unwrap().unwrap());
    }
    // each step decodes at most one block, so nothing is left queued in `it`
    drop(it);
    let blob = first.context().marshal();
    let consumed = first.data_read() as usize;

    let second = Decompressor::new(Cursor::new(frame[consumed..].to_vec()));
    second.set_context(DecompressionContext::unmarshal(&blob).unwrap());
    assert_eq!(second.frame_info(), first.frame_info());
    out.extend(collect(&second).unwrap());
    assert_eq!(out, data);
}

#[test]
fn forged_context_is_refused_before_it_reaches_a_session() {
    let data = noisy(200_000);
    let frame = compress(&data, &smallest_checked_linked().block_checksum(true)).unwrap();

    let first = Decompressor::new(Trickle::new(frame[..5_000].to_vec(), 1_000));
    let mut out = Vec::new();
    for chunk in first.iter() {
        match chunk {
            Ok(bytes) => out.extend(bytes),
            Err(err) => {
                assert!(err.is_no_data());
                break;
            }
        }
    }
    let blob = first.context().marshal();
    let consumed = first.data_read() as usize;

    // Mid-block state relabelled as a suffix: the staged block bytes no
    // longer fit, so the record is refused and the session keeps its context.
    let mut forged = blob.clone();
    forged[5] = 3;
    let second = Decompressor::new(Cursor::new(frame[consumed..].to_vec()));
    let err = DecompressionContext::unmarshal(&forged)
        .map(|ctx| second.set_context(ctx))
        .unwrap_err();
    assert_eq!(err, ErrorCode::ParameterInvalid);
    assert!(second.frame_info().is_none());

    second.set_context(DecompressionContext::unmarshal(&blob).unwrap());
    out.extend(collect(&second).unwrap());
    assert_eq!(out, data);
}

#[test]
fn first15_belongs_to_the_session_that_read_the_header() {
    let frame = compress(&noisy(100_000), &smallest_checked_linked()).unwrap();
    let first = Decompressor::new(Cursor::new(frame[..40].to_vec()));
    let _ = first.iter().last();
    assert_eq!(first.first15().unwrap(), frame[..15].to_vec());

    // A context handed over from elsewhere brings its frame info but no bytes.
    let second = Decompressor::new(Cursor::new(frame[40..].to_vec()));
    second.set_context(first.context());
    assert!(second.frame_info().is_some());
    assert!(second.first15().is_none());
}

#[test]
fn io_failure_surfaces_as_io_error() {
    let d = Decompressor::new(Unplugged);
    match d.iter().next() {
        Some(Err(FramedError::Io(e))) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn corrupt_block_is_fatal_and_fuses_iterator() {
    let mut frame = compress(&b"corrupt ".repeat(10_000), &CompressorConfig::default().block_checksum(true))
        .unwrap();
    frame[20] ^= 0x55;
    let d = Decompressor::new(Cursor::new(frame));
    let mut it = d.iter();
    let err = loop {
        match it.next() {
            Some(Ok(_)) => continue,
            Some(Err(err)) => break err,
            None => panic!("corruption not detected"),
        }
    };
    assert_eq!(err.code(), Some(ErrorCode::BlockChecksumInvalid));
    assert_eq!(err.operation(), Some(Operation::Decompress));
    assert!(it.next().is_none());
}

#[test]
fn trailing_garbage_after_frame_is_rejected() {
    let mut frame = compress(b"tail", &CompressorConfig::default()).unwrap();
    frame.extend_from_slice(b"junk");
    // frame is 7 + 4 + 4 + 4 = 19 bytes; the first 15-byte read stays inside it,
    // the engine then asks for exactly what is left.
    let d = Decompressor::new(Cursor::new(frame));
    assert_eq!(collect(&d).unwrap(), b"tail");

    // One-shot decoding sees the extra bytes.
    let mut frame = compress(b"tail", &CompressorConfig::default()).unwrap();
    frame.extend_from_slice(b"junk");
    let err = lz4framed::decompress(&frame).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::SrcSizeTooLarge));
}

#[test]
fn skippable_frame_yields_nothing() {
    let mut frame = 0x184D_2A5Au32.to_le_bytes().to_vec();
    frame.extend_from_slice(&6u32.to_le_bytes());
    frame.extend_from_slice(b"ignore");
    let d = Decompressor::new(Cursor::new(frame));
    assert_eq!(d.iter().count(), 0);
    assert_eq!(d.frame_info().unwrap().content_size, 6);
}
