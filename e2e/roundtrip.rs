//! E2E Test Suite 01: Round Trips
//!
//! Compress with `Compressor`, decompress with `Decompressor`, across the
//! configuration space and with inputs from empty to several megabytes.
//!
//! Coverage:
//! - Empty, single-byte and multi-megabyte inputs
//! - Every block size, linked/independent, checksum combinations
//! - Arbitrary update splits and source read sizes
//! - Sink-bound and returning compressors
//! - One-shot `compress` / `decompress`

use std::io::{self, Cursor};

use anyhow::Result;
use lz4framed::{
    compress, decompress, BlockSizeId, Compressor, CompressorConfig, Decompressor, Source,
};

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn mixed(len: usize, seed: u64) -> Vec<u8> {
    let words: [&[u8]; 8] = [
        b"frame ", b"block ", b"header ", b"checksum ", b"linked ", b"stream ", b"chunk ", b"\n",
    ];
    let mut s = seed | 1;
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        s ^= s << 7;
        s ^= s >> 9;
        if s % 5 == 0 {
            out.push((s >> 32) as u8);
        } else {
            out.extend_from_slice(words[(s % 8) as usize]);
        }
    }
    out.truncate(len);
    out
}

/// Source returning `step` bytes at a time, cycling through the sizes.
struct Stepping {
    data: Cursor<Vec<u8>>,
    steps: Vec<usize>,
    turn: usize,
}

impl Source for Stepping {
    fn read_up_to(&mut self, max: usize) -> io::Result<Vec<u8>> {
        let step = self.steps[self.turn % self.steps.len()];
        self.turn += 1;
        self.data.read_up_to(max.min(step))
    }
}

fn stream_compress(cfg: CompressorConfig, data: &[u8], piece: usize) -> Result<Vec<u8>> {
    let c = Compressor::new(cfg)?;
    let mut frame = Vec::new();
    for part in data.chunks(piece) {
        frame.extend(c.update(part)?.unwrap_or_default());
    }
    frame.extend(c.end()?.unwrap_or_default());
    Ok(frame)
}

fn stream_decompress<S: Source + Send + 'static>(source: S) -> Result<Vec<u8>> {
    let d = Decompressor::new(source);
    let mut out = Vec::new();
    for chunk in &d {
        out.extend(chunk?);
    }
    Ok(out)
}

fn configs() -> Vec<CompressorConfig> {
    let mut all = Vec::new();
    for id in BlockSizeId::ALL {
        for linked in [true, false] {
            for (content, block) in [(false, false), (true, false), (false, true), (true, true)] {
                all.push(
                    CompressorConfig::default()
                        .block_size_id(id)
                        .linked(linked)
                        .content_checksum(content)
                        .block_checksum(block),
                );
            }
        }
    }
    all
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn empty_input() -> Result<()> {
    init_tracing();
    for cfg in configs() {
        let frame = compress(b"", &cfg)?;
        assert!(decompress(&frame)?.is_empty());
        assert!(stream_decompress(Cursor::new(frame))?.is_empty());
    }
    Ok(())
}

#[test]
fn single_byte_input() -> Result<()> {
    init_tracing();
    for cfg in configs() {
        let frame = stream_compress(cfg, b"!", 1)?;
        assert_eq!(stream_decompress(Cursor::new(frame))?, b"!");
    }
    Ok(())
}

#[test]
fn configuration_matrix() -> Result<()> {
    init_tracing();
    let data = mixed(300_000, 11);
    for cfg in configs() {
        let frame = stream_compress(cfg, &data, 123_457)?;
        assert_eq!(stream_decompress(Cursor::new(frame.clone()))?, data, "{cfg:?}");
        assert_eq!(decompress(&frame)?, data);
    }
    Ok(())
}

#[test]
fn multi_megabyte() -> Result<()> {
    init_tracing();
    let data = mixed(6 * 1024 * 1024 + 17, 23);
    let cfg = CompressorConfig::default()
        .block_size_id(BlockSizeId::Max4Mb)
        .content_checksum(true);
    let frame = stream_compress(cfg, &data, 3 * 1024 * 1024)?;
    assert!(frame.len() < data.len());
    assert_eq!(stream_decompress(Cursor::new(frame))?, data);
    Ok(())
}

#[test]
fn irregular_updates_and_reads() -> Result<()> {
    init_tracing();
    let data = mixed(300_000, 5);
    let cfg = CompressorConfig::default().content_checksum(true).block_checksum(true);
    for piece in [1usize, 2, 333, 65_535, 65_536, 65_537, 300_000] {
        let frame = if piece == 1 {
            // byte-wise updates on a smaller input keep the test quick
            stream_compress(cfg, &data[..20_000], piece)?
        } else {
            stream_compress(cfg, &data, piece)?
        };
        let expected = if piece == 1 { &data[..20_000] } else { &data[..] };
        let source = Stepping { data: Cursor::new(frame), steps: vec![1, 3, 4096, 7, 100_000], turn: 0 };
        assert_eq!(stream_decompress(source)?, expected, "piece {piece}");
    }
    Ok(())
}

#[test]
fn sink_and_return_modes_agree() -> Result<()> {
    init_tracing();
    let data = mixed(250_000, 3);
    let cfg = CompressorConfig::default().block_size_id(BlockSizeId::Max256Kb);

    let returned = stream_compress(cfg, &data, 10_000)?;
    let sunk = Compressor::with_sink(cfg, Vec::new())?;
    for part in data.chunks(10_000) {
        assert!(sunk.update(part)?.is_none());
    }
    sunk.end()?;
    assert_eq!(sunk.into_sink().unwrap_or_default(), returned);
    Ok(())
}

#[test]
fn autoflush_round_trip() -> Result<()> {
    init_tracing();
    let data = mixed(100_000, 9);
    let cfg = CompressorConfig::default().autoflush(true).linked(true);
    let frame = stream_compress(cfg, &data, 999)?;
    assert_eq!(decompress(&frame)?, data);
    Ok(())
}
