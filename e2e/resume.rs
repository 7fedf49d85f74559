//! E2E Test Suite 02: Resumable Decoding
//!
//! Exercises the position-tracking side of `Decompressor`: sources that run
//! dry and get replaced, contexts carried across sessions through `clone` and
//! `marshal`/`unmarshal`, and consecutive frames decoded with `reset`.

use std::fs;
use std::io::Cursor;

use anyhow::{ensure, Result};
use lz4framed::{
    compress, BlockSizeId, CompressorConfig, DecompressionContext, Decompressor, FramedError,
};
use tempfile::tempdir;

fn payload(len: usize) -> Vec<u8> {
    let mut s = 0x2545_F491u32;
    (0..len)
        .map(|i| {
            s = s.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
            if s >> 29 == 0 { (s >> 21) as u8 } else { b"resume"[i % 6] }
        })
        .collect()
}

/// Drains `d` until it finishes or reports `NoData`. Any other error fails.
fn drain_available(d: &Decompressor, out: &mut Vec<u8>) -> Result<bool> {
    for chunk in d.iter() {
        match chunk {
            Ok(bytes) => out.extend(bytes),
            Err(FramedError::NoData) => return Ok(false),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

#[test]
fn source_replaced_many_times() -> Result<()> {
    let data = payload(1_500_000);
    let cfg = CompressorConfig::default().content_checksum(true).block_checksum(true);
    let frame = compress(&data, &cfg)?;

    // Deliver the frame in uneven segments, reattaching after each NoData.
    let cuts = [1usize, 9, 15, 16, 4_000, 70_000, 70_001, 300_000, frame.len()];
    let d = Decompressor::new(Cursor::new(Vec::new()));
    let mut out = Vec::new();
    let mut start = 0;
    let mut finished = false;
    for &cut in &cuts {
        let cut = cut.min(frame.len());
        d.attach(Cursor::new(frame[start..cut].to_vec()));
        start = cut;
        finished = drain_available(&d, &mut out)?;
        ensure!(d.data_read() == cut as u64, "read {} of {cut}", d.data_read());
    }
    ensure!(finished, "frame should be complete");
    assert_eq!(out, data);
    Ok(())
}

#[test]
fn marshalled_context_survives_a_file_round_trip() -> Result<()> {
    let data = payload(800_000);
    let cfg = CompressorConfig::default().block_size_id(BlockSizeId::Max256Kb);
    let frame = compress(&data, &cfg)?;
    let dir = tempdir()?;
    let state_path = dir.path().join("ctx.bin");

    // First session: decode about half, persist position + context.
    let half = frame.len() / 2;
    let first = Decompressor::new(Cursor::new(frame[..half].to_vec()));
    let mut out = Vec::new();
    ensure!(!drain_available(&first, &mut out)?);
    fs::write(&state_path, first.context().marshal())?;
    let offset = first.data_read() as usize;
    drop(first);

    // Second session: restore and continue from the saved offset.
    let ctx = DecompressionContext::unmarshal(&fs::read(&state_path)?)?;
    ensure!(!ctx.verifies_content());
    let second = Decompressor::new(Cursor::new(frame[offset..].to_vec()));
    second.set_context(ctx);
    ensure!(drain_available(&second, &mut out)?);
    assert_eq!(out, data);
    Ok(())
}

#[test]
fn cloned_context_keeps_checksum_verification() -> Result<()> {
    let data = payload(300_000);
    let cfg = CompressorConfig::default().content_checksum(true);
    let mut frame = compress(&data, &cfg)?;
    let last = frame.len() - 1;
    frame[last] ^= 0x80;

    let cut = frame.len() / 3;
    let first = Decompressor::new(Cursor::new(frame[..cut].to_vec()));
    let mut out = Vec::new();
    drain_available(&first, &mut out)?;

    let cloned = first.context();
    ensure!(cloned.verifies_content());
    let second = Decompressor::new(Cursor::new(frame[cut..].to_vec()));
    second.set_context(cloned);
    let err = second
        .iter()
        .find_map(Result::err)
        .ok_or_else(|| anyhow::anyhow!("corruption went unnoticed"))?;
    assert_eq!(err.code(), Some(lz4framed::ErrorCode::ContentChecksumInvalid));
    Ok(())
}

#[test]
fn consecutive_frames_with_reset() -> Result<()> {
    let first = payload(50_000);
    let second = payload(70_000);
    let mut stream = compress(&first, &CompressorConfig::default())?;
    stream.extend(compress(&second, &CompressorConfig::default().linked(false))?);

    let d = Decompressor::new(Cursor::new(stream));
    let mut out = Vec::new();
    ensure!(drain_available(&d, &mut out)?);
    assert_eq!(out, first);
    let first_info = d.frame_info();

    d.reset();
    ensure!(d.frame_info().is_none());
    out.clear();
    ensure!(drain_available(&d, &mut out)?);
    assert_eq!(out, second);
    assert_ne!(d.frame_info(), first_info);
    Ok(())
}
