//! E2E Test Suite 04: Interoperability with the reference `lz4` tool
//!
//! Frames written here must decode with the system `lz4` binary and frames it
//! writes must decode here, including through the streaming `Decompressor`.
//! When no `lz4` binary is available each test prints a skip message and
//! returns, so the tests still show up in the count.

use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::process::Command;

use lz4framed::{compress, decompress, BlockSizeId, CompressorConfig, Decompressor};
use tempfile::TempDir;

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Path to the system `lz4` binary, honouring `LZ4_BIN`.
fn system_lz4() -> Option<String> {
    if let Ok(p) = std::env::var("LZ4_BIN") {
        if Path::new(&p).exists() {
            return Some(p);
        }
    }
    let out = Command::new("which").arg("lz4").output().ok()?;
    let path = String::from_utf8_lossy(&out.stdout).trim().to_string();
    (out.status.success() && !path.is_empty()).then_some(path)
}

fn corpus(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    let mut i = 0u32;
    while out.len() < len {
        out.extend_from_slice(format!("record {i:08} value {} ;", i.wrapping_mul(40_503) % 977).as_bytes());
        i += 1;
    }
    out.truncate(len);
    out
}

/// Runs `lz4 <args> <input> <output>` on `data` and returns the output file.
fn run_lz4(bin: &str, args: &[&str], data: &[u8]) -> Vec<u8> {
    let dir = TempDir::new().expect("temp dir");
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    fs::write(&input, data).expect("write input");
    let status = Command::new(bin)
        .args(args)
        .args(["-q", "-f"])
        .arg(&input)
        .arg(&output)
        .status()
        .expect("spawn lz4");
    assert!(status.success(), "lz4 {args:?} failed: {status}");
    fs::read(&output).expect("read output")
}

macro_rules! require_lz4 {
    ($name:literal) => {
        match system_lz4() {
            Some(p) => p,
            None => {
                println!("SKIP {}: system lz4 binary not found", $name);
                return;
            }
        }
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn our_frames_decode_with_lz4() {
    let bin = require_lz4!("our_frames_decode_with_lz4");
    let data = corpus(700_000);
    for id in BlockSizeId::ALL {
        for linked in [true, false] {
            let cfg = CompressorConfig::default()
                .block_size_id(id)
                .linked(linked)
                .content_checksum(true)
                .block_checksum(true);
            let frame = compress(&data, &cfg).unwrap();
            assert_eq!(run_lz4(&bin, &["-d"], &frame), data, "{cfg:?}");
        }
    }
}

#[test]
fn declared_content_size_is_accepted_by_lz4() {
    let bin = require_lz4!("declared_content_size_is_accepted_by_lz4");
    let data = corpus(123_456);
    let cfg = CompressorConfig::default().content_size(data.len() as u64);
    let frame = compress(&data, &cfg).unwrap();
    assert_eq!(run_lz4(&bin, &["-d"], &frame), data);
}

#[test]
fn lz4_frames_decode_here() {
    let bin = require_lz4!("lz4_frames_decode_here");
    let data = corpus(900_000);
    for args in [
        &["-1", "-B4"][..],
        &["-9", "-B5", "-BD"][..],
        &["-1", "-B7", "--content-size"][..],
        &["-1", "-BX", "--no-frame-crc"][..],
    ] {
        let frame = run_lz4(&bin, args, &data);
        assert_eq!(decompress(&frame).unwrap(), data, "{args:?}");

        let d = Decompressor::new(Cursor::new(frame.clone()));
        let streamed: Vec<u8> = d.iter().collect::<Result<Vec<_>, _>>().unwrap().concat();
        assert_eq!(streamed, data, "{args:?}");
        assert_eq!(d.data_read(), frame.len() as u64);
    }
}

#[test]
fn lz4_rejects_our_corrupted_checksum() {
    let bin = require_lz4!("lz4_rejects_our_corrupted_checksum");
    let data = corpus(50_000);
    let mut frame = compress(&data, &CompressorConfig::default().content_checksum(true)).unwrap();
    let last = frame.len() - 1;
    frame[last] ^= 0xFF;

    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bad.lz4");
    fs::write(&input, &frame).unwrap();
    let status = Command::new(&bin)
        .args(["-d", "-q", "-f"])
        .arg(&input)
        .arg(dir.path().join("out"))
        .status()
        .unwrap();
    assert!(!status.success());
    assert!(decompress(&frame).is_err());
}
