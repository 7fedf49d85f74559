#![no_main]
use libfuzzer_sys::fuzz_target;
use lz4framed::{BlockSizeId, Compressor, CompressorConfig};

fuzz_target!(|data: &[u8]| {
    // First byte picks the configuration, second the update piece size.
    let (&knobs, rest) = match data.split_first() {
        Some(split) => split,
        None => return,
    };
    let (&piece, payload) = rest.split_first().unwrap_or((&0, &[]));
    let cfg = CompressorConfig::default()
        .block_size_id(BlockSizeId::ALL[usize::from(knobs & 0x3)])
        .linked(knobs & 0x4 != 0)
        .content_checksum(knobs & 0x8 != 0)
        .block_checksum(knobs & 0x10 != 0)
        .autoflush(knobs & 0x20 != 0);

    let c = Compressor::new(cfg).unwrap();
    let mut frame = Vec::new();
    for part in payload.chunks(usize::from(piece) + 1) {
        frame.extend(c.update(part).unwrap().unwrap_or_default());
    }
    frame.extend(c.end().unwrap().unwrap_or_default());

    let recovered = lz4framed::decompress(&frame).unwrap_or_else(|e| {
        panic!("self-compressed frame unreadable ({} bytes in): {e}", payload.len())
    });
    assert_eq!(recovered, payload);
});
