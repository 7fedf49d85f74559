//! Thin wrapper around the `xxhash-rust` crate providing the XXH32 pieces the
//! frame format uses: header checksums, block checksums, and the streaming
//! content checksum.

pub use xxhash_rust::xxh32::Xxh32 as Xxh32State;

/// Seed used for every checksum in an LZ4 frame.
pub const FRAME_CHECKSUM_SEED: u32 = 0;

/// One-shot XXH32 hash.
#[inline]
pub fn xxh32_oneshot(data: &[u8], seed: u32) -> u32 {
    xxhash_rust::xxh32::xxh32(data, seed)
}

/// Fresh streaming state for a frame's content checksum.
#[inline]
pub fn content_hasher() -> Xxh32State {
    Xxh32State::new(FRAME_CHECKSUM_SEED)
}
