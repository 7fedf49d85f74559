//! LZ4 frame engine — streaming compression and decompression contexts.
//!
//! The frame layout is bit exact with the LZ4 frame format v1.6; block
//! payloads are encoded and decoded by `lz4_flex`.

pub mod compress;
pub mod decompress;
pub mod header;
pub mod marshal;
pub mod types;

pub use compress::CompressionContext;
pub use decompress::{max_block_size, DecodeOutput, DecompressionContext};
pub use header::{block_size_for_id, header_size};
pub use types::{
    BlockChecksum, BlockMode, BlockSizeId, ContentChecksum, ErrorCode, FrameInfo, FrameType,
    Preferences, COMPRESSION_MAX, COMPRESSION_MIN, COMPRESSION_MIN_HC, MAGIC_NUMBER,
    MAGIC_SKIPPABLE_START, MAX_DICT_SIZE,
};

/// Appends `new_bytes` to a history window capped at `MAX_DICT_SIZE`,
/// dropping the oldest bytes.
pub(crate) fn roll_window(window: &mut Vec<u8>, new_bytes: &[u8]) {
    let n = new_bytes.len();
    if n >= MAX_DICT_SIZE {
        window.clear();
        window.extend_from_slice(&new_bytes[n - MAX_DICT_SIZE..]);
        return;
    }
    let total = window.len() + n;
    if total > MAX_DICT_SIZE {
        window.drain(..total - MAX_DICT_SIZE);
    }
    window.extend_from_slice(new_bytes);
}
