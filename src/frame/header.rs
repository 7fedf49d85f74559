//! Byte-order helpers, block-size utilities, and frame header encode/decode.
//!
//! Covers:
//! - LE read/write helpers (`read_le32`, `write_le32`, `read_le64`, `write_le64`)
//! - `block_size_for_id`  — maximum block size for a block-size id
//! - `header_checksum`    — single-byte header checksum
//! - `header_size`        — full header length from its first bytes
//! - `encode_header`      — frame header bytes for a set of preferences
//! - `decode_header`      — `FrameInfo` from a complete header

use crate::frame::types::{
    BlockChecksum, BlockMode, BlockSizeId, ContentChecksum, ErrorCode, FrameInfo, FrameType,
    Preferences, MAGIC_NUMBER, MAGIC_SKIPPABLE_MASK, MAGIC_SKIPPABLE_START, MAX_FH_SIZE,
    MIN_FH_SIZE, MIN_SIZE_TO_KNOW_HEADER_LENGTH, SKIPPABLE_HEADER_SIZE,
};
use crate::xxhash::xxh32_oneshot;

// ─────────────────────────────────────────────────────────────────────────────
// Byte-order helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Read a little-endian `u32` from `src` at byte `offset`.
#[inline]
pub fn read_le32(src: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([src[offset], src[offset + 1], src[offset + 2], src[offset + 3]])
}

/// Append a little-endian `u32` to `dst`.
#[inline]
pub fn write_le32(dst: &mut Vec<u8>, value: u32) {
    dst.extend_from_slice(&value.to_le_bytes());
}

/// Append a little-endian `u64` to `dst`.
#[inline]
pub fn write_le64(dst: &mut Vec<u8>, value: u64) {
    dst.extend_from_slice(&value.to_le_bytes());
}

/// Read a little-endian `u64` from `src` at byte `offset`.
#[inline]
pub fn read_le64(src: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&src[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

// ─────────────────────────────────────────────────────────────────────────────
// Block sizes
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the maximum block size in bytes for a block-size id.
///
/// `BlockSizeId::Default` is treated as `Max64Kb`.
pub fn block_size_for_id(block_size_id: BlockSizeId) -> usize {
    match block_size_id.resolved() {
        BlockSizeId::Max256Kb => 256 * 1024,
        BlockSizeId::Max1Mb => 1024 * 1024,
        BlockSizeId::Max4Mb => 4 * 1024 * 1024,
        BlockSizeId::Max64Kb | BlockSizeId::Default => 64 * 1024,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Header checksum / length
// ─────────────────────────────────────────────────────────────────────────────

/// Single-byte header checksum: `(XXH32(descriptor, 0) >> 8) & 0xFF`.
#[inline]
pub fn header_checksum(descriptor: &[u8]) -> u8 {
    ((xxh32_oneshot(descriptor, 0) >> 8) & 0xFF) as u8
}

/// Total header length implied by the first bytes of a frame.
///
/// Needs at least [`MIN_SIZE_TO_KNOW_HEADER_LENGTH`] bytes. Skippable frames
/// report their 8-byte magic + length prefix.
pub fn header_size(src: &[u8]) -> Result<usize, ErrorCode> {
    if src.len() < MIN_SIZE_TO_KNOW_HEADER_LENGTH {
        return Err(ErrorCode::FrameHeaderIncomplete);
    }
    let magic = read_le32(src, 0);
    if magic & MAGIC_SKIPPABLE_MASK == MAGIC_SKIPPABLE_START {
        return Ok(SKIPPABLE_HEADER_SIZE);
    }
    if magic != MAGIC_NUMBER {
        return Err(ErrorCode::FrameTypeUnknown);
    }
    let flg = src[4];
    let content_size_flag = (flg >> 3) & 0x1 != 0;
    let dict_id_flag = flg & 0x1 != 0;
    Ok(MIN_FH_SIZE
        + if content_size_flag { 8 } else { 0 }
        + if dict_id_flag { 4 } else { 0 })
}

// ─────────────────────────────────────────────────────────────────────────────
// Encode / decode
// ─────────────────────────────────────────────────────────────────────────────

/// Build the frame header for `prefs`.
///
/// `prefs.frame_info.block_size_id` must already be resolved; `Default` is
/// written as `Max64Kb`.
pub fn encode_header(prefs: &Preferences) -> Vec<u8> {
    let fi = &prefs.frame_info;
    let mut out = Vec::with_capacity(MAX_FH_SIZE);
    write_le32(&mut out, MAGIC_NUMBER);

    let flg: u8 = (1u8 << 6)
        | ((fi.block_mode as u8 & 1) << 5)
        | ((fi.block_checksum_flag as u8 & 1) << 4)
        | (u8::from(fi.content_size > 0) << 3)
        | ((fi.content_checksum_flag as u8 & 1) << 2)
        | u8::from(fi.dict_id > 0);
    out.push(flg);
    out.push((fi.block_size_id.resolved() as u8 & 7) << 4);

    if fi.content_size > 0 {
        write_le64(&mut out, fi.content_size);
    }
    if fi.dict_id > 0 {
        write_le32(&mut out, fi.dict_id);
    }

    let hc = header_checksum(&out[4..]);
    out.push(hc);
    out
}

/// Parse a complete standard frame header (`src.len()` == [`header_size`]).
pub fn decode_header(src: &[u8]) -> Result<FrameInfo, ErrorCode> {
    if src.len() < MIN_FH_SIZE {
        return Err(ErrorCode::FrameHeaderIncomplete);
    }
    if read_le32(src, 0) != MAGIC_NUMBER {
        return Err(ErrorCode::FrameTypeUnknown);
    }

    let flg = src[4];
    let version = (flg >> 6) & 0x3;
    let block_independent = (flg >> 5) & 0x1 != 0;
    let block_checksum = (flg >> 4) & 0x1 != 0;
    let content_size_flag = (flg >> 3) & 0x1 != 0;
    let content_checksum = (flg >> 2) & 0x1 != 0;
    let dict_id_flag = flg & 0x1 != 0;
    if (flg >> 1) & 0x1 != 0 {
        return Err(ErrorCode::ReservedFlagSet);
    }
    if version != 1 {
        return Err(ErrorCode::HeaderVersionWrong);
    }

    let fh_size = MIN_FH_SIZE
        + if content_size_flag { 8 } else { 0 }
        + if dict_id_flag { 4 } else { 0 };
    if src.len() < fh_size {
        return Err(ErrorCode::FrameHeaderIncomplete);
    }

    let bd = src[5];
    if bd & 0x80 != 0 || bd & 0x0F != 0 {
        return Err(ErrorCode::ReservedFlagSet);
    }
    let block_size_id = match (bd >> 4) & 0x7 {
        raw @ 4..=7 => BlockSizeId::from_raw(u32::from(raw))?,
        _ => return Err(ErrorCode::MaxBlockSizeInvalid),
    };

    if header_checksum(&src[4..fh_size - 1]) != src[fh_size - 1] {
        return Err(ErrorCode::HeaderChecksumInvalid);
    }

    Ok(FrameInfo {
        block_size_id,
        block_mode: if block_independent { BlockMode::Independent } else { BlockMode::Linked },
        content_checksum_flag: if content_checksum {
            ContentChecksum::Enabled
        } else {
            ContentChecksum::Disabled
        },
        frame_type: FrameType::Frame,
        content_size: if content_size_flag { read_le64(src, 6) } else { 0 },
        dict_id: if dict_id_flag { read_le32(src, fh_size - 5) } else { 0 },
        block_checksum_flag: if block_checksum {
            BlockChecksum::Enabled
        } else {
            BlockChecksum::Disabled
        },
    })
}
