//! Byte representation of a [`DecompressionContext`].
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! magic u32 | version u8 | stage u8
//! has_info u8 [ bsid u8 | mode u8 | content_crc u8 | block_crc u8 | type u8
//!               | content_size u64 | dict_id u32 ]
//! block_want u32 | block_raw u8 | skip_remaining u64 | content_seen u64
//! staging_len u32 | staging | window_len u32 | window
//! ```
//!
//! `unmarshal` also checks that the staged bytes and `block_want` fit the
//! recorded stage, so a restored context never starts in an impossible
//! position.
//!
//! The running content hash is not part of the record: an unmarshalled
//! context decodes normally but never verifies the content checksum.
//! Block checksums are still verified.

use crate::frame::decompress::{DecompressionContext, Stage};
use crate::frame::header::{
    block_size_for_id, header_size, read_le32, read_le64, write_le32, write_le64,
};
use crate::frame::types::{
    BlockChecksum, BlockMode, BlockSizeId, ContentChecksum, ErrorCode, FrameInfo, FrameType,
    BF_SIZE, BH_SIZE, MAX_DICT_SIZE, MIN_SIZE_TO_KNOW_HEADER_LENGTH,
};

const MARSHAL_MAGIC: u32 = 0x4C5A_4644;
const MARSHAL_VERSION: u8 = 1;

impl DecompressionContext {
    /// Serializes the decoding position, header and history window.
    pub fn marshal(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.staging.len() + self.window.len());
        write_le32(&mut out, MARSHAL_MAGIC);
        out.push(MARSHAL_VERSION);
        out.push(self.stage as u8);
        match &self.info {
            None => out.push(0),
            Some(info) => {
                out.push(1);
                out.push(info.block_size_id as u8);
                out.push(info.block_mode as u8);
                out.push(info.content_checksum_flag as u8);
                out.push(info.block_checksum_flag as u8);
                out.push(info.frame_type as u8);
                write_le64(&mut out, info.content_size);
                write_le32(&mut out, info.dict_id);
            }
        }
        // Only meaningful while a block is being assembled.
        let block_want = if self.stage == Stage::BlockData { self.block_want } else { 0 };
        write_le32(&mut out, block_want as u32);
        out.push(u8::from(self.block_raw));
        write_le64(&mut out, self.skip_remaining);
        write_le64(&mut out, self.content_seen);
        write_le32(&mut out, self.staging.len() as u32);
        out.extend_from_slice(&self.staging);
        write_le32(&mut out, self.window.len() as u32);
        out.extend_from_slice(&self.window);
        out
    }

    /// Rebuilds a context from [`marshal`](Self::marshal) output.
    ///
    /// Malformed or truncated records fail with `ParameterInvalid`. The
    /// restored context skips content checksum verification.
    pub fn unmarshal(src: &[u8]) -> Result<Self, ErrorCode> {
        let mut r = Reader { src, pos: 0 };
        if r.u32()? != MARSHAL_MAGIC || r.u8()? != MARSHAL_VERSION {
            return Err(ErrorCode::ParameterInvalid);
        }
        let stage = Stage::from_raw(r.u8()?).ok_or(ErrorCode::ParameterInvalid)?;
        let info = match r.u8()? {
            0 => None,
            1 => Some(FrameInfo {
                block_size_id: BlockSizeId::from_raw(u32::from(r.u8()?))
                    .map_err(|_| ErrorCode::ParameterInvalid)?,
                block_mode: match r.u8()? {
                    0 => BlockMode::Linked,
                    1 => BlockMode::Independent,
                    _ => return Err(ErrorCode::ParameterInvalid),
                },
                content_checksum_flag: match r.u8()? {
                    0 => ContentChecksum::Disabled,
                    1 => ContentChecksum::Enabled,
                    _ => return Err(ErrorCode::ParameterInvalid),
                },
                block_checksum_flag: match r.u8()? {
                    0 => BlockChecksum::Disabled,
                    1 => BlockChecksum::Enabled,
                    _ => return Err(ErrorCode::ParameterInvalid),
                },
                frame_type: match r.u8()? {
                    0 => FrameType::Frame,
                    1 => FrameType::SkippableFrame,
                    _ => return Err(ErrorCode::ParameterInvalid),
                },
                content_size: r.u64()?,
                dict_id: r.u32()?,
            }),
            _ => return Err(ErrorCode::ParameterInvalid),
        };
        let block_want = r.u32()? as usize;
        let block_raw = match r.u8()? {
            0 => false,
            1 => true,
            _ => return Err(ErrorCode::ParameterInvalid),
        };
        let skip_remaining = r.u64()?;
        let content_seen = r.u64()?;
        let staging_len = r.u32()? as usize;
        let staging = r.bytes(staging_len)?.to_vec();
        let window_len = r.u32()? as usize;
        let window = r.bytes(window_len)?.to_vec();
        if r.pos != src.len() {
            return Err(ErrorCode::ParameterInvalid);
        }

        // Cross-field consistency.
        if (stage == Stage::Header) != info.is_none() || window.len() > MAX_DICT_SIZE {
            return Err(ErrorCode::ParameterInvalid);
        }
        if !stage_is_consistent(stage, info.as_ref(), block_want, &staging) {
            return Err(ErrorCode::ParameterInvalid);
        }

        let mut ctx = DecompressionContext::new();
        ctx.stage = stage;
        ctx.info = info;
        ctx.staging = staging;
        ctx.block_want = block_want;
        ctx.block_raw = block_raw;
        ctx.skip_remaining = skip_remaining;
        ctx.window = window;
        ctx.content_seen = content_seen;
        ctx.verify_content = false;
        Ok(ctx)
    }
}

/// Whether `staging` and `block_want` fit the position `stage` describes.
///
/// Every stage except `BlockData` has `block_want == 0`, and the staged bytes
/// never complete the unit the stage is waiting for.
fn stage_is_consistent(
    stage: Stage,
    info: Option<&FrameInfo>,
    block_want: usize,
    staging: &[u8],
) -> bool {
    if stage != Stage::BlockData && block_want != 0 {
        return false;
    }
    match (stage, info) {
        (Stage::Header, _) => {
            staging.len() < MIN_SIZE_TO_KNOW_HEADER_LENGTH
                || header_size(staging).is_ok_and(|target| staging.len() < target)
        }
        (Stage::BlockHeader, _) => staging.len() < BH_SIZE,
        (Stage::BlockData, Some(info)) => {
            let crc = if info.block_checksum_flag == BlockChecksum::Enabled { BF_SIZE } else { 0 };
            block_want >= crc
                && block_want <= block_size_for_id(info.block_size_id) + crc
                && staging.len() < block_want
        }
        (Stage::BlockData, None) => false,
        (Stage::Suffix, _) => staging.len() < BF_SIZE,
        (Stage::SkipSkippable | Stage::Done, _) => staging.is_empty(),
    }
}

struct Reader<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn bytes(&mut self, n: usize) -> Result<&'a [u8], ErrorCode> {
        let end = self.pos.checked_add(n).ok_or(ErrorCode::ParameterInvalid)?;
        let out = self.src.get(self.pos..end).ok_or(ErrorCode::ParameterInvalid)?;
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, ErrorCode> {
        Ok(self.bytes(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, ErrorCode> {
        Ok(read_le32(self.bytes(4)?, 0))
    }

    fn u64(&mut self) -> Result<u64, ErrorCode> {
        Ok(read_le64(self.bytes(8)?, 0))
    }
}
