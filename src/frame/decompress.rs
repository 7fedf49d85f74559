//! Streaming LZ4 frame decompression.
//!
//! [`DecompressionContext::update`] accepts input of any length, decodes as
//! far as it can, and reports how many bytes the caller should supply next.
//! Hints follow the LZ4F convention: while a block (or the header) is being
//! assembled the hint also covers the following block header, so a caller
//! that obeys it exactly never has to split a read.

use core::fmt;

use lz4_flex::block::{decompress_into, decompress_into_with_dict};
use tracing::{debug, trace};

use crate::frame::header::{
    block_size_for_id, decode_header, header_size, read_le32,
};
use crate::frame::roll_window;
use crate::frame::types::{
    BlockChecksum, BlockMode, BlockSizeId, ContentChecksum, ErrorCode, FrameInfo, FrameType,
    BF_SIZE, BH_SIZE, BLOCK_UNCOMPRESSED_FLAG, MAGIC_SKIPPABLE_MASK, MAGIC_SKIPPABLE_START,
    MIN_FH_SIZE, MIN_SIZE_TO_KNOW_HEADER_LENGTH, SKIPPABLE_HEADER_SIZE,
};
use crate::xxhash::{content_hasher, xxh32_oneshot, Xxh32State, FRAME_CHECKSUM_SEED};

/// Decoder position within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum Stage {
    Header = 0,
    BlockHeader = 1,
    BlockData = 2,
    Suffix = 3,
    SkipSkippable = 4,
    Done = 5,
}

impl Stage {
    pub(super) fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Stage::Header,
            1 => Stage::BlockHeader,
            2 => Stage::BlockData,
            3 => Stage::Suffix,
            4 => Stage::SkipSkippable,
            5 => Stage::Done,
            _ => return None,
        })
    }
}

/// Result of one [`DecompressionContext::update`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeOutput {
    /// Decoded bytes, split into pieces of at most `chunk_size` bytes.
    pub chunks: Vec<Vec<u8>>,
    /// Bytes to supply on the next call; 0 once the frame is complete.
    pub next_hint: usize,
}

/// Decompression state for one frame.
///
/// `Clone` produces an independent context that continues from the same
/// position, content checksum included. See [`marshal`](Self::marshal) for a
/// byte representation.
#[derive(Clone)]
pub struct DecompressionContext {
    pub(super) stage: Stage,
    pub(super) info: Option<FrameInfo>,
    /// Partial header, block header, block data or suffix.
    pub(super) staging: Vec<u8>,
    /// Bytes the current block occupies (data + optional checksum).
    pub(super) block_want: usize,
    pub(super) block_raw: bool,
    pub(super) skip_remaining: u64,
    /// Trailing 64 KB of decoded output (linked frames).
    pub(super) window: Vec<u8>,
    pub(super) content_seen: u64,
    pub(super) xxh: Xxh32State,
    pub(super) verify_content: bool,
    scratch: Vec<u8>,
}

impl fmt::Debug for DecompressionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecompressionContext")
            .field("stage", &self.stage)
            .field("info", &self.info)
            .field("staging", &self.staging.len())
            .field("content_seen", &self.content_seen)
            .field("verify_content", &self.verify_content)
            .finish_non_exhaustive()
    }
}

impl Default for DecompressionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DecompressionContext {
    pub fn new() -> Self {
        Self {
            stage: Stage::Header,
            info: None,
            staging: Vec::new(),
            block_want: 0,
            block_raw: false,
            skip_remaining: 0,
            window: Vec::new(),
            content_seen: 0,
            xxh: content_hasher(),
            verify_content: true,
            scratch: Vec::new(),
        }
    }

    /// Forgets the current frame; the next `update` expects a frame header.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Parsed header of the current frame.
    ///
    /// Fails with `FrameHeaderIncomplete` until the whole header has been fed.
    pub fn frame_info(&self) -> Result<FrameInfo, ErrorCode> {
        self.info.ok_or(ErrorCode::FrameHeaderIncomplete)
    }

    /// `true` once the end mark (and any content checksum) has been consumed.
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Whether the content checksum will be verified at the end of the frame.
    pub fn verifies_content(&self) -> bool {
        self.verify_content
    }

    /// Uncompressed bytes produced so far for the current frame.
    pub fn content_seen(&self) -> u64 {
        self.content_seen
    }

    /// Feeds `src`, returning the decoded output and the next read hint.
    ///
    /// Input past the end of the frame is rejected with `SrcSizeTooLarge`.
    pub fn update(&mut self, src: &[u8], chunk_size: usize) -> Result<DecodeOutput, ErrorCode> {
        let mut pos = 0usize;
        let mut out = Vec::new();

        loop {
            match self.stage {
                Stage::Header => {
                    let target = self.header_target()?;
                    if self.staging.len() < target {
                        pos += fill(&mut self.staging, &src[pos..], target);
                        if self.staging.len() < target {
                            break;
                        }
                        continue;
                    }
                    self.start_frame()?;
                }

                Stage::BlockHeader => {
                    pos += fill(&mut self.staging, &src[pos..], BH_SIZE);
                    if self.staging.len() < BH_SIZE {
                        break;
                    }
                    let raw = read_le32(&self.staging, 0);
                    self.staging.clear();
                    self.begin_block(raw)?;
                }

                Stage::BlockData => {
                    pos += fill(&mut self.staging, &src[pos..], self.block_want);
                    if self.staging.len() < self.block_want {
                        break;
                    }
                    self.finish_block(&mut out)?;
                }

                Stage::Suffix => {
                    pos += fill(&mut self.staging, &src[pos..], BF_SIZE);
                    if self.staging.len() < BF_SIZE {
                        break;
                    }
                    let stored = read_le32(&self.staging, 0);
                    self.staging.clear();
                    if self.verify_content && stored != self.xxh.digest() {
                        return Err(ErrorCode::ContentChecksumInvalid);
                    }
                    debug!(content = self.content_seen, "frame complete");
                    self.stage = Stage::Done;
                }

                Stage::SkipSkippable => {
                    let avail = (src.len() - pos) as u64;
                    let n = avail.min(self.skip_remaining);
                    pos += n as usize;
                    self.skip_remaining -= n;
                    if self.skip_remaining > 0 {
                        break;
                    }
                    debug!("skippable frame consumed");
                    self.stage = Stage::Done;
                }

                Stage::Done => {
                    if pos < src.len() {
                        return Err(ErrorCode::SrcSizeTooLarge);
                    }
                    break;
                }
            }
        }

        let chunk_size = chunk_size.max(1);
        Ok(DecodeOutput {
            chunks: out.chunks(chunk_size).map(<[u8]>::to_vec).collect(),
            next_hint: self.next_hint(),
        })
    }

    /// Bytes to supply next; 0 when the frame is complete.
    pub fn next_hint(&self) -> usize {
        match self.stage {
            Stage::Header => {
                let target = self.header_target().unwrap_or(MIN_FH_SIZE);
                target.saturating_sub(self.staging.len()) + BH_SIZE
            }
            Stage::BlockHeader => BH_SIZE - self.staging.len(),
            Stage::BlockData => self.block_want - self.staging.len() + BH_SIZE,
            Stage::Suffix => BF_SIZE - self.staging.len(),
            Stage::SkipSkippable => usize::try_from(self.skip_remaining).unwrap_or(usize::MAX),
            Stage::Done => 0,
        }
    }

    /// Header length to accumulate; provisional until five bytes are known.
    fn header_target(&self) -> Result<usize, ErrorCode> {
        if self.staging.len() < MIN_SIZE_TO_KNOW_HEADER_LENGTH {
            Ok(MIN_FH_SIZE)
        } else {
            header_size(&self.staging)
        }
    }

    fn start_frame(&mut self) -> Result<(), ErrorCode> {
        let magic = read_le32(&self.staging, 0);
        if magic & MAGIC_SKIPPABLE_MASK == MAGIC_SKIPPABLE_START {
            let len = read_le32(&self.staging, SKIPPABLE_HEADER_SIZE - 4);
            self.info = Some(FrameInfo {
                frame_type: FrameType::SkippableFrame,
                content_size: u64::from(len),
                ..FrameInfo::default()
            });
            self.skip_remaining = u64::from(len);
            self.staging.clear();
            debug!(len, "skippable frame header");
            self.stage = if len == 0 { Stage::Done } else { Stage::SkipSkippable };
            return Ok(());
        }

        let info = decode_header(&self.staging)?;
        debug!(
            block_size_id = info.block_size_id as u8,
            linked = info.is_linked(),
            content_checksum = info.content_checksum_flag == ContentChecksum::Enabled,
            content_size = info.content_size,
            "frame header"
        );
        self.info = Some(info);
        self.staging.clear();
        self.window.clear();
        self.content_seen = 0;
        self.xxh = content_hasher();
        self.stage = Stage::BlockHeader;
        Ok(())
    }

    fn begin_block(&mut self, raw: u32) -> Result<(), ErrorCode> {
        let info = self.frame_info()?;
        if raw == 0 {
            if let Some(declared) = info.declared_content_size() {
                if declared != self.content_seen {
                    return Err(ErrorCode::FrameSizeWrong);
                }
            }
            if info.content_checksum_flag == ContentChecksum::Enabled {
                self.stage = Stage::Suffix;
            } else {
                debug!(content = self.content_seen, "frame complete");
                self.stage = Stage::Done;
            }
            return Ok(());
        }

        let size = (raw & !BLOCK_UNCOMPRESSED_FLAG) as usize;
        if size > block_size_for_id(info.block_size_id) {
            return Err(ErrorCode::MaxBlockSizeInvalid);
        }
        self.block_raw = raw & BLOCK_UNCOMPRESSED_FLAG != 0;
        self.block_want = size
            + if info.block_checksum_flag == BlockChecksum::Enabled { BF_SIZE } else { 0 };
        self.stage = Stage::BlockData;
        Ok(())
    }

    fn finish_block(&mut self, out: &mut Vec<u8>) -> Result<(), ErrorCode> {
        let info = self.frame_info()?;
        let has_crc = info.block_checksum_flag == BlockChecksum::Enabled;
        let data_len = self.block_want - if has_crc { BF_SIZE } else { 0 };
        let data = &self.staging[..data_len];

        if has_crc && read_le32(&self.staging, data_len) != xxh32_oneshot(data, FRAME_CHECKSUM_SEED) {
            return Err(ErrorCode::BlockChecksumInvalid);
        }

        let decoded: &[u8] = if self.block_raw {
            data
        } else {
            self.scratch.resize(block_size_for_id(info.block_size_id), 0);
            let n = if info.block_mode == BlockMode::Linked && !self.window.is_empty() {
                decompress_into_with_dict(data, &mut self.scratch, &self.window)
            } else {
                decompress_into(data, &mut self.scratch)
            }
            .map_err(|_| ErrorCode::DecompressionFailed)?;
            &self.scratch[..n]
        };
        trace!(stored = data_len, decoded = decoded.len(), raw = self.block_raw, "block");

        self.content_seen += decoded.len() as u64;
        if let Some(declared) = info.declared_content_size() {
            if self.content_seen > declared {
                return Err(ErrorCode::FrameSizeWrong);
            }
        }
        if self.verify_content && info.content_checksum_flag == ContentChecksum::Enabled {
            self.xxh.update(decoded);
        }
        if info.block_mode == BlockMode::Linked {
            roll_window(&mut self.window, decoded);
        }
        out.extend_from_slice(decoded);

        self.staging.clear();
        self.stage = Stage::BlockHeader;
        Ok(())
    }
}

/// Moves bytes from `src` into `buf` until it holds `target` bytes.
/// Returns the number of bytes taken.
fn fill(buf: &mut Vec<u8>, src: &[u8], target: usize) -> usize {
    let take = target.saturating_sub(buf.len()).min(src.len());
    buf.extend_from_slice(&src[..take]);
    take
}

/// Block size for `info`, for callers sizing output buffers.
pub fn max_block_size(info: &FrameInfo) -> usize {
    match info.frame_type {
        FrameType::Frame => block_size_for_id(info.block_size_id),
        FrameType::SkippableFrame => block_size_for_id(BlockSizeId::Default),
    }
}
