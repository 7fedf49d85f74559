//! Streaming LZ4 frame compression.
//!
//! [`CompressionContext`] drives one frame at a time:
//! - [`begin`](CompressionContext::begin) validates preferences and returns the frame header
//! - [`update`](CompressionContext::update) stages input and emits every full block
//! - [`flush`](CompressionContext::flush) emits whatever is staged as a short block
//! - [`end`](CompressionContext::end) flushes, writes the end mark and the optional content checksum
//!
//! Blocks are compressed with the `lz4_flex` block encoder. In linked mode the
//! last 64 KB of input is passed as the external dictionary of the next block.
//! The encoder has a single (fast) parser, so every accepted level produces
//! the same output; frames remain valid for any decoder.

use core::fmt;

use lz4_flex::block::{compress_into, compress_into_with_dict, get_maximum_output_size};
use tracing::trace;

use crate::frame::header::{block_size_for_id, encode_header, write_le32};
use crate::frame::roll_window;
use crate::frame::types::{
    BlockChecksum, BlockMode, ContentChecksum, ErrorCode, Preferences, BLOCK_UNCOMPRESSED_FLAG,
    BF_SIZE, BH_SIZE, COMPRESSION_MAX, COMPRESSION_MIN,
};
use crate::xxhash::{content_hasher, xxh32_oneshot, Xxh32State, FRAME_CHECKSUM_SEED};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompressStage {
    Idle,
    Started,
}

/// Compression state for one frame at a time.
///
/// A context can be reused: after [`end`](Self::end) it returns to idle and
/// the next [`begin`](Self::begin) starts a fresh frame.
#[derive(Clone)]
pub struct CompressionContext {
    stage: CompressStage,
    prefs: Preferences,
    max_block_size: usize,
    /// Input waiting to fill a block.
    staged: Vec<u8>,
    /// Trailing 64 KB of already-compressed input (linked mode only).
    history: Vec<u8>,
    xxh: Xxh32State,
    total_in: u64,
    scratch: Vec<u8>,
}

impl fmt::Debug for CompressionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressionContext")
            .field("stage", &self.stage)
            .field("prefs", &self.prefs)
            .field("staged", &self.staged.len())
            .field("history", &self.history.len())
            .field("total_in", &self.total_in)
            .finish_non_exhaustive()
    }
}

impl Default for CompressionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionContext {
    pub fn new() -> Self {
        Self {
            stage: CompressStage::Idle,
            prefs: Preferences::default(),
            max_block_size: block_size_for_id(Default::default()),
            staged: Vec::new(),
            history: Vec::new(),
            xxh: content_hasher(),
            total_in: 0,
            scratch: Vec::new(),
        }
    }

    /// Preferences of the frame in progress (or of the last frame).
    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Total uncompressed bytes accepted since `begin`.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Starts a new frame and returns its header bytes.
    ///
    /// Any frame already in progress is abandoned.
    pub fn begin(&mut self, prefs: &Preferences) -> Result<Vec<u8>, ErrorCode> {
        if !(COMPRESSION_MIN..=COMPRESSION_MAX).contains(&prefs.compression_level) {
            return Err(ErrorCode::CompressionLevelInvalid);
        }
        let mut prefs = *prefs;
        prefs.frame_info.block_size_id = prefs.frame_info.block_size_id.resolved();

        self.prefs = prefs;
        self.max_block_size = block_size_for_id(prefs.frame_info.block_size_id);
        self.staged.clear();
        self.staged.reserve(self.max_block_size);
        self.history.clear();
        self.xxh = content_hasher();
        self.total_in = 0;
        self.stage = CompressStage::Started;

        Ok(encode_header(&prefs))
    }

    /// Accepts `src` and returns the blocks it completed (possibly none).
    pub fn update(&mut self, src: &[u8]) -> Result<Vec<u8>, ErrorCode> {
        self.ensure_started()?;
        let block_size = self.max_block_size;
        let mut out = Vec::new();
        let mut pos = 0;

        // Complete a previously staged block first.
        if !self.staged.is_empty() {
            let take = (block_size - self.staged.len()).min(src.len());
            self.staged.extend_from_slice(&src[..take]);
            pos = take;
            if self.staged.len() == block_size {
                let block = std::mem::take(&mut self.staged);
                self.make_block(&block, &mut out)?;
                self.staged = block;
                self.staged.clear();
            }
        }

        while src.len() - pos >= block_size {
            self.make_block(&src[pos..pos + block_size], &mut out)?;
            pos += block_size;
        }

        if pos < src.len() {
            if self.prefs.auto_flush && self.staged.is_empty() {
                self.make_block(&src[pos..], &mut out)?;
            } else {
                self.staged.extend_from_slice(&src[pos..]);
            }
        }

        if self.prefs.frame_info.content_checksum_flag == ContentChecksum::Enabled {
            self.xxh.update(src);
        }
        self.total_in += src.len() as u64;
        Ok(out)
    }

    /// Emits staged input as a (short) block.
    pub fn flush(&mut self) -> Result<Vec<u8>, ErrorCode> {
        self.ensure_started()?;
        let mut out = Vec::new();
        self.flush_into(&mut out)?;
        Ok(out)
    }

    /// Finishes the frame: staged input, end mark and content checksum.
    ///
    /// Fails with `FrameSizeWrong` when the header declared a content size
    /// that differs from the bytes fed. The context is idle afterwards either way.
    pub fn end(&mut self) -> Result<Vec<u8>, ErrorCode> {
        self.ensure_started()?;
        let mut out = Vec::new();
        self.flush_into(&mut out)?;
        write_le32(&mut out, 0);
        if self.prefs.frame_info.content_checksum_flag == ContentChecksum::Enabled {
            write_le32(&mut out, self.xxh.digest());
        }
        self.stage = CompressStage::Idle;

        let declared = self.prefs.frame_info.content_size;
        if declared != 0 && declared != self.total_in {
            return Err(ErrorCode::FrameSizeWrong);
        }
        trace!(total_in = self.total_in, "frame end");
        Ok(out)
    }

    fn ensure_started(&self) -> Result<(), ErrorCode> {
        match self.stage {
            CompressStage::Started => Ok(()),
            CompressStage::Idle => Err(ErrorCode::CompressionStateUninitialized),
        }
    }

    fn flush_into(&mut self, out: &mut Vec<u8>) -> Result<(), ErrorCode> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let block = std::mem::take(&mut self.staged);
        self.make_block(&block, out)?;
        self.staged = block;
        self.staged.clear();
        Ok(())
    }

    /// Appends one block (header, data, optional checksum) for `src` to `out`.
    fn make_block(&mut self, src: &[u8], out: &mut Vec<u8>) -> Result<(), ErrorCode> {
        let linked = self.prefs.frame_info.block_mode == BlockMode::Linked;
        self.scratch.resize(get_maximum_output_size(src.len()), 0);
        let compressed = if linked && !self.history.is_empty() {
            compress_into_with_dict(src, &mut self.scratch, &self.history)
        } else {
            compress_into(src, &mut self.scratch)
        }
        .map_err(|_| ErrorCode::DstMaxSizeTooSmall)?;

        out.reserve(BH_SIZE + src.len() + BF_SIZE);
        let data_start = out.len() + BH_SIZE;
        if compressed == 0 || compressed >= src.len() {
            write_le32(out, src.len() as u32 | BLOCK_UNCOMPRESSED_FLAG);
            out.extend_from_slice(src);
        } else {
            write_le32(out, compressed as u32);
            out.extend_from_slice(&self.scratch[..compressed]);
        }
        trace!(raw = src.len(), stored = out.len() - data_start, "block");

        if self.prefs.frame_info.block_checksum_flag == BlockChecksum::Enabled {
            let crc = xxh32_oneshot(&out[data_start..], FRAME_CHECKSUM_SEED);
            write_le32(out, crc);
        }
        if linked {
            roll_window(&mut self.history, src);
        }
        Ok(())
    }
}
