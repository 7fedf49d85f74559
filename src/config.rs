// config.rs — Compile-time constants and the compressor session configuration.
//
// `CompressorConfig` is a plain value type: construct it with `Default`,
// adjust it with the chained setters, and hand it to `Compressor::new`.
// `from_env` layers the LZ4_CLEVEL / LZ4_BLOCKSIZEID environment overrides on
// top of the defaults.

use std::env;

use tracing::warn;

use crate::frame::{
    BlockChecksum, BlockMode, BlockSizeId, ContentChecksum, ErrorCode, FrameInfo, FrameType,
    Preferences, COMPRESSION_MAX, COMPRESSION_MIN,
};

// Default compression level.
// Can be overridden by the LZ4_CLEVEL environment variable via `from_env`.
pub const CLEVEL_DEFAULT: i32 = 0;

// Default block size id (4 = 64 KB blocks).
// Can be overridden by the LZ4_BLOCKSIZEID environment variable via `from_env`.
pub const BLOCKSIZEID_DEFAULT: BlockSizeId = BlockSizeId::Max64Kb;

// Bytes requested for the first read of a decompression session.
// 15 covers magic + FLG + BD + 8-byte content size + header checksum, the
// largest header `Compressor` writes.
pub const HEADER_READ_SIZE: usize = 15;

// Output chunk size used until the frame header has been parsed.
pub const INITIAL_CHUNK_SIZE: usize = 32;

// Environment variable names.
pub const ENV_CLEVEL: &str = "LZ4_CLEVEL";
pub const ENV_BLOCKSIZEID: &str = "LZ4_BLOCKSIZEID";

/// Parameters for one compression session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressorConfig {
    /// Maximum block size; `Default` resolves to 64 KB.
    pub block_size_id: BlockSizeId,
    /// Share history between consecutive blocks.
    pub linked: bool,
    /// Append an XXH32 of the whole content after the end mark.
    pub content_checksum: bool,
    /// Append an XXH32 after every block.
    pub block_checksum: bool,
    /// Emit a block on every `update` rather than buffering to a full block.
    pub autoflush: bool,
    /// Compression level, `COMPRESSION_MIN..=COMPRESSION_MAX`.
    pub level: i32,
    /// Uncompressed size to declare in the header; 0 = undeclared.
    /// When declared, `end` fails unless exactly this many bytes were fed.
    pub content_size: u64,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            block_size_id: BLOCKSIZEID_DEFAULT,
            linked: true,
            content_checksum: false,
            block_checksum: false,
            autoflush: false,
            level: CLEVEL_DEFAULT,
            content_size: 0,
        }
    }
}

impl CompressorConfig {
    /// Defaults overridden by `LZ4_CLEVEL` and `LZ4_BLOCKSIZEID` when set.
    /// Unparseable or out-of-range values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(raw) = env::var(ENV_CLEVEL) {
            match raw.trim().parse::<i32>() {
                Ok(level) if (COMPRESSION_MIN..=COMPRESSION_MAX).contains(&level) => {
                    cfg.level = level;
                }
                _ => warn!(value = %raw, "ignoring invalid {ENV_CLEVEL}"),
            }
        }
        if let Ok(raw) = env::var(ENV_BLOCKSIZEID) {
            match raw.trim().parse::<u32>().map(BlockSizeId::from_raw) {
                Ok(Ok(id)) if id != BlockSizeId::Default => cfg.block_size_id = id,
                _ => warn!(value = %raw, "ignoring invalid {ENV_BLOCKSIZEID}"),
            }
        }
        cfg
    }

    pub fn block_size_id(mut self, id: BlockSizeId) -> Self {
        self.block_size_id = id;
        self
    }

    pub fn linked(mut self, linked: bool) -> Self {
        self.linked = linked;
        self
    }

    pub fn content_checksum(mut self, enabled: bool) -> Self {
        self.content_checksum = enabled;
        self
    }

    pub fn block_checksum(mut self, enabled: bool) -> Self {
        self.block_checksum = enabled;
        self
    }

    pub fn autoflush(mut self, enabled: bool) -> Self {
        self.autoflush = enabled;
        self
    }

    pub fn level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub fn content_size(mut self, size: u64) -> Self {
        self.content_size = size;
        self
    }

    /// Rejects levels outside `COMPRESSION_MIN..=COMPRESSION_MAX`.
    pub fn validate(&self) -> Result<(), ErrorCode> {
        if !(COMPRESSION_MIN..=COMPRESSION_MAX).contains(&self.level) {
            return Err(ErrorCode::CompressionLevelInvalid);
        }
        Ok(())
    }

    /// Engine preferences for this configuration.
    pub fn preferences(&self) -> Preferences {
        Preferences {
            frame_info: FrameInfo {
                block_size_id: self.block_size_id.resolved(),
                block_mode: if self.linked { BlockMode::Linked } else { BlockMode::Independent },
                content_checksum_flag: if self.content_checksum {
                    ContentChecksum::Enabled
                } else {
                    ContentChecksum::Disabled
                },
                frame_type: FrameType::Frame,
                content_size: self.content_size,
                dict_id: 0,
                block_checksum_flag: if self.block_checksum {
                    BlockChecksum::Enabled
                } else {
                    BlockChecksum::Disabled
                },
            },
            compression_level: self.level,
            auto_flush: self.autoflush,
        }
    }
}
