//! LZ4 frame types, constants, and engine error codes.
//!
//! Covers:
//! - Frame format constants (magic numbers, `BH_SIZE`, `BF_SIZE`, header bounds)
//! - Frame parameter enums: `BlockSizeId`, `BlockMode`, `ContentChecksum`,
//!   `BlockChecksum`, `FrameType`
//! - `FrameInfo` / `Preferences` structs
//! - `ErrorCode`: the closed set of engine error codes plus an `Other` fallback

use core::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Frame format constants
// ─────────────────────────────────────────────────────────────────────────────

/// Magic number opening every LZ4 frame.
pub const MAGIC_NUMBER: u32 = 0x184D_2204;

/// First of the sixteen skippable-frame magic numbers (`0x184D2A50..=0x184D2A5F`).
pub const MAGIC_SKIPPABLE_START: u32 = 0x184D_2A50;

/// Mask selecting the skippable-frame magic family.
pub const MAGIC_SKIPPABLE_MASK: u32 = 0xFFFF_FFF0;

/// High bit of a block header: the block data is stored uncompressed.
pub const BLOCK_UNCOMPRESSED_FLAG: u32 = 0x8000_0000;

/// Block header size in bytes (block data length + stored-raw flag).
pub const BH_SIZE: usize = 4;

/// Block footer (checksum) size in bytes, present when block checksums are enabled.
pub const BF_SIZE: usize = 4;

/// Minimum frame header size: magic + FLG + BD + header checksum.
pub const MIN_FH_SIZE: usize = 7;

/// Maximum frame header size: adds an 8-byte content size and a 4-byte dict id.
pub const MAX_FH_SIZE: usize = 19;

/// Number of bytes needed before the full header length can be computed.
pub const MIN_SIZE_TO_KNOW_HEADER_LENGTH: usize = 5;

/// Size of a skippable frame header (magic + LE32 payload length).
pub const SKIPPABLE_HEADER_SIZE: usize = 8;

/// History window shared between linked blocks.
pub const MAX_DICT_SIZE: usize = 64 * 1024;

/// Lowest accepted compression level.
pub const COMPRESSION_MIN: i32 = 0;

/// First level that selects the high-compression parser in reference encoders.
pub const COMPRESSION_MIN_HC: i32 = 3;

/// Highest accepted compression level.
pub const COMPRESSION_MAX: i32 = 12;

// ─────────────────────────────────────────────────────────────────────────────
// Frame parameter enums
// ─────────────────────────────────────────────────────────────────────────────

/// Block size identifier determining the maximum uncompressed size of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum BlockSizeId {
    /// Resolves to `Max64Kb` when a frame is started.
    #[default]
    Default = 0,
    Max64Kb = 4,
    Max256Kb = 5,
    Max1Mb = 6,
    Max4Mb = 7,
}

impl BlockSizeId {
    /// Every id that can appear in a frame header, smallest first.
    pub const ALL: [BlockSizeId; 4] = [
        BlockSizeId::Max64Kb,
        BlockSizeId::Max256Kb,
        BlockSizeId::Max1Mb,
        BlockSizeId::Max4Mb,
    ];

    /// Converts a raw id (0 or 4–7) into a `BlockSizeId`.
    pub fn from_raw(raw: u32) -> Result<Self, ErrorCode> {
        match raw {
            0 => Ok(BlockSizeId::Default),
            4 => Ok(BlockSizeId::Max64Kb),
            5 => Ok(BlockSizeId::Max256Kb),
            6 => Ok(BlockSizeId::Max1Mb),
            7 => Ok(BlockSizeId::Max4Mb),
            _ => Err(ErrorCode::MaxBlockSizeInvalid),
        }
    }

    /// `Default` is written to headers as `Max64Kb`.
    #[inline]
    pub fn resolved(self) -> Self {
        match self {
            BlockSizeId::Default => BlockSizeId::Max64Kb,
            other => other,
        }
    }
}

impl TryFrom<u32> for BlockSizeId {
    type Error = ErrorCode;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}

/// Block linking mode: linked blocks share history, independent blocks do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum BlockMode {
    /// Blocks may reference the previous 64 KB of data (better ratio).
    #[default]
    Linked = 0,
    /// Each block decodes on its own; required for seeking to a block boundary.
    Independent = 1,
}

/// Whether a 32-bit content checksum (XXH32) follows the end mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum ContentChecksum {
    #[default]
    Disabled = 0,
    Enabled = 1,
}

/// Whether a 32-bit checksum follows each block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum BlockChecksum {
    #[default]
    Disabled = 0,
    Enabled = 1,
}

/// Frame type: standard LZ4 frame or skippable frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum FrameType {
    #[default]
    Frame = 0,
    SkippableFrame = 1,
}

// ─────────────────────────────────────────────────────────────────────────────
// FrameInfo and Preferences
// ─────────────────────────────────────────────────────────────────────────────

/// Frame header parameters, as written by the compressor or parsed by the decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FrameInfo {
    /// Maximum block size id.
    pub block_size_id: BlockSizeId,
    /// Linked or independent blocks.
    pub block_mode: BlockMode,
    /// Whether a content checksum is present at the end of the frame.
    pub content_checksum_flag: ContentChecksum,
    /// Read-only: standard or skippable frame.
    pub frame_type: FrameType,
    /// Uncompressed content size in bytes; 0 = not declared.
    /// For skippable frames this holds the payload length.
    pub content_size: u64,
    /// Dictionary id hint; 0 = none.
    pub dict_id: u32,
    /// Whether a checksum follows each block.
    pub block_checksum_flag: BlockChecksum,
}

impl FrameInfo {
    /// `true` for linked-block frames.
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.block_mode == BlockMode::Linked
    }

    /// Declared content size, if the header carried one.
    #[inline]
    pub fn declared_content_size(&self) -> Option<u64> {
        (self.content_size != 0).then_some(self.content_size)
    }
}

/// Parameters handed to [`CompressionContext::begin`](crate::frame::CompressionContext::begin).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Preferences {
    /// Frame metadata fields.
    pub frame_info: FrameInfo,
    /// Compression level in `COMPRESSION_MIN..=COMPRESSION_MAX`.
    pub compression_level: i32,
    /// Emit a block on every update instead of waiting for a full block.
    pub auto_flush: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine error codes
// ─────────────────────────────────────────────────────────────────────────────

/// Engine error codes.
///
/// Indices and names follow the LZ4F error table so codes can be compared
/// with those reported by other LZ4 frame implementations. Codes this crate
/// does not know are carried verbatim in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Generic,
    MaxBlockSizeInvalid,
    BlockModeInvalid,
    ParameterInvalid,
    CompressionLevelInvalid,
    HeaderVersionWrong,
    BlockChecksumInvalid,
    ReservedFlagSet,
    AllocationFailed,
    SrcSizeTooLarge,
    DstMaxSizeTooSmall,
    FrameHeaderIncomplete,
    FrameTypeUnknown,
    FrameSizeWrong,
    SrcPtrWrong,
    DecompressionFailed,
    HeaderChecksumInvalid,
    ContentChecksumInvalid,
    FrameDecodingAlreadyStarted,
    CompressionStateUninitialized,
    ParameterNull,
    IoWrite,
    IoRead,
    /// A code outside the known table.
    Other(usize),
}

impl ErrorCode {
    /// Position of this code in the LZ4F error table (`Generic` = 1).
    pub fn index(&self) -> usize {
        match self {
            ErrorCode::Generic => 1,
            ErrorCode::MaxBlockSizeInvalid => 2,
            ErrorCode::BlockModeInvalid => 3,
            ErrorCode::ParameterInvalid => 4,
            ErrorCode::CompressionLevelInvalid => 5,
            ErrorCode::HeaderVersionWrong => 6,
            ErrorCode::BlockChecksumInvalid => 7,
            ErrorCode::ReservedFlagSet => 8,
            ErrorCode::AllocationFailed => 9,
            ErrorCode::SrcSizeTooLarge => 10,
            ErrorCode::DstMaxSizeTooSmall => 11,
            ErrorCode::FrameHeaderIncomplete => 12,
            ErrorCode::FrameTypeUnknown => 13,
            ErrorCode::FrameSizeWrong => 14,
            ErrorCode::SrcPtrWrong => 15,
            ErrorCode::DecompressionFailed => 16,
            ErrorCode::HeaderChecksumInvalid => 17,
            ErrorCode::ContentChecksumInvalid => 18,
            ErrorCode::FrameDecodingAlreadyStarted => 19,
            ErrorCode::CompressionStateUninitialized => 20,
            ErrorCode::ParameterNull => 21,
            ErrorCode::IoWrite => 22,
            ErrorCode::IoRead => 23,
            ErrorCode::Other(raw) => *raw,
        }
    }

    /// Maps a table index back to a code; unknown indices become `Other`.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            1 => ErrorCode::Generic,
            2 => ErrorCode::MaxBlockSizeInvalid,
            3 => ErrorCode::BlockModeInvalid,
            4 => ErrorCode::ParameterInvalid,
            5 => ErrorCode::CompressionLevelInvalid,
            6 => ErrorCode::HeaderVersionWrong,
            7 => ErrorCode::BlockChecksumInvalid,
            8 => ErrorCode::ReservedFlagSet,
            9 => ErrorCode::AllocationFailed,
            10 => ErrorCode::SrcSizeTooLarge,
            11 => ErrorCode::DstMaxSizeTooSmall,
            12 => ErrorCode::FrameHeaderIncomplete,
            13 => ErrorCode::FrameTypeUnknown,
            14 => ErrorCode::FrameSizeWrong,
            15 => ErrorCode::SrcPtrWrong,
            16 => ErrorCode::DecompressionFailed,
            17 => ErrorCode::HeaderChecksumInvalid,
            18 => ErrorCode::ContentChecksumInvalid,
            19 => ErrorCode::FrameDecodingAlreadyStarted,
            20 => ErrorCode::CompressionStateUninitialized,
            21 => ErrorCode::ParameterNull,
            22 => ErrorCode::IoWrite,
            23 => ErrorCode::IoRead,
            other => ErrorCode::Other(other),
        }
    }

    /// LZ4F-style name, e.g. `ERROR_frameHeader_incomplete`.
    pub fn error_name(&self) -> &'static str {
        match self {
            ErrorCode::Generic => "ERROR_GENERIC",
            ErrorCode::MaxBlockSizeInvalid => "ERROR_maxBlockSize_invalid",
            ErrorCode::BlockModeInvalid => "ERROR_blockMode_invalid",
            ErrorCode::ParameterInvalid => "ERROR_parameter_invalid",
            ErrorCode::CompressionLevelInvalid => "ERROR_compressionLevel_invalid",
            ErrorCode::HeaderVersionWrong => "ERROR_headerVersion_wrong",
            ErrorCode::BlockChecksumInvalid => "ERROR_blockChecksum_invalid",
            ErrorCode::ReservedFlagSet => "ERROR_reservedFlag_set",
            ErrorCode::AllocationFailed => "ERROR_allocation_failed",
            ErrorCode::SrcSizeTooLarge => "ERROR_srcSize_tooLarge",
            ErrorCode::DstMaxSizeTooSmall => "ERROR_dstMaxSize_tooSmall",
            ErrorCode::FrameHeaderIncomplete => "ERROR_frameHeader_incomplete",
            ErrorCode::FrameTypeUnknown => "ERROR_frameType_unknown",
            ErrorCode::FrameSizeWrong => "ERROR_frameSize_wrong",
            ErrorCode::SrcPtrWrong => "ERROR_srcPtr_wrong",
            ErrorCode::DecompressionFailed => "ERROR_decompressionFailed",
            ErrorCode::HeaderChecksumInvalid => "ERROR_headerChecksum_invalid",
            ErrorCode::ContentChecksumInvalid => "ERROR_contentChecksum_invalid",
            ErrorCode::FrameDecodingAlreadyStarted => "ERROR_frameDecoding_alreadyStarted",
            ErrorCode::CompressionStateUninitialized => "ERROR_compressionState_uninitialized",
            ErrorCode::ParameterNull => "ERROR_parameter_null",
            ErrorCode::IoWrite => "ERROR_io_write",
            ErrorCode::IoRead => "ERROR_io_read",
            ErrorCode::Other(_) => "ERROR_unknown",
        }
    }

    /// `true` for codes produced by rejected session parameters.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ErrorCode::MaxBlockSizeInvalid
                | ErrorCode::BlockModeInvalid
                | ErrorCode::ParameterInvalid
                | ErrorCode::CompressionLevelInvalid
                | ErrorCode::HeaderVersionWrong
                | ErrorCode::BlockChecksumInvalid
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Other(raw) => write!(f, "{} ({raw})", self.error_name()),
            known => f.write_str(known.error_name()),
        }
    }
}

impl std::error::Error for ErrorCode {}
