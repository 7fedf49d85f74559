// lz4framed — streaming LZ4 frame compression with resumable decoding

pub mod config;
pub mod error;
pub mod frame;
pub mod stream;
pub mod xxhash;

// ── Version constants ─────────────────────────────────────────────────────────
pub const VERSION_STRING: &str = env!("CARGO_PKG_VERSION");
/// LZ4 frame format version this crate reads and writes.
pub const FRAME_FORMAT_VERSION: &str = "1.6.1";

/// Returns the crate version string.
pub fn version_string() -> &'static str {
    VERSION_STRING
}

// ── Top-level re-exports ──────────────────────────────────────────────────────
pub use config::CompressorConfig;
pub use error::{FramedError, Operation};
pub use frame::{
    block_size_for_id, header_size, BlockSizeId, CompressionContext, DecodeOutput,
    DecompressionContext, ErrorCode, FrameInfo,
};
pub use stream::{Chunks, Compressor, Decompressor, Source};

/// Compresses `data` into one complete frame.
pub fn compress(data: &[u8], config: &CompressorConfig) -> Result<Vec<u8>, FramedError> {
    let compressor = Compressor::new(*config)?;
    let mut out = Vec::with_capacity(data.len() / 2 + 64);
    if !data.is_empty() {
        out.extend(compressor.update(data)?.unwrap_or_default());
    }
    out.extend(compressor.end()?.unwrap_or_default());
    Ok(out)
}

/// Decompresses one complete frame.
///
/// A frame that stops short fails with [`FramedError::NoData`]; bytes after
/// the end of the frame are an engine error (`SrcSizeTooLarge`).
pub fn decompress(frame: &[u8]) -> Result<Vec<u8>, FramedError> {
    if frame.is_empty() {
        return Err(FramedError::NoData);
    }
    let mut ctx = DecompressionContext::new();
    let output = ctx
        .update(frame, usize::MAX)
        .map_err(|code| FramedError::engine(Operation::Decompress, code))?;
    if output.next_hint != 0 {
        return Err(FramedError::NoData);
    }
    Ok(output.chunks.concat())
}
