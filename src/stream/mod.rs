//! Session layer: [`Compressor`] and [`Decompressor`] on top of the frame engine.

pub mod compressor;
pub mod decompressor;

use std::io::{self, Read};

pub use compressor::Compressor;
pub use decompressor::{Chunks, Decompressor};

/// A byte source for [`Decompressor`].
///
/// `read_up_to(max)` returns between 0 and `max` bytes. Fewer than `max`
/// bytes is accepted; zero bytes means the source has nothing more to give.
pub trait Source {
    fn read_up_to(&mut self, max: usize) -> io::Result<Vec<u8>>;
}

/// Any reader is a source: it is read until `max` bytes or end of input.
impl<R: Read> Source for R {
    fn read_up_to(&mut self, max: usize) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(max.min(1 << 22));
        self.by_ref().take(max as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }
}
