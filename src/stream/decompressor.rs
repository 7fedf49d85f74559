//! Incremental frame decompression session.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::config::{HEADER_READ_SIZE, INITIAL_CHUNK_SIZE};
use crate::error::{FramedError, Operation};
use crate::frame::{max_block_size, DecompressionContext, ErrorCode, FrameInfo};
use crate::stream::Source;

struct State {
    ctx: DecompressionContext,
    source: Box<dyn Source + Send>,
    info: Option<FrameInfo>,
    data_read: u64,
    next_data_block: u64,
    last_read_aligned: bool,
    last_hint: usize,
    /// First bytes of the stream, up to `HEADER_READ_SIZE`.
    head: Vec<u8>,
    /// Read size requested by the engine; `None` before the first decode.
    pending_hint: Option<usize>,
}

/// Streaming LZ4 frame decompressor pulling from a [`Source`].
///
/// Decoded data comes out of [`iter`](Self::iter). A source that runs dry
/// before the frame is complete yields [`FramedError::NoData`]; attaching a
/// new source with [`attach`](Self::attach) and iterating again continues
/// where decoding stopped.
pub struct Decompressor {
    inner: Mutex<State>,
}

/// One decode step: chunks produced and whether the frame is complete.
struct Step {
    chunks: Vec<Vec<u8>>,
    finished: bool,
}

impl Decompressor {
    pub fn new<S: Source + Send + 'static>(source: S) -> Self {
        Self {
            inner: Mutex::new(State {
                ctx: DecompressionContext::new(),
                source: Box::new(source),
                info: None,
                data_read: 0,
                next_data_block: 0,
                last_read_aligned: false,
                last_hint: 0,
                head: Vec::with_capacity(HEADER_READ_SIZE),
                pending_hint: None,
            }),
        }
    }

    /// Replaces the source, keeping frame info, counters and context.
    pub fn attach<S: Source + Send + 'static>(&self, source: S) {
        self.lock().source = Box::new(source);
    }

    /// Replaces the decompression context, e.g. with a clone or an
    /// unmarshalled copy taken earlier. Counters are left alone; the next
    /// read uses the context's own hint once it has parsed a header.
    pub fn set_context(&self, ctx: DecompressionContext) {
        let mut state = self.lock();
        match ctx.frame_info() {
            Ok(info) => {
                state.info = Some(info);
                state.pending_hint = Some(ctx.next_hint());
            }
            Err(_) => {
                state.info = None;
                state.pending_hint = None;
            }
        }
        state.ctx = ctx;
    }

    /// Starts over: fresh context, no frame info, zeroed counters.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.ctx.reset();
        state.info = None;
        state.data_read = 0;
        state.next_data_block = 0;
        state.last_read_aligned = false;
        state.last_hint = 0;
        state.head.clear();
        state.pending_hint = None;
    }

    /// Lazily decodes the frame. Iterating again after the iterator stopped
    /// continues from the current position.
    pub fn iter(&self) -> Chunks<'_> {
        Chunks { decompressor: self, queue: VecDeque::new(), done: false }
    }

    /// Header of the frame, once a read has completed it.
    pub fn frame_info(&self) -> Option<FrameInfo> {
        self.lock().info
    }

    /// Bytes read from the source(s) so far.
    pub fn data_read(&self) -> u64 {
        self.lock().data_read
    }

    /// Stream offset at which the next data block starts.
    ///
    /// For independent-block frames a reader may seek here and continue with
    /// a context clone; the content checksum no longer matches once data has
    /// been skipped.
    pub fn next_data_block(&self) -> u64 {
        self.lock().next_data_block
    }

    /// `true` if the last read returned exactly the requested number of bytes,
    /// i.e. `data_read` sits on a block boundary.
    pub fn last_read_aligned(&self) -> bool {
        self.lock().last_read_aligned
    }

    /// Size requested by the last read.
    pub fn last_hint(&self) -> usize {
        self.lock().last_hint
    }

    /// The first (up to 15) bytes this session read, available once the
    /// header has been parsed. `None` when the header came with a context
    /// passed to [`set_context`](Self::set_context) rather than from a read.
    pub fn first15(&self) -> Option<Vec<u8>> {
        let state = self.lock();
        match state.info {
            Some(_) if !state.head.is_empty() => Some(state.head.clone()),
            _ => None,
        }
    }

    /// A copy of the current decompression context.
    pub fn context(&self) -> DecompressionContext {
        self.lock().ctx.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One read + decode under the lock.
    fn step(&self) -> Result<Step, FramedError> {
        let mut state = self.lock();
        let hint = state.pending_hint.unwrap_or(HEADER_READ_SIZE);
        if hint == 0 {
            return Ok(Step { chunks: Vec::new(), finished: true });
        }

        let data = state.read(hint)?;
        let chunk_size = state.info.as_ref().map_or(INITIAL_CHUNK_SIZE, max_block_size);
        let output = state
            .ctx
            .update(&data, chunk_size)
            .map_err(|code| FramedError::engine(Operation::Decompress, code))?;

        if state.info.is_none() {
            match state.ctx.frame_info() {
                Ok(info) => {
                    debug!(
                        block_size_id = info.block_size_id as u8,
                        linked = info.is_linked(),
                        content_size = info.content_size,
                        "frame header parsed"
                    );
                    state.info = Some(info);
                }
                Err(ErrorCode::FrameHeaderIncomplete) => {}
                Err(code) => return Err(FramedError::engine(Operation::FrameInfo, code)),
            }
        }

        state.pending_hint = Some(output.next_hint);
        state.next_data_block = state.data_read + output.next_hint as u64;
        trace!(
            read = data.len(),
            chunks = output.chunks.len(),
            next_hint = output.next_hint,
            "decode step"
        );
        Ok(Step { chunks: output.chunks, finished: output.next_hint == 0 })
    }
}

impl State {
    fn read(&mut self, hint: usize) -> Result<Vec<u8>, FramedError> {
        let data = self.source.read_up_to(hint)?;
        self.last_hint = hint;
        self.last_read_aligned = data.len() == hint;
        if data.is_empty() {
            trace!(hint, "source returned no data");
            return Err(FramedError::NoData);
        }
        self.data_read += data.len() as u64;
        if self.head.len() < HEADER_READ_SIZE {
            let take = (HEADER_READ_SIZE - self.head.len()).min(data.len());
            self.head.extend_from_slice(&data[..take]);
        }
        Ok(data)
    }
}

impl<'a> IntoIterator for &'a Decompressor {
    type Item = Result<Vec<u8>, FramedError>;
    type IntoIter = Chunks<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over decoded chunks, created by [`Decompressor::iter`].
///
/// Ends after the frame's last chunk or after the first error.
pub struct Chunks<'a> {
    decompressor: &'a Decompressor,
    queue: VecDeque<Vec<u8>>,
    done: bool,
}

impl Iterator for Chunks<'_> {
    type Item = Result<Vec<u8>, FramedError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chunk) = self.queue.pop_front() {
                return Some(Ok(chunk));
            }
            if self.done {
                return None;
            }
            match self.decompressor.step() {
                Ok(step) => {
                    self.queue.extend(step.chunks);
                    self.done = step.finished;
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

impl std::iter::FusedIterator for Chunks<'_> {}
