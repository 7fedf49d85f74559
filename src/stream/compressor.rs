//! Incremental frame compression session.

use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::config::CompressorConfig;
use crate::error::{FramedError, Operation};
use crate::frame::{CompressionContext, ErrorCode};

/// Header delivery state. Moves forward only.
#[derive(Debug)]
enum Mode {
    /// Header produced by `begin`, not yet handed out.
    AwaitingHeaderFlush { header: Vec<u8> },
    SteadyState,
    /// `end` has run; the session accepts nothing more.
    Finished,
}

#[derive(Debug)]
struct Session<W> {
    ctx: CompressionContext,
    sink: Option<W>,
    mode: Mode,
}

/// Streaming LZ4 frame compressor.
///
/// Without a sink, each call returns the bytes it produced. With a sink, the
/// bytes are written to it and calls return `None`. Either way the frame
/// header comes out exactly once, in front of the first output.
///
/// ```
/// use lz4framed::{Compressor, CompressorConfig};
///
/// let c = Compressor::new(CompressorConfig::default())?;
/// let mut frame = c.update(b"hello world")?.unwrap_or_default();
/// frame.extend(c.end()?.unwrap_or_default());
/// assert_eq!(lz4framed::decompress(&frame)?, b"hello world");
/// # Ok::<(), lz4framed::FramedError>(())
/// ```
#[derive(Debug)]
pub struct Compressor<W: Write = Vec<u8>> {
    config: CompressorConfig,
    inner: Mutex<Session<W>>,
}

impl Compressor {
    /// Session that returns its output from each call.
    pub fn new(config: CompressorConfig) -> Result<Self, FramedError> {
        Self::start(config, None)
    }
}

impl<W: Write> Compressor<W> {
    /// Session that writes its output to `sink`.
    pub fn with_sink(config: CompressorConfig, sink: W) -> Result<Self, FramedError> {
        Self::start(config, Some(sink))
    }

    fn start(config: CompressorConfig, sink: Option<W>) -> Result<Self, FramedError> {
        config
            .validate()
            .map_err(|code| FramedError::Configuration { op: Operation::Begin, code })?;
        let mut ctx = CompressionContext::new();
        let header = ctx
            .begin(&config.preferences())
            .map_err(|code| FramedError::engine(Operation::Begin, code))?;
        debug!(
            block_size_id = config.block_size_id.resolved() as u8,
            linked = config.linked,
            content_checksum = config.content_checksum,
            level = config.level,
            sink = sink.is_some(),
            "compressor started"
        );
        Ok(Self {
            config,
            inner: Mutex::new(Session { ctx, sink, mode: Mode::AwaitingHeaderFlush { header } }),
        })
    }

    /// Runs `body` against a sink-bound session and finalizes the frame if
    /// `body` succeeds. On error the frame is left unterminated and the sink
    /// is dropped.
    pub fn scoped<T, E, F>(config: CompressorConfig, sink: W, body: F) -> Result<(T, W), E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<FramedError>,
    {
        let compressor = Self::with_sink(config, sink)?;
        let value = body(&compressor)?;
        compressor.end()?;
        let sink = compressor.into_sink().ok_or(FramedError::Engine {
            op: Operation::End,
            code: ErrorCode::ParameterNull,
        })?;
        Ok((value, sink))
    }

    /// Session configuration.
    pub fn config(&self) -> &CompressorConfig {
        &self.config
    }

    /// `true` once `end` has been called.
    pub fn is_finished(&self) -> bool {
        matches!(self.lock().mode, Mode::Finished)
    }

    /// Compresses `buf`. Output may be empty while the engine buffers a block.
    ///
    /// An empty `buf` fails with [`FramedError::NoData`] and leaves the
    /// session untouched.
    pub fn update(&self, buf: &[u8]) -> Result<Option<Vec<u8>>, FramedError> {
        if buf.is_empty() {
            return Err(FramedError::NoData);
        }
        let mut session = self.lock();
        session.ensure_open(Operation::Update)?;
        let payload = session
            .ctx
            .update(buf)
            .map_err(|code| FramedError::engine(Operation::Update, code))?;
        session.deliver(payload)
    }

    /// Emits any buffered input as a block.
    pub fn flush(&self) -> Result<Option<Vec<u8>>, FramedError> {
        let mut session = self.lock();
        session.ensure_open(Operation::Flush)?;
        let payload = session
            .ctx
            .flush()
            .map_err(|code| FramedError::engine(Operation::Flush, code))?;
        session.deliver(payload)
    }

    /// Finalizes the frame. The header is emitted first if nothing has been
    /// delivered yet, so ending an untouched session yields a valid empty frame.
    pub fn end(&self) -> Result<Option<Vec<u8>>, FramedError> {
        let mut session = self.lock();
        session.ensure_open(Operation::End)?;
        let result = session.ctx.end();
        let total_in = session.ctx.total_in();
        let previous = std::mem::replace(&mut session.mode, Mode::Finished);
        let trailer = result.map_err(|code| FramedError::engine(Operation::End, code))?;
        debug!(total_in, "compressor finished");

        let bytes = match previous {
            Mode::AwaitingHeaderFlush { mut header } => {
                header.extend_from_slice(&trailer);
                header
            }
            _ => trailer,
        };
        session.emit(bytes)
    }

    /// Gives back the sink, if the session has one.
    pub fn into_sink(self) -> Option<W> {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner).sink
    }

    fn lock(&self) -> MutexGuard<'_, Session<W>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write> Session<W> {
    fn ensure_open(&self, op: Operation) -> Result<(), FramedError> {
        match self.mode {
            Mode::Finished => Err(FramedError::Engine {
                op,
                code: ErrorCode::CompressionStateUninitialized,
            }),
            _ => Ok(()),
        }
    }

    /// Hands `payload` out, prefixed by the header on the first delivery.
    fn deliver(&mut self, payload: Vec<u8>) -> Result<Option<Vec<u8>>, FramedError> {
        let bytes = match &self.mode {
            Mode::AwaitingHeaderFlush { header } => {
                let mut bytes = Vec::with_capacity(header.len() + payload.len());
                bytes.extend_from_slice(header);
                bytes.extend_from_slice(&payload);
                bytes
            }
            _ => payload,
        };
        let out = self.emit(bytes)?;
        if matches!(self.mode, Mode::AwaitingHeaderFlush { .. }) {
            self.mode = Mode::SteadyState;
        }
        Ok(out)
    }

    fn emit(&mut self, bytes: Vec<u8>) -> Result<Option<Vec<u8>>, FramedError> {
        match self.sink.as_mut() {
            Some(sink) => {
                sink.write_all(&bytes)?;
                Ok(None)
            }
            None => Ok(Some(bytes)),
        }
    }
}
