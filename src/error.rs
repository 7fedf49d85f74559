//! Public error type for compressor and decompressor sessions.

use core::fmt;

use thiserror::Error;

use crate::frame::ErrorCode;

/// The step a session was attempting when an engine error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Begin,
    Update,
    Flush,
    End,
    Decompress,
    FrameInfo,
    Unmarshal,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Begin => "begin",
            Operation::Update => "update",
            Operation::Flush => "flush",
            Operation::End => "end",
            Operation::Decompress => "decompress",
            Operation::FrameInfo => "frame_info",
            Operation::Unmarshal => "unmarshal",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by [`Compressor`](crate::Compressor),
/// [`Decompressor`](crate::Decompressor) and the one-shot helpers.
#[derive(Debug, Error)]
pub enum FramedError {
    /// Nothing to process: an empty `update` buffer, or a source read that
    /// returned zero bytes before the frame was complete.
    #[error("no data")]
    NoData,

    /// Session parameters were rejected before any frame bytes were produced.
    #[error("invalid configuration during {op}: {code}")]
    Configuration { op: Operation, code: ErrorCode },

    /// The engine reported a protocol failure. The session is unusable.
    #[error("{op} failed: {code}")]
    Engine { op: Operation, code: ErrorCode },

    /// Source or sink failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl FramedError {
    /// Engine failure for `op`, classified as `Configuration` when the code
    /// describes rejected parameters.
    pub(crate) fn engine(op: Operation, code: ErrorCode) -> Self {
        if op == Operation::Begin && code.is_configuration() {
            FramedError::Configuration { op, code }
        } else {
            FramedError::Engine { op, code }
        }
    }

    /// `true` for the zero-bytes condition.
    pub fn is_no_data(&self) -> bool {
        matches!(self, FramedError::NoData)
    }

    /// Engine error code, when one is attached.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            FramedError::Configuration { code, .. } | FramedError::Engine { code, .. } => {
                Some(*code)
            }
            _ => None,
        }
    }

    /// Operation that failed, when known.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            FramedError::Configuration { op, .. } | FramedError::Engine { op, .. } => Some(*op),
            _ => None,
        }
    }
}
