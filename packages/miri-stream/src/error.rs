use thiserror::Error;

/// Errors raised by stream setup, lifecycle and direct buffer access.
///
/// Timeouts and overflows are not errors; see [`crate::types::Outcome`].
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Unsupported stream direction: {0} (only RX is supported)")]
    UnsupportedDirection(i32),

    #[error("Invalid channel selection: {0:?}")]
    InvalidChannel(Vec<usize>),

    #[error("Invalid format '{0}', only CF32 is supported")]
    UnsupportedFormat(String),

    #[error("A read buffer is already acquired; release it before acquiring another")]
    HandleOutstanding,

    #[error("Ring must have at least one slot")]
    EmptyRing,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Producer thread panicked")]
    ThreadJoin,
}

pub type StreamResult<T> = std::result::Result<T, StreamError>;
