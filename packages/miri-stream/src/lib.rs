//! Receive streaming core for Mirics USB SDR receivers.
//!
//! A transport callback pushes raw bursts into a fixed ring of slots
//! ([`RingBuffer`]); the caller pulls caller-sized chunks of normalized
//! CF32 samples out through a [`StreamReader`]. [`RxStream`] ties both to
//! a [`ByteTransport`] and a producer thread.

pub mod config;
pub mod convert;
pub mod error;
pub mod reader;
pub mod ring;
pub mod stream;
pub mod transport;
pub mod types;

pub use config::{ArgInfo, ArgType, StreamConfig};
pub use error::{StreamError, StreamResult};
pub use reader::StreamReader;
pub use ring::{Acquired, RingBuffer, RingMetrics, SlotHandle};
pub use stream::{RxStream, StopHandle};
pub use transport::{ByteTransport, SyntheticTransport};
pub use types::{Outcome, ReadChunk, StreamState, StreamStats};
