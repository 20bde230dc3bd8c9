// Common types for the receive stream
//
// Outcome values for the consumer path, stream lifecycle state and the
// counters exported through `RxStream::stats`.

use serde::{Deserialize, Serialize};

/// Plugin-API status code for a read that timed out.
pub const STATUS_TIMEOUT: i32 = -1;

/// Plugin-API status code for a read that observed an overflow.
pub const STATUS_OVERFLOW: i32 = -4;

/// Stream direction code for receive streams.
pub const DIRECTION_RX: i32 = 1;

/// Stream direction code for transmit streams (rejected at setup).
pub const DIRECTION_TX: i32 = 0;

/// Result of a consumer-side operation.
///
/// `Timeout` and `Overflow` are ordinary outcomes the caller is expected
/// to branch on, so they are kept out of [`crate::StreamError`].
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Data was available.
    Ready(T),

    /// No data arrived within the caller's timeout.
    Timeout,

    /// The producer outran the consumer and bursts were dropped.
    /// Queued data has been discarded.
    Overflow,
}

impl<T> Outcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Outcome::Ready(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Outcome::Timeout)
    }

    pub fn is_overflow(&self) -> bool {
        matches!(self, Outcome::Overflow)
    }

    /// Extract the ready value, if any.
    pub fn ready(self) -> Option<T> {
        match self {
            Outcome::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Ready(value) => Outcome::Ready(f(value)),
            Outcome::Timeout => Outcome::Timeout,
            Outcome::Overflow => Outcome::Overflow,
        }
    }
}

impl Outcome<ReadChunk> {
    /// Integer status in the plugin-API convention: element count on
    /// success, a negative code otherwise.
    pub fn status_code(&self) -> i32 {
        match self {
            Outcome::Ready(chunk) => i32::try_from(chunk.elements).unwrap_or(i32::MAX),
            Outcome::Timeout => STATUS_TIMEOUT,
            Outcome::Overflow => STATUS_OVERFLOW,
        }
    }
}

/// Result of a successful [`crate::StreamReader::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadChunk {
    /// Number of I/Q pairs written to the destination.
    pub elements: usize,

    /// The held slot still has unconsumed elements.
    pub more_fragments: bool,
}

/// Lifecycle state of a receive stream
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StreamState {
    /// Set up but the producer is not running
    #[default]
    Idle,

    /// Producer thread is running
    Active,
}

/// Counters for monitoring a stream
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamStats {
    pub bursts_produced: u64,
    pub bursts_dropped: u64,
    pub overflow_events: u64,
    pub bytes_produced: u64,
    pub slots_in_use: usize,
    pub peak_slots_in_use: usize,
    pub capacity: usize,
    pub reads: u64,
    pub elements_delivered: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let ready = Outcome::Ready(ReadChunk {
            elements: 12,
            more_fragments: false,
        });
        assert_eq!(ready.status_code(), 12);
        assert_eq!(Outcome::<ReadChunk>::Timeout.status_code(), STATUS_TIMEOUT);
        assert_eq!(Outcome::<ReadChunk>::Overflow.status_code(), STATUS_OVERFLOW);
    }

    #[test]
    fn test_status_code_saturates_large_counts() {
        let huge = Outcome::Ready(ReadChunk {
            elements: 1 << 31,
            more_fragments: false,
        });
        assert_eq!(huge.status_code(), i32::MAX);
    }

    #[test]
    fn test_outcome_map_keeps_conditions() {
        assert_eq!(Outcome::Ready(2).map(|v| v * 2), Outcome::Ready(4));
        assert!(Outcome::<u8>::Timeout.map(|v| v + 1).is_timeout());
        assert!(Outcome::<u8>::Overflow.map(|v| v + 1).is_overflow());
        assert_eq!(Outcome::Ready(3).ready(), Some(3));
        assert_eq!(Outcome::<u8>::Overflow.ready(), None);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = StreamStats {
            capacity: 15,
            ..Default::default()
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"capacity\":15"));
    }
}
