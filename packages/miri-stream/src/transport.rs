// Byte transport behind the producer thread
//
// The transport owns the USB side: once `read_async` is entered it keeps
// invoking the callback with raw bursts until `cancel_async` is called from
// another thread. New transports are added by implementing `ByteTransport`.

use crate::error::{StreamError, StreamResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Source of raw sample bursts.
pub trait ByteTransport: Send + Sync {
    /// Flush whatever the device has buffered. Called before streaming starts.
    fn reset_buffer(&self) -> StreamResult<()>;

    /// Deliver bursts to `on_data` until cancelled.
    ///
    /// `num_buffers` is the number of transfer buffers to use (0 lets the
    /// transport choose) and `buffer_length` their size in bytes.
    fn read_async(
        &self,
        num_buffers: usize,
        buffer_length: usize,
        on_data: &mut dyn FnMut(&[u8]),
    ) -> StreamResult<()>;

    /// Make a running `read_async` return. Safe to call from any thread.
    fn cancel_async(&self);
}

/// Deterministic transport generating a 12-bit counting ramp.
///
/// Useful for exercising a stream without hardware. Component `n` of the
/// output has the value [`SyntheticTransport::component`]`(n)`.
#[derive(Debug)]
pub struct SyntheticTransport {
    burst_bytes: Option<usize>,
    pace: Option<Duration>,
    burst_limit: Option<u64>,
    cancelled: AtomicBool,
    next_component: AtomicU64,
    bursts_sent: AtomicU64,
}

impl Default for SyntheticTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticTransport {
    /// Emit bursts as large as the stream's buffer length, as fast as possible.
    pub fn new() -> Self {
        Self {
            burst_bytes: None,
            pace: None,
            burst_limit: None,
            cancelled: AtomicBool::new(false),
            next_component: AtomicU64::new(0),
            bursts_sent: AtomicU64::new(0),
        }
    }

    /// Use a fixed burst size instead of the stream's buffer length.
    pub fn with_burst_bytes(mut self, bytes: usize) -> Self {
        self.burst_bytes = Some(bytes);
        self
    }

    /// Sleep between bursts.
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }

    /// Stop after this many bursts per activation.
    pub fn with_burst_limit(mut self, bursts: u64) -> Self {
        self.burst_limit = Some(bursts);
        self
    }

    /// Value of the `index`-th generated component.
    pub fn component(index: u64) -> i16 {
        (index % 4096) as i16 - 2048
    }

    /// Bursts handed to the callback since the last `reset_buffer`.
    pub fn bursts_sent(&self) -> u64 {
        self.bursts_sent.load(Ordering::Relaxed)
    }
}

impl ByteTransport for SyntheticTransport {
    fn reset_buffer(&self) -> StreamResult<()> {
        self.cancelled.store(false, Ordering::Release);
        self.bursts_sent.store(0, Ordering::Relaxed);
        Ok(())
    }

    fn read_async(
        &self,
        _num_buffers: usize,
        buffer_length: usize,
        on_data: &mut dyn FnMut(&[u8]),
    ) -> StreamResult<()> {
        let burst_bytes = self.burst_bytes.unwrap_or(buffer_length);
        if burst_bytes == 0 {
            return Err(StreamError::Transport(
                "burst length must be non-zero".to_string(),
            ));
        }
        let mut burst = vec![0u8; burst_bytes];

        while !self.cancelled.load(Ordering::Acquire) {
            if let Some(limit) = self.burst_limit {
                if self.bursts_sent.load(Ordering::Relaxed) >= limit {
                    break;
                }
            }

            let components = (burst_bytes / 2) as u64;
            let start = self.next_component.fetch_add(components, Ordering::Relaxed);
            for (i, word) in burst.chunks_exact_mut(2).enumerate() {
                word.copy_from_slice(&Self::component(start + i as u64).to_le_bytes());
            }

            on_data(&burst);
            self.bursts_sent.fetch_add(1, Ordering::Relaxed);

            if let Some(pace) = self.pace {
                std::thread::sleep(pace);
            }
        }

        log::debug!(
            "Synthetic transport stopped after {} bursts",
            self.bursts_sent()
        );
        Ok(())
    }

    fn cancel_async(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_limit_and_content() {
        let transport = SyntheticTransport::new()
            .with_burst_bytes(8)
            .with_burst_limit(3);
        transport.reset_buffer().unwrap();

        let mut bursts: Vec<Vec<u8>> = Vec::new();
        transport
            .read_async(0, 1024, &mut |data: &[u8]| bursts.push(data.to_vec()))
            .unwrap();

        assert_eq!(bursts.len(), 3);
        assert_eq!(transport.bursts_sent(), 3);
        let second: Vec<i16> = bursts[1]
            .chunks_exact(2)
            .map(|w| i16::from_le_bytes([w[0], w[1]]))
            .collect();
        assert_eq!(second, vec![-2044, -2043, -2042, -2041]);
    }

    #[test]
    fn test_defaults_to_stream_buffer_length() {
        let transport = SyntheticTransport::new().with_burst_limit(1);
        let mut sizes = Vec::new();
        transport
            .read_async(0, 512, &mut |data: &[u8]| sizes.push(data.len()))
            .unwrap();
        assert_eq!(sizes, vec![512]);
    }

    #[test]
    fn test_cancel_from_callback() {
        let transport = SyntheticTransport::new().with_burst_bytes(4);
        let mut seen = 0;
        transport
            .read_async(0, 4, &mut |_: &[u8]| {
                seen += 1;
                if seen == 5 {
                    transport.cancel_async();
                }
            })
            .unwrap();
        assert_eq!(seen, 5);
    }

    #[test]
    fn test_reset_buffer_restarts_burst_limit() {
        let transport = SyntheticTransport::new()
            .with_burst_bytes(4)
            .with_burst_limit(2);
        let mut seen = 0;
        transport.read_async(0, 4, &mut |_: &[u8]| seen += 1).unwrap();
        assert_eq!(transport.bursts_sent(), 2);

        transport.reset_buffer().unwrap();
        assert_eq!(transport.bursts_sent(), 0);
        transport.read_async(0, 4, &mut |_: &[u8]| seen += 1).unwrap();
        assert_eq!(seen, 4);
    }

    #[test]
    fn test_zero_length_bursts_are_rejected() {
        let transport = SyntheticTransport::new().with_burst_bytes(0);
        let result = transport.read_async(0, 1024, &mut |_: &[u8]| {});
        assert!(matches!(result, Err(StreamError::Transport(_))));
    }

    #[test]
    fn test_component_wraps_in_12_bits() {
        assert_eq!(SyntheticTransport::component(0), -2048);
        assert_eq!(SyntheticTransport::component(4095), 2047);
        assert_eq!(SyntheticTransport::component(4096), -2048);
    }
}
