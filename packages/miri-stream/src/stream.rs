// Receive stream lifecycle
//
// Owns the slot ring, the reader and the producer thread that runs the
// transport's blocking read loop. Activation starts the producer and
// requests a flush; deactivation cancels the transport, wakes any blocked
// read and joins the producer before anything is torn down.

use crate::config::StreamConfig;
use crate::error::{StreamError, StreamResult};
use crate::reader::StreamReader;
use crate::ring::{Acquired, RingBuffer, SlotHandle};
use crate::transport::ByteTransport;
use crate::types::{Outcome, ReadChunk, StreamState, StreamStats, DIRECTION_RX};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Output format delivered by [`RxStream::read`].
pub const FORMAT_CF32: &str = "CF32";

/// Format of the raw samples inside ring slots.
pub const NATIVE_FORMAT: &str = "CU16";

/// Full-scale value reported alongside [`NATIVE_FORMAT`].
pub const NATIVE_FULL_SCALE: f64 = 128.0;

/// Stops a stream from another thread.
///
/// Cancels the transport and wakes a blocked read. The owning thread still
/// calls [`RxStream::deactivate`] to join the producer, or
/// [`RxStream::activate`] to restart it.
#[derive(Clone)]
pub struct StopHandle {
    transport: Arc<dyn ByteTransport>,
    ring: Arc<RingBuffer>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.transport.cancel_async();
        self.ring.interrupt();
    }
}

/// A single-channel receive stream.
pub struct RxStream {
    transport: Arc<dyn ByteTransport>,
    config: StreamConfig,
    ring: Arc<RingBuffer>,
    reader: StreamReader,
    producer: Option<JoinHandle<StreamResult<()>>>,
    state: StreamState,
}

impl RxStream {
    /// Formats accepted by [`setup`](Self::setup).
    pub fn stream_formats() -> Vec<&'static str> {
        vec![FORMAT_CF32]
    }

    /// Native sample format and its full-scale value.
    pub fn native_format() -> (&'static str, f64) {
        (NATIVE_FORMAT, NATIVE_FULL_SCALE)
    }

    /// Validate the stream request and allocate the ring.
    pub fn setup(
        transport: Arc<dyn ByteTransport>,
        direction: i32,
        format: &str,
        channels: &[usize],
        args: &HashMap<String, String>,
    ) -> StreamResult<Self> {
        if direction != DIRECTION_RX {
            return Err(StreamError::UnsupportedDirection(direction));
        }
        if channels.len() > 1 || channels.first().is_some_and(|c| *c != 0) {
            return Err(StreamError::InvalidChannel(channels.to_vec()));
        }
        if format != FORMAT_CF32 {
            return Err(StreamError::UnsupportedFormat(format.to_string()));
        }

        Self::with_config(transport, StreamConfig::from_args(args))
    }

    /// Build a stream from an already-parsed configuration.
    pub fn with_config(
        transport: Arc<dyn ByteTransport>,
        config: StreamConfig,
    ) -> StreamResult<Self> {
        let config = config.sanitized();
        log::debug!(
            "Setting up stream: {} buffers of {} bytes",
            config.num_buffers,
            config.buffer_length
        );

        Ok(Self {
            transport,
            ring: Arc::new(RingBuffer::new(config.num_buffers, config.buffer_length)?),
            config,
            reader: StreamReader::new(),
            producer: None,
            state: StreamState::Idle,
        })
    }

    /// Start the producer. Flushes queued data and any carry-over.
    ///
    /// Calling this on an active stream only repeats the flush. A producer
    /// that was stopped through a [`StopHandle`], or whose transport
    /// returned, is joined and started again.
    pub fn activate(&mut self) -> StreamResult<()> {
        self.ring.request_reset();
        self.reader.discard(&self.ring);

        if let Some(handle) = &self.producer {
            if !self.ring.is_interrupted() && !handle.is_finished() {
                return Ok(());
            }
            if let Err(e) = self.join_producer() {
                log::warn!("Restarting stream after producer failure: {}", e);
            }
        }

        self.transport.reset_buffer()?;
        self.ring.resume();

        let ring = Arc::clone(&self.ring);
        let transport = Arc::clone(&self.transport);
        let config = self.config;

        let handle = thread::Builder::new()
            .name("miri-rx".to_string())
            .spawn(move || {
                let mut on_data = |data: &[u8]| {
                    ring.produce(data);
                };
                let result =
                    transport.read_async(config.async_buffers, config.buffer_length, &mut on_data);
                if let Err(e) = &result {
                    log::error!("Transport streaming error: {}", e);
                }
                log::debug!("Producer thread exiting");
                result
            })?;

        self.producer = Some(handle);
        self.state = StreamState::Active;
        log::info!("Stream activated");
        Ok(())
    }

    /// Stop the producer and wait for it to exit. No-op when idle.
    ///
    /// Returns the transport's error if its read loop failed.
    pub fn deactivate(&mut self) -> StreamResult<()> {
        if self.producer.is_none() {
            return Ok(());
        }

        self.state = StreamState::Idle;
        let result = self.join_producer();
        log::info!("Stream deactivated");
        result
    }

    fn join_producer(&mut self) -> StreamResult<()> {
        let Some(handle) = self.producer.take() else {
            return Ok(());
        };

        self.stop_handle().stop();
        handle.join().map_err(|_| StreamError::ThreadJoin)?
    }

    /// Deactivate and release the stream.
    pub fn close(mut self) -> StreamResult<()> {
        self.deactivate()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            transport: Arc::clone(&self.transport),
            ring: Arc::clone(&self.ring),
        }
    }

    /// Read up to `max_elements` I/Q pairs as interleaved CF32 into `dst`.
    pub fn read(
        &mut self,
        dst: &mut [f32],
        max_elements: usize,
        timeout: Duration,
    ) -> StreamResult<Outcome<ReadChunk>> {
        self.reader.read(&self.ring, dst, max_elements, timeout)
    }

    /// Take the oldest slot directly, bypassing conversion.
    ///
    /// Fails with [`StreamError::HandleOutstanding`] while `read` is
    /// holding carry-over or another handle is unreleased.
    pub fn acquire(&self, timeout: Duration) -> StreamResult<Outcome<Acquired>> {
        self.ring.acquire(timeout)
    }

    pub fn release(&self, handle: SlotHandle) {
        self.ring.release(handle);
    }

    /// Raw bytes of an acquired slot.
    pub fn buffer<'a>(&'a self, handle: &'a SlotHandle) -> &'a [u8] {
        self.ring.data(handle)
    }

    pub fn num_direct_access_buffers(&self) -> usize {
        self.ring.capacity()
    }

    /// Discard queued data and carry-over on the next read.
    pub fn request_reset(&self) {
        self.ring.request_reset();
    }

    /// Largest element count a single read can return.
    pub fn mtu(&self) -> usize {
        self.config.mtu()
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == StreamState::Active
    }

    pub fn stats(&self) -> StreamStats {
        let ring = self.ring.metrics();
        StreamStats {
            bursts_produced: ring.bursts_produced,
            bursts_dropped: ring.bursts_dropped,
            overflow_events: ring.overflow_events,
            bytes_produced: ring.bytes_produced,
            slots_in_use: ring.current_size,
            peak_slots_in_use: ring.peak_size,
            capacity: ring.capacity,
            reads: self.reader.reads(),
            elements_delivered: self.reader.elements_delivered(),
        }
    }
}

impl Drop for RxStream {
    fn drop(&mut self) {
        if let Err(e) = self.deactivate() {
            log::warn!("Failed to stop stream on drop: {}", e);
        }
    }
}
