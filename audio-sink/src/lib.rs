//! Double-buffered platform audio output.
//!
//! `beep-engine` renders fixed-size chunks of mono `f32` PCM and hands them
//! to a sink two at a time, waiting for a "this buffer has been consumed"
//! signal before it may reuse a slot. This crate defines that handshake as
//! the [`AudioSink`] trait, and ships two implementations: a real
//! [`cpal_sink::CpalSink`] backed by the default output device, and an
//! in-memory [`mock_sink::MockSink`] for tests and headless builds.
//!
//! The real-time device callback runs behind a worker thread owned by
//! `CpalSink`; the cpal `Stream` handle itself is `!Send` and never crosses
//! a thread boundary.

#[cfg(not(feature = "mock-audio"))]
pub mod cpal_sink;
pub mod mock_sink;

use crossbeam_channel::Receiver;
use thiserror::Error;

/// Errors raised while initializing or operating a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("no output device available")]
    DeviceNotFound,
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to build output stream: {0}")]
    StreamCreationFailed(String),
    #[error("failed to submit buffer {index}: {reason}")]
    SubmitFailed { index: usize, reason: String },
}

/// The two double-buffer slot indices. `beep-engine` never has more than
/// two buffers outstanding with the sink at once.
pub const SLOT_COUNT: usize = 2;

/// Effective configuration of the opened output device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub device_name: Option<String>,
}

/// The double-buffered output contract consumed by `beep-engine`'s worker.
///
/// Implementations must raise the corresponding entry returned by
/// [`AudioSink::consumed_receiver`] exactly once per submitted buffer, after
/// that buffer has finished playing (or, for a mock sink, after it has been
/// accepted) so the caller can refill and resubmit the slot.
pub trait AudioSink: Send + Sync {
    /// Output sample rate in Hz, fixed for the lifetime of the sink.
    fn sample_rate(&self) -> u32;

    /// Device info, if known.
    fn device_info(&self) -> DeviceInfo;

    /// Hand a fully-rendered mono `f32` buffer to slot `index` (0 or 1).
    /// The caller must not submit again to the same slot until its consumed
    /// receiver has fired for the previous submission.
    fn submit(&self, index: usize, samples: &[f32]) -> Result<(), SinkError>;

    /// The notification channel for slot `index`. Receives one message per
    /// buffer once the sink is done with it.
    fn consumed_receiver(&self, index: usize) -> Receiver<()>;

    /// Begin playback. Buffers should be submitted to both slots before
    /// calling this.
    fn start(&self) -> Result<(), SinkError>;

    /// Stop playback and release the device. Idempotent.
    fn stop(&self);
}

/// Construct the default real sink, or the in-memory mock when the
/// `mock-audio` feature is enabled.
#[cfg(not(feature = "mock-audio"))]
pub fn default_sink(buffer_frames: usize) -> Result<Box<dyn AudioSink>, SinkError> {
    let sink = cpal_sink::CpalSink::new(buffer_frames)?;
    tracing::info!(
        sample_rate = sink.sample_rate(),
        device = ?sink.device_info().device_name,
        "opened audio sink"
    );
    Ok(Box::new(sink))
}

#[cfg(feature = "mock-audio")]
pub fn default_sink(buffer_frames: usize) -> Result<Box<dyn AudioSink>, SinkError> {
    let sink = mock_sink::MockSink::new(44_100, buffer_frames);
    tracing::info!("opened mock audio sink");
    Ok(Box::new(sink))
}
