//! A real-time engine that schedules sine-wave beeps and marker events
//! against a sample-accurate clock, and lets client threads block until a
//! scheduled event fires.
//!
//! Commands are submitted from any thread through an unbounded channel; a
//! single worker thread owns the schedule, renders PCM into a
//! double-buffered [`audio_sink::AudioSink`], and wakes blocked waiters as
//! events cross the render window.

mod clock;
mod commands;
mod config;
mod error;
mod events;
mod scheduled;
mod voice;
mod worker;

pub use clock::{SampleTime, BUFFER_SIZE};
pub use commands::BeepBatch;
pub use config::EngineConfig;
pub use error::EngineError;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use audio_sink::AudioSink;
use commands::EngineCommand;
use crossbeam_channel::{bounded, unbounded, Sender};
use parking_lot::Mutex;
use worker::WorkerHandle;

/// Reserved event id used internally by [`BeepEngine::beep`].
pub const SENTINEL_EVENT_ID: u32 = 0xFFFF_EA8B;

enum EngineState {
    Running(WorkerHandle),
    Stopped,
}

/// A running beep engine. Every method takes `&self`, so share a `BeepEngine`
/// (behind an `Arc` if needed) across as many client threads as you like.
pub struct BeepEngine {
    cmd_tx: Sender<EngineCommand>,
    state: Mutex<EngineState>,
    running: AtomicBool,
}

impl BeepEngine {
    /// Opens the audio sink, spawns the worker thread, and begins rendering
    /// silence immediately.
    pub fn start(config: EngineConfig) -> Result<Self, EngineError> {
        let sink: Arc<dyn AudioSink> = Arc::from(
            audio_sink::default_sink(config.buffer_size).map_err(|e| EngineError::SinkInit(e.to_string()))?,
        );
        Self::start_with_sink(sink, config.buffer_size)
    }

    /// Binds the engine to a caller-provided sink instead of opening the
    /// platform default device. Exposed for integration tests that need to
    /// inspect what was rendered; not part of the stable public contract.
    #[doc(hidden)]
    pub fn start_with_sink(sink: Arc<dyn AudioSink>, buffer_size: usize) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = unbounded();
        let worker = worker::spawn_worker(Arc::clone(&sink), buffer_size, cmd_rx)?;

        tracing::info!(buffer_size, "beep engine started");

        Ok(Self {
            cmd_tx,
            state: Mutex::new(EngineState::Running(worker)),
            running: AtomicBool::new(true),
        })
    }

    /// Stops the worker thread and releases the sink. Idempotent: calling
    /// this more than once, or on an engine that already stopped itself, is
    /// a no-op after the first call.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if let EngineState::Running(mut worker) = std::mem::replace(&mut *state, EngineState::Stopped) {
            worker.stop();
            tracing::info!("beep engine stopped");
        }
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Convenience wrapper: plays a single note at amplitude 0.125 starting
    /// now, then blocks until it finishes. Returns `true` once the tone has
    /// played to completion.
    pub fn beep(&self, frequency_hz: f32, duration_seconds: f32) -> bool {
        let mut batch = self.new_batch();
        batch.add_note(0.0, frequency_hz, 0.125, duration_seconds);
        batch.add_event(duration_seconds, SENTINEL_EVENT_ID);
        self.submit_batch(batch);
        self.wait_for_event(SENTINEL_EVENT_ID)
    }

    /// Starts an empty batch of notes and events to submit together.
    pub fn new_batch(&self) -> BeepBatch {
        BeepBatch::new()
    }

    /// Hands a batch to the worker. The batch is consumed; its items are
    /// ingested in the order they were added.
    pub fn submit_batch(&self, batch: BeepBatch) {
        let _ = self.cmd_tx.send(EngineCommand::ScheduleBatch(batch.into_items()));
    }

    /// Blocks the calling thread until `event_id` fires, or until it is
    /// determined unreachable (never scheduled, or the engine stops while
    /// the wait is outstanding). Returns `true` iff the event fired.
    pub fn wait_for_event(&self, event_id: u32) -> bool {
        let (responder, response) = bounded(1);
        if self
            .cmd_tx
            .send(EngineCommand::WaitForEvent { event_id, responder })
            .is_err()
        {
            return false;
        }
        response.recv().unwrap_or(false)
    }
}

impl Drop for BeepEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
