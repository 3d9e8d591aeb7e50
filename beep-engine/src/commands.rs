//! Client-facing request types: the batch builder and the channel protocol
//! used to hand requests to the worker thread.

use crossbeam_channel::Sender;

/// One client-level request within a batch, expressed in seconds rather than
/// samples — the worker converts using the sink's sample rate at ingest time.
#[derive(Debug, Clone, Copy)]
pub enum ClientItem {
    Note {
        start_time: f32,
        frequency_hz: f32,
        amplitude: f32,
        duration_seconds: f32,
    },
    Event {
        time: f32,
        event_id: u32,
    },
}

/// An explicit, owned collection of notes and events to submit together.
///
/// Replaces a process-wide mutable batch builder with a value the caller
/// builds up and hands off exactly once via
/// [`crate::BeepEngine::submit_batch`].
#[derive(Debug, Default, Clone)]
pub struct BeepBatch {
    items: Vec<ClientItem>,
}

impl BeepBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_note(&mut self, start_time: f32, frequency_hz: f32, amplitude: f32, duration_seconds: f32) {
        self.items.push(ClientItem::Note {
            start_time,
            frequency_hz,
            amplitude,
            duration_seconds,
        });
    }

    pub fn add_event(&mut self, time: f32, event_id: u32) {
        self.items.push(ClientItem::Event { time, event_id });
    }

    pub(crate) fn into_items(self) -> Vec<ClientItem> {
        self.items
    }
}

/// The worker's single inbound channel. `crossbeam_channel`'s blocking
/// `recv` is the wake primitive itself, so no separate signal object is
/// needed alongside it.
pub(crate) enum EngineCommand {
    ScheduleBatch(Vec<ClientItem>),
    WaitForEvent { event_id: u32, responder: Sender<bool> },
}
