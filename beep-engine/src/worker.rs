//! The audio worker thread: ingests client commands, maintains the
//! schedule, and renders successive buffers in response to the sink's
//! consumed signals.

use std::sync::Arc;
use std::thread::JoinHandle;

use audio_sink::AudioSink;
use crossbeam_channel::{bounded, Receiver, Select, Sender};

use crate::clock::SampleTime;
use crate::commands::{ClientItem, EngineCommand};
use crate::error::EngineError;
use crate::events::EventRegistry;
use crate::scheduled::{CommandQueue, ScheduledBeep, ScheduledCommand, ScheduledEvent};
use crate::voice::Voice;

/// Owns the worker's stop signal and join handle. Dropping or calling
/// [`WorkerHandle::stop`] is idempotent from the caller's point of view.
pub(crate) struct WorkerHandle {
    stop_tx: Sender<()>,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn stop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

pub(crate) fn spawn_worker(
    sink: Arc<dyn AudioSink>,
    buffer_size: usize,
    cmd_rx: Receiver<EngineCommand>,
) -> Result<WorkerHandle, EngineError> {
    let silence = vec![0.0f32; buffer_size];
    sink.submit(0, &silence)
        .map_err(|e| EngineError::SinkInit(e.to_string()))?;
    sink.submit(1, &silence)
        .map_err(|e| EngineError::SinkInit(e.to_string()))?;
    sink.start().map_err(|e| EngineError::SinkInit(e.to_string()))?;

    let (stop_tx, stop_rx) = bounded(1);
    let sample_rate = sink.sample_rate();

    let join = std::thread::Builder::new()
        .name("beep-engine-worker".into())
        .spawn(move || run_loop(sink, buffer_size, sample_rate, cmd_rx, stop_rx))
        .map_err(|_| EngineError::ThreadStart)?;

    Ok(WorkerHandle {
        stop_tx,
        join: Some(join),
    })
}

/// Converts whole or fractional seconds to a sample count, rounding to the
/// nearest sample.
fn seconds_to_samples(seconds: f32, sample_rate: u32) -> u32 {
    (seconds.max(0.0) * sample_rate as f32).round() as u32
}

struct Scheduler {
    current_time: SampleTime,
    sample_rate: u32,
    queue: CommandQueue,
    voices: Vec<Voice>,
    events: EventRegistry,
}

impl Scheduler {
    fn new(sample_rate: u32) -> Self {
        Self {
            current_time: SampleTime::ZERO,
            sample_rate,
            queue: CommandQueue::new(),
            voices: Vec::new(),
            events: EventRegistry::new(),
        }
    }

    fn ingest(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::ScheduleBatch(items) => {
                for item in items {
                    self.schedule_item(item);
                }
            }
            EngineCommand::WaitForEvent { event_id, responder } => {
                if self.events.is_possible(event_id) {
                    self.events.register_wait(event_id, responder);
                } else {
                    let _ = responder.send(false);
                }
            }
        }
    }

    fn schedule_item(&mut self, item: ClientItem) {
        match item {
            ClientItem::Note {
                start_time,
                frequency_hz,
                amplitude,
                duration_seconds,
            } => {
                let delta = seconds_to_samples(start_time, self.sample_rate);
                let duration_samples = seconds_to_samples(duration_seconds, self.sample_rate);
                let (absolute_start, wrapped) = self.current_time.advance(delta);
                let omega = 2.0 * std::f32::consts::PI * frequency_hz / self.sample_rate as f32;
                self.queue.push(
                    ScheduledCommand::Beep(ScheduledBeep {
                        absolute_start,
                        omega,
                        amplitude,
                        duration_samples,
                    }),
                    wrapped,
                );
            }
            ClientItem::Event { time, event_id } => {
                let delta = seconds_to_samples(time, self.sample_rate);
                let (absolute_start, wrapped) = self.current_time.advance(delta);
                self.events.mark_possible(event_id);
                self.queue.push(
                    ScheduledCommand::Event(ScheduledEvent {
                        absolute_start,
                        event_id,
                    }),
                    wrapped,
                );
            }
        }
    }

    fn apply(&mut self, command: ScheduledCommand) {
        match command {
            ScheduledCommand::Beep(beep) => {
                let start_delay = beep.absolute_start.0.wrapping_sub(self.current_time.0);
                self.voices.push(Voice::new(
                    beep.omega,
                    beep.amplitude,
                    start_delay,
                    beep.duration_samples,
                ));
            }
            ScheduledCommand::Event(event) => {
                self.events.fire(event.event_id);
            }
        }
    }

    fn render(&mut self, buf: &mut [f32]) {
        buf.iter_mut().for_each(|s| *s = 0.0);

        let (end_time, wrapped) = self.current_time.advance(buf.len() as u32);

        if wrapped {
            while let Some(command) = self.queue.pop_pre_wrap() {
                self.apply(command);
            }
            self.queue.swap_on_wrap();
        }

        while let Some(top) = self.queue.peek_pre_wrap() {
            if top.absolute_start() < end_time {
                let command = self.queue.pop_pre_wrap().expect("peeked command must pop");
                self.apply(command);
            } else {
                break;
            }
        }

        self.voices.retain_mut(|voice| !voice.render_into(buf));
        self.current_time = end_time;
    }
}

fn run_loop(
    sink: Arc<dyn AudioSink>,
    buffer_size: usize,
    sample_rate: u32,
    cmd_rx: Receiver<EngineCommand>,
    stop_rx: Receiver<()>,
) {
    let mut scheduler = Scheduler::new(sample_rate);
    let consumed = [sink.consumed_receiver(0), sink.consumed_receiver(1)];
    let mut buf = vec![0.0f32; buffer_size];

    'run: loop {
        let mut select = Select::new();
        let stop_idx = select.recv(&stop_rx);
        let cmd_idx = select.recv(&cmd_rx);
        let consumed_idx = [select.recv(&consumed[0]), select.recv(&consumed[1])];

        let oper = select.select();
        let index = oper.index();

        if index == stop_idx {
            let _ = oper.recv(&stop_rx);
            tracing::debug!("worker received stop signal");
            break 'run;
        } else if index == cmd_idx {
            match oper.recv(&cmd_rx) {
                Ok(command) => scheduler.ingest(command),
                Err(_) => {
                    tracing::debug!("command channel closed, stopping worker");
                    break 'run;
                }
            }
        } else {
            let slot = consumed_idx.iter().position(|&i| i == index).expect("select index must be one of the registered operations");
            if oper.recv(&consumed[slot]).is_err() {
                tracing::warn!(slot, "consumed channel closed unexpectedly, stopping worker");
                break 'run;
            }
            scheduler.render(&mut buf);
            if let Err(e) = sink.submit(slot, &buf) {
                tracing::error!(error = %e, slot, "buffer submit failed, stopping worker");
                break 'run;
            }
        }
    }

    sink.stop();
    scheduler.events.fail_all();
    if !scheduler.queue.is_empty() {
        tracing::debug!("worker stopped with commands still queued");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::BUFFER_SIZE;

    fn scheduler_at(sample_rate: u32, current_time: u32) -> Scheduler {
        let mut s = Scheduler::new(sample_rate);
        s.current_time = SampleTime(current_time);
        s
    }

    #[test]
    fn events_fire_in_ascending_absolute_order_without_wrap() {
        // sample_rate = 1 so `time` in seconds maps directly to sample deltas.
        let mut scheduler = scheduler_at(1, 0);
        scheduler.schedule_item(ClientItem::Event { time: 500.0, event_id: 2 });
        scheduler.schedule_item(ClientItem::Event { time: 100.0, event_id: 1 });

        let mut buf = vec![0.0f32; BUFFER_SIZE];
        let mut fire_order = Vec::new();
        for _ in 0..1 {
            scheduler.render(&mut buf);
        }
        for id in [1u32, 2] {
            if !scheduler.events.is_possible(id) {
                fire_order.push(id);
            }
        }
        assert_eq!(fire_order, vec![1, 2]);
    }

    #[test]
    fn wrap_crossing_preserves_relative_ordering() {
        // Pre-advance to just before the 32-bit wrap, then schedule one
        // event shortly before the wrap and one shortly after.
        let mut scheduler = scheduler_at(1, 0xFFFF_F000);
        scheduler.schedule_item(ClientItem::Event { time: 512.0, event_id: 1 });
        scheduler.schedule_item(ClientItem::Event { time: 8192.0, event_id: 2 });

        let mut buf = vec![0.0f32; BUFFER_SIZE];
        let mut fire_order = Vec::new();
        for _ in 0..8 {
            scheduler.render(&mut buf);
            for id in [1u32, 2] {
                if !scheduler.events.is_possible(id) && !fire_order.contains(&id) {
                    fire_order.push(id);
                }
            }
        }
        assert_eq!(fire_order, vec![1, 2]);
    }

    #[test]
    fn voice_phase_is_continuous_across_buffer_boundaries() {
        let sample_rate = 8u32;
        let mut scheduler = scheduler_at(sample_rate, 0);
        scheduler.schedule_item(ClientItem::Note {
            start_time: 0.0,
            frequency_hz: 1.0,
            amplitude: 1.0,
            duration_seconds: (3 * BUFFER_SIZE) as f32 / sample_rate as f32,
        });

        let omega = 2.0 * std::f32::consts::PI / sample_rate as f32;
        let mut global_index = 0usize;
        for _ in 0..3 {
            let mut buf = vec![0.0f32; BUFFER_SIZE];
            scheduler.render(&mut buf);
            for &sample in &buf {
                let expected = (omega * global_index as f32).sin();
                assert!(
                    (sample - expected).abs() < 1e-4,
                    "sample {global_index}: got {sample}, expected {expected}"
                );
                global_index += 1;
            }
        }
        assert!(scheduler.voices.is_empty());
    }

    #[test]
    fn idle_scheduler_has_empty_queue_and_voices() {
        // No commands ever scheduled: rendering a few buffers must not
        // leave anything behind in either the command queue or the voice
        // list, matching the post-stop invariant `run_loop` checks via
        // `CommandQueue::is_empty`.
        let mut scheduler = scheduler_at(8, 0);
        let mut buf = vec![0.0f32; BUFFER_SIZE];
        for _ in 0..4 {
            scheduler.render(&mut buf);
        }
        assert!(scheduler.queue.is_empty());
        assert!(scheduler.voices.is_empty());
    }
}
