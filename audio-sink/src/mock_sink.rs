//! In-memory sink for tests and headless builds.
//!
//! `MockSink` accepts submissions immediately and signals "consumed" the
//! instant a buffer arrives, so `beep-engine`'s worker never blocks on a
//! real device. Every submitted buffer is retained in order so tests can
//! inspect exactly what was rendered.

use std::sync::Mutex;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::{AudioSink, DeviceInfo, SinkError, SLOT_COUNT};

pub struct MockSink {
    sample_rate: u32,
    consumed_tx: [Sender<()>; SLOT_COUNT],
    consumed_rx: [Receiver<()>; SLOT_COUNT],
    history: Mutex<Vec<f32>>,
    running: std::sync::atomic::AtomicBool,
}

impl MockSink {
    pub fn new(sample_rate: u32, _buffer_frames: usize) -> Self {
        let (tx0, rx0) = unbounded();
        let (tx1, rx1) = unbounded();
        Self {
            sample_rate,
            consumed_tx: [tx0, tx1],
            consumed_rx: [rx0, rx1],
            history: Mutex::new(Vec::new()),
            running: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// All samples submitted so far, in submission order. Intended for
    /// assertions in tests.
    pub fn rendered_samples(&self) -> Vec<f32> {
        self.history.lock().unwrap().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(std::sync::atomic::Ordering::Acquire)
    }
}

impl AudioSink for MockSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            sample_rate: self.sample_rate,
            channels: 1,
            device_name: Some("mock".to_string()),
        }
    }

    fn submit(&self, index: usize, samples: &[f32]) -> Result<(), SinkError> {
        self.history.lock().unwrap().extend_from_slice(samples);
        self.consumed_tx[index]
            .send(())
            .map_err(|_| SinkError::SubmitFailed {
                index,
                reason: "consumed channel closed".into(),
            })
    }

    fn consumed_receiver(&self, index: usize) -> Receiver<()> {
        self.consumed_rx[index].clone()
    }

    fn start(&self) -> Result<(), SinkError> {
        self.running
            .store(true, std::sync::atomic::Ordering::Release);
        Ok(())
    }

    fn stop(&self) {
        self.running
            .store(false, std::sync::atomic::Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_signals_consumed_immediately() {
        let sink = MockSink::new(44_100, 256);
        let rx = sink.consumed_receiver(0);
        sink.submit(0, &[0.0; 256]).expect("submit should succeed");
        rx.recv_timeout(std::time::Duration::from_millis(50))
            .expect("consumed signal should fire");
    }

    #[test]
    fn rendered_samples_accumulate_in_order() {
        let sink = MockSink::new(44_100, 4);
        sink.submit(0, &[1.0, 2.0]).unwrap();
        sink.submit(1, &[3.0, 4.0]).unwrap();
        assert_eq!(sink.rendered_samples(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn start_stop_toggles_running() {
        let sink = MockSink::new(44_100, 4);
        assert!(!sink.is_running());
        sink.start().unwrap();
        assert!(sink.is_running());
        sink.stop();
        assert!(!sink.is_running());
    }
}
