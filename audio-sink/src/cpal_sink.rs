//! Real output device sink backed by `cpal`.
//!
//! The `cpal::Stream` is `!Send`, so it is built and torn down entirely on a
//! dedicated worker thread. The public [`CpalSink`] handle only ever touches
//! `Arc<Inner>` state (buffers, atomics, channels) that is safe to share.

use std::panic::catch_unwind;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::{AudioSink, DeviceInfo, SinkError, SLOT_COUNT};

enum CtrlMsg {
    Start,
    Stop,
    Shutdown,
}

struct Inner {
    sample_rate: u32,
    channels: u16,
    device_name: Option<String>,
    buffers: [Mutex<Vec<f32>>; SLOT_COUNT],
    consumed_tx: [Sender<()>; SLOT_COUNT],
    consumed_rx: [Receiver<()>; SLOT_COUNT],
    playing_slot: AtomicUsize,
    frame_pos: AtomicUsize,
    ctrl_tx: Sender<CtrlMsg>,
}

/// A real output sink opened against the system's default device.
pub struct CpalSink {
    inner: Arc<Inner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CpalSink {
    /// Open the default output device with a mono `f32` stream sized around
    /// `buffer_frames` per slot.
    pub fn new(buffer_frames: usize) -> Result<Self, SinkError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(SinkError::DeviceNotFound)?;
        let supported = select_output_config(&device)?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();
        let device_name = device.name().ok();

        let (tx0, rx0) = unbounded();
        let (tx1, rx1) = unbounded();
        let (ctrl_tx, ctrl_rx) = bounded(8);

        let inner = Arc::new(Inner {
            sample_rate,
            channels,
            device_name,
            buffers: [
                Mutex::new(vec![0.0; buffer_frames]),
                Mutex::new(vec![0.0; buffer_frames]),
            ],
            consumed_tx: [tx0, tx1],
            consumed_rx: [rx0, rx1],
            playing_slot: AtomicUsize::new(0),
            frame_pos: AtomicUsize::new(0),
            ctrl_tx,
        });

        let worker_inner = Arc::clone(&inner);
        let config = supported.config();
        let sample_format = supported.sample_format();
        let handle = std::thread::Builder::new()
            .name("audio-sink-worker".into())
            .spawn(move || worker_loop(device, config, sample_format, ctrl_rx, worker_inner))
            .map_err(|e| SinkError::StreamCreationFailed(e.to_string()))?;

        Ok(Self {
            inner,
            worker: Mutex::new(Some(handle)),
        })
    }
}

impl AudioSink for CpalSink {
    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            sample_rate: self.inner.sample_rate,
            channels: self.inner.channels,
            device_name: self.inner.device_name.clone(),
        }
    }

    fn submit(&self, index: usize, samples: &[f32]) -> Result<(), SinkError> {
        let mut buf = self.inner.buffers[index]
            .lock()
            .map_err(|_| SinkError::SubmitFailed {
                index,
                reason: "buffer lock poisoned".into(),
            })?;
        buf.clear();
        buf.extend_from_slice(samples);
        Ok(())
    }

    fn consumed_receiver(&self, index: usize) -> Receiver<()> {
        self.inner.consumed_rx[index].clone()
    }

    fn start(&self) -> Result<(), SinkError> {
        self.inner
            .ctrl_tx
            .send(CtrlMsg::Start)
            .map_err(|_| SinkError::StreamCreationFailed("worker thread gone".into()))
    }

    fn stop(&self) {
        let _ = self.inner.ctrl_tx.send(CtrlMsg::Stop);
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        let _ = self.inner.ctrl_tx.send(CtrlMsg::Shutdown);
        if let Some(handle) = self.worker.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    ctrl_rx: Receiver<CtrlMsg>,
    inner: Arc<Inner>,
) {
    let mut stream: Option<cpal::Stream> = None;

    loop {
        match ctrl_rx.recv() {
            Ok(CtrlMsg::Start) => {
                if stream.is_some() {
                    continue;
                }
                match build_stream(&device, &config, sample_format, Arc::clone(&inner)) {
                    Ok(s) => {
                        if let Err(e) = s.play() {
                            tracing::error!(error = %e, "failed to start output stream");
                            continue;
                        }
                        stream = Some(s);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to build output stream");
                    }
                }
            }
            Ok(CtrlMsg::Stop) => {
                stream = None;
            }
            Ok(CtrlMsg::Shutdown) | Err(_) => {
                stream = None;
                break;
            }
        }
    }
}

/// Picks a native mono config if the device offers one, the way the teacher
/// enumerates `supported_output_configs()` looking for a stereo config;
/// here we filter for `channels == 1` instead. Falls back to the device's
/// default config (almost always stereo) if no mono config exists — in
/// that case `fill_callback` duplicates each mono sample across channels.
fn select_output_config(device: &cpal::Device) -> Result<cpal::SupportedStreamConfig, SinkError> {
    let mut configs = device
        .supported_output_configs()
        .map_err(|e| SinkError::UnsupportedFormat(e.to_string()))?;

    if let Some(mono) = configs.find(|c| c.channels() == 1) {
        return Ok(mono.with_max_sample_rate());
    }

    device
        .default_output_config()
        .map_err(|e| SinkError::UnsupportedFormat(e.to_string()))
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    inner: Arc<Inner>,
) -> Result<cpal::Stream, SinkError> {
    let err_fn = |e| tracing::error!(error = %e, "output stream error");

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_output_stream(
            config,
            move |data: &mut [f32], _| fill_callback(data, &inner),
            err_fn,
            None,
        ),
        other => {
            return Err(SinkError::UnsupportedFormat(format!("{other:?}")));
        }
    }
    .map_err(|e| SinkError::StreamCreationFailed(e.to_string()))?;

    Ok(stream)
}

/// Copies from the currently-playing slot into `data`, flipping slots and
/// signalling "consumed" whenever a slot's buffer is exhausted. `data` is
/// interleaved at `inner.channels` channels; the engine only ever produces
/// mono samples, so each one is duplicated across all output channels.
/// Runs on the real-time audio callback; never blocks or allocates.
fn fill_callback(data: &mut [f32], inner: &Arc<Inner>) {
    let channels = inner.channels.max(1) as usize;
    let total_frames = data.len() / channels;

    let result = catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut frame = 0;
        while frame < total_frames {
            let slot = inner.playing_slot.load(Ordering::Acquire);
            let pos = inner.frame_pos.load(Ordering::Acquire);

            let buf = match inner.buffers[slot].lock() {
                Ok(b) => b,
                Err(_) => {
                    data[frame * channels..].fill(0.0);
                    return;
                }
            };

            if buf.is_empty() {
                data[frame * channels..].fill(0.0);
                return;
            }

            let remaining = buf.len() - pos;
            let take = remaining.min(total_frames - frame);
            for i in 0..take {
                let sample = buf[pos + i];
                let out = (frame + i) * channels;
                data[out..out + channels].fill(sample);
            }
            frame += take;

            if pos + take >= buf.len() {
                drop(buf);
                let _ = inner.consumed_tx[slot].send(());
                let next = (slot + 1) % SLOT_COUNT;
                inner.playing_slot.store(next, Ordering::Release);
                inner.frame_pos.store(0, Ordering::Release);
            } else {
                inner.frame_pos.store(pos + take, Ordering::Release);
            }
        }
    }));

    if result.is_err() {
        data.fill(0.0);
    }
}
