//! A running sine oscillator, mixed into successive render buffers in place.

/// A beep in progress. Updated in place each render call so continuing a
/// voice across a buffer boundary never allocates.
#[derive(Debug, Clone)]
pub struct Voice {
    omega: f32,
    amplitude: f32,
    start_delay: u32,
    remaining_samples: u32,
    phase_offset: u32,
}

impl Voice {
    pub fn new(omega: f32, amplitude: f32, start_delay: u32, duration_samples: u32) -> Self {
        Self {
            omega,
            amplitude,
            start_delay,
            remaining_samples: duration_samples,
            phase_offset: 0,
        }
    }

    /// Mixes this voice additively into `buf`. Returns `true` once the voice
    /// has rendered its full duration and should be dropped.
    pub fn render_into(&mut self, buf: &mut [f32]) -> bool {
        let buf_len = buf.len() as u32;

        if self.start_delay >= buf_len {
            self.start_delay -= buf_len;
            return false;
        }

        let start = self.start_delay as usize;
        let span = (buf_len - self.start_delay).min(self.remaining_samples);
        let end = start + span as usize;

        for (local_index, sample) in buf[start..end].iter_mut().enumerate() {
            let phase = self.phase_offset + local_index as u32;
            *sample += self.amplitude * (self.omega * phase as f32).sin();
        }

        if span == self.remaining_samples {
            true
        } else {
            self.start_delay = 0;
            self.remaining_samples -= span;
            self.phase_offset += span;
            false
        }
    }
}
