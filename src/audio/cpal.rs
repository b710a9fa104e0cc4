// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    collections::VecDeque,
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::{Condvar, Mutex};
use tracing::error;

use crate::audio::StreamSpec;

/// Backpressure limit for queued samples per sink. Key sounds are short;
/// anything larger than this means the device stopped consuming.
const MAX_QUEUED_SAMPLES: usize = 1 << 18;

/// How long drain keeps waiting for the device to make progress before
/// giving up on the stream.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Grace period after the queue empties, covering the samples already handed
/// to the device's own buffer.
const DRAIN_SETTLE: Duration = Duration::from_millis(100);

/// A small wrapper around a cpal::Device. Each playback opens its own output
/// stream against it, the way every key sound is its own independent voice.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
}

impl Device {
    /// Gets the output device with the given name, or the host default.
    pub fn get(name: Option<&str>) -> Result<Device, Box<dyn Error>> {
        let host = cpal::default_host();
        let device = match name {
            Some(name) => host
                .output_devices()?
                .find(|device| device.name().is_ok_and(|n| n == name))
                .ok_or_else(|| format!("no audio output device named {}", name))?,
            None => host
                .default_output_device()
                .ok_or("no default audio output device")?,
        };

        Ok(Device {
            name: device.name()?,
            host_id: host.id(),
            device,
        })
    }

    /// Lists output devices across all available hosts.
    pub fn list() -> Result<Vec<Box<dyn crate::audio::Device>>, Box<dyn Error>> {
        let mut devices: Vec<Box<dyn crate::audio::Device>> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host = cpal::host_from_id(host_id)?;
            let outputs = match host.output_devices() {
                Ok(outputs) => outputs,
                Err(_) => continue,
            };
            for device in outputs {
                if let Ok(name) = device.name() {
                    devices.push(Box::new(Device {
                        name,
                        host_id,
                        device,
                    }));
                }
            }
        }
        Ok(devices)
    }

    /// Returns true if the device can open an f32 output stream with the
    /// requested channel count and sample rate. No resampling happens here:
    /// sounds play at their native format or not at all.
    fn supports(&self, spec: StreamSpec) -> Result<bool, Box<dyn Error>> {
        Ok(self.device.supported_output_configs()?.any(|config| {
            config.channels() == spec.channels
                && config.min_sample_rate() <= spec.sample_rate
                && spec.sample_rate <= config.max_sample_rate()
                && config.sample_format() == cpal::SampleFormat::F32
        }))
    }
}

impl crate::audio::Device for Device {
    fn open_sink(&self, spec: StreamSpec) -> Result<Box<dyn crate::audio::Sink>, Box<dyn Error>> {
        if !self.supports(spec)? {
            return Err(format!(
                "device {} does not support {} channel playback at {} Hz",
                self.name, spec.channels, spec.sample_rate
            )
            .into());
        }

        let config = cpal::StreamConfig {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let state = Arc::new(SinkState::new());
        let stream = {
            let data_state = state.clone();
            let error_state = state.clone();
            self.device.build_output_stream(
                &config,
                move |data: &mut [f32], _| data_state.fill(data),
                move |err| {
                    error!(err = %err, "Audio stream error.");
                    error_state.failed.store(true, Ordering::Relaxed);
                    error_state.consumed.notify_all();
                },
                None,
            )?
        };
        stream.play()?;

        Ok(Box::new(Sink {
            state,
            _stream: stream,
        }))
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<super::mock::Device>, Box<dyn Error>> {
        Err("not a mock device".into())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.host_id.name())
    }
}

/// Samples queued between the writing worker and the device callback.
struct SinkState {
    queue: Mutex<VecDeque<f32>>,
    /// Notified whenever the callback takes samples, so writers waiting for
    /// space and drain waiting for empty both make progress.
    consumed: Condvar,
    failed: AtomicBool,
}

impl SinkState {
    fn new() -> SinkState {
        SinkState {
            queue: Mutex::new(VecDeque::new()),
            consumed: Condvar::new(),
            failed: AtomicBool::new(false),
        }
    }

    /// The device callback: move queued samples out, pad the rest of the
    /// period with silence.
    fn fill(&self, data: &mut [f32]) {
        let mut queue = self.queue.lock();
        for sample in data.iter_mut() {
            *sample = queue.pop_front().unwrap_or(0.0);
        }
        drop(queue);
        self.consumed.notify_all();
    }
}

struct Sink {
    state: Arc<SinkState>,
    /// Keeps the stream alive for the lifetime of the sink.
    _stream: cpal::Stream,
}

impl crate::audio::Sink for Sink {
    fn write(&mut self, frames: &[i16]) -> Result<(), Box<dyn Error>> {
        let mut queue = self.state.queue.lock();
        while queue.len() + frames.len() > MAX_QUEUED_SAMPLES {
            if self.state.failed.load(Ordering::Relaxed) {
                return Err("audio stream failed".into());
            }
            if self
                .state
                .consumed
                .wait_for(&mut queue, DRAIN_TIMEOUT)
                .timed_out()
            {
                return Err("audio stream stopped consuming samples".into());
            }
        }
        queue.extend(frames.iter().map(|s| f32::from(*s) / 32768.0));
        Ok(())
    }

    fn drain(&mut self) -> Result<(), Box<dyn Error>> {
        let mut queue = self.state.queue.lock();
        while !queue.is_empty() {
            if self.state.failed.load(Ordering::Relaxed) {
                return Err("audio stream failed".into());
            }
            if self
                .state
                .consumed
                .wait_for(&mut queue, DRAIN_TIMEOUT)
                .timed_out()
            {
                return Err("audio stream never drained".into());
            }
        }
        drop(queue);

        // The queue is empty but the device still owns one buffer's worth.
        thread::sleep(DRAIN_SETTLE);
        Ok(())
    }
}
