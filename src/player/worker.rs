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

//! The playback worker: one thread per sound.
//!
//! A worker opens its own audio source and its own sink, streams frames
//! between them with volume applied, waits for the sink to drain, and exits.
//! Failures are logged and absorbed; the worker's slot is released by guard
//! drop on every path out of here.

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::audio;
use crate::audio::source::FileSource;
use crate::pack::PlayTarget;
use crate::playsync::CancelHandle;

use super::slots::Slot;

/// Frames per sink write when streaming a whole file.
pub const CHUNK_FRAMES: usize = 2048;

/// The worker entry point.
pub fn run(
    device: Arc<dyn audio::Device>,
    target: PlayTarget,
    volume: f32,
    cancel_handle: CancelHandle,
    slot: Slot,
) {
    // Hold the slot for the duration of playback; dropping it on any exit
    // path below transitions the slot back to free.
    let _slot = slot;

    if let Err(e) = play(device.as_ref(), &target, volume, &cancel_handle) {
        warn!(err = %e, sound = ?target, "Playback failed.");
    }
}

fn play(
    device: &dyn audio::Device,
    target: &PlayTarget,
    volume: f32,
    cancel_handle: &CancelHandle,
) -> Result<(), Box<dyn Error>> {
    match target {
        PlayTarget::Segment {
            source,
            start_ms,
            duration_ms,
        } => play_segment(device, source, *start_ms, *duration_ms, volume, cancel_handle),
        PlayTarget::File(file) => play_file(device, file, volume, cancel_handle),
    }
}

/// Plays a segment of the shared single mode file: seek to the start frame,
/// one bounded read of the segment, one write.
fn play_segment(
    device: &dyn audio::Device,
    source: &Path,
    start_ms: u32,
    duration_ms: u32,
    volume: f32,
    cancel_handle: &CancelHandle,
) -> Result<(), Box<dyn Error>> {
    let mut source = FileSource::open(source)?;
    let spec = source.spec();

    let start_frame = frames_for(start_ms, spec.sample_rate);
    let duration_frames = usize::try_from(frames_for(duration_ms, spec.sample_rate))?;
    source.seek_to_frame(start_frame)?;
    let mut frames = source.read_frames(duration_frames)?;
    if frames.is_empty() || cancel_handle.is_cancelled() {
        return Ok(());
    }
    scale(&mut frames, volume);

    let mut sink = device.open_sink(spec)?;
    sink.write(&frames)?;
    sink.drain()
}

/// Plays an independent file from the beginning, streaming in fixed chunks
/// until the source is exhausted.
fn play_file(
    device: &dyn audio::Device,
    file: &Path,
    volume: f32,
    cancel_handle: &CancelHandle,
) -> Result<(), Box<dyn Error>> {
    let mut source = FileSource::open(file)?;
    let mut sink = device.open_sink(source.spec())?;

    loop {
        if cancel_handle.is_cancelled() {
            debug!(file = %file.display(), "Abandoning playback on shutdown.");
            return Ok(());
        }
        let mut frames = source.read_frames(CHUNK_FRAMES)?;
        if frames.is_empty() {
            break;
        }
        scale(&mut frames, volume);
        sink.write(&frames)?;
    }
    sink.drain()
}

/// Converts a duration in milliseconds to frames at the given rate, with
/// integer truncation.
pub fn frames_for(ms: u32, sample_rate: u32) -> u64 {
    u64::from(ms) * u64::from(sample_rate) / 1000
}

/// Scales every sample by a single factor. The float-to-int cast saturates
/// at the i16 bounds, so a factor above 1.0 clips instead of wrapping.
fn scale(samples: &mut [i16], volume: f32) {
    for sample in samples {
        *sample = (f32::from(*sample) * volume) as i16;
    }
}

#[cfg(test)]
mod test {
    use tempfile::tempdir;

    use crate::audio::mock;
    use crate::testutil::{ramp_value, write_ramp_wav};

    use super::*;

    #[test]
    fn test_frames_for() {
        assert_eq!(frames_for(1000, 44100), 44100);
        assert_eq!(frames_for(500, 44100), 22050);
        assert_eq!(frames_for(0, 44100), 0);
        // Truncation, not rounding.
        assert_eq!(frames_for(1, 44100), 44);
        assert_eq!(frames_for(1, 48000), 48);
    }

    #[test]
    fn test_scale_is_linear() {
        let original: Vec<i16> = vec![-32768, -1234, -1, 0, 1, 999, 32767];

        let mut once = original.clone();
        scale(&mut once, 0.5);

        // Scaling by v then by 1.0 matches scaling once by v.
        let mut twice = original.clone();
        scale(&mut twice, 0.5);
        scale(&mut twice, 1.0);
        assert_eq!(once, twice);

        // And 1.0 alone is the identity.
        let mut identity = original.clone();
        scale(&mut identity, 1.0);
        assert_eq!(identity, original);
    }

    #[test]
    fn test_scale_zero_silences() {
        let mut samples: Vec<i16> = vec![-32768, -1, 0, 1, 32767];
        scale(&mut samples, 0.0);
        assert_eq!(samples, vec![0; 5]);
    }

    #[test]
    fn test_scale_above_unity_clips() {
        let mut samples: Vec<i16> = vec![-32768, -100, 100, 32767];
        scale(&mut samples, 2.0);
        assert_eq!(samples, vec![-32768, -200, 200, 32767]);
    }

    fn mock_device() -> (Arc<mock::Device>, Arc<dyn audio::Device>) {
        let mock = Arc::new(mock::Device::get("mock"));
        let device: Arc<dyn audio::Device> = Arc::new(mock.as_ref().clone());
        (mock, device)
    }

    #[test]
    fn test_segment_playback_reads_the_exact_window() {
        let dir = tempdir().expect("failed to create tempdir");
        let source = dir.path().join("sound.wav");
        write_ramp_wav(&source, 1, 44100, 80000);

        let (mock, device) = mock_device();
        let target = PlayTarget::Segment {
            source,
            start_ms: 1000,
            duration_ms: 500,
        };
        play(device.as_ref(), &target, 1.0, &CancelHandle::new()).expect("playback failed");

        let playbacks = mock.playbacks();
        assert_eq!(playbacks.len(), 1);
        // 500ms at 44.1kHz, starting from the frame at the 1000ms mark.
        assert_eq!(playbacks[0].samples.len(), 22050);
        assert_eq!(playbacks[0].samples[0], ramp_value(44100));
        assert_eq!(playbacks[0].samples[22049], ramp_value(44100 + 22049));
        assert_eq!(playbacks[0].spec.sample_rate, 44100);
        assert!(playbacks[0].drained);
    }

    #[test]
    fn test_segment_playback_applies_volume() {
        let dir = tempdir().expect("failed to create tempdir");
        let source = dir.path().join("sound.wav");
        write_ramp_wav(&source, 1, 44100, 5000);

        let (mock, device) = mock_device();
        let target = PlayTarget::Segment {
            source,
            start_ms: 0,
            duration_ms: 50,
        };
        play(device.as_ref(), &target, 0.5, &CancelHandle::new()).expect("playback failed");

        let playbacks = mock.playbacks();
        assert_eq!(playbacks[0].samples[100], (f32::from(ramp_value(100)) * 0.5) as i16);
    }

    #[test]
    fn test_file_playback_streams_to_the_end() {
        let dir = tempdir().expect("failed to create tempdir");
        let file = dir.path().join("key.wav");
        // Longer than two chunks so the streaming loop runs more than once.
        write_ramp_wav(&file, 2, 48000, 5000);

        let (mock, device) = mock_device();
        play(
            device.as_ref(),
            &PlayTarget::File(file),
            1.0,
            &CancelHandle::new(),
        )
        .expect("playback failed");

        let playbacks = mock.playbacks();
        assert_eq!(playbacks.len(), 1);
        assert_eq!(playbacks[0].samples.len(), 5000 * 2);
        assert_eq!(
            playbacks[0].spec,
            crate::audio::StreamSpec {
                channels: 2,
                sample_rate: 48000
            }
        );
        assert!(playbacks[0].drained);
    }

    #[test]
    fn test_cancelled_file_playback_stops_early() {
        let dir = tempdir().expect("failed to create tempdir");
        let file = dir.path().join("key.wav");
        write_ramp_wav(&file, 1, 44100, 50000);

        let (mock, device) = mock_device();
        let cancel_handle = CancelHandle::new();
        cancel_handle.cancel();
        play(
            device.as_ref(),
            &PlayTarget::File(file),
            1.0,
            &cancel_handle,
        )
        .expect("playback failed");

        // Cancelled before the first chunk: the sink saw nothing.
        let playbacks = mock.playbacks();
        assert_eq!(playbacks.len(), 1);
        assert!(playbacks[0].samples.is_empty());
    }

    #[test]
    fn test_missing_file_is_not_fatal() {
        let (mock, device) = mock_device();
        let result = play(
            device.as_ref(),
            &PlayTarget::File("/nonexistent/key.wav".into()),
            1.0,
            &CancelHandle::new(),
        );
        assert!(result.is_err());
        assert!(mock.playbacks().is_empty());
    }
}
