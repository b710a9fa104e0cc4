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

//! Frame-accurate reading of audio files.
//!
//! Uses symphonia to decode whatever format a sound pack ships (WAV, OGG,
//! MP3, FLAC, ...) into interleaved signed 16-bit frames. Seeking combines a
//! coarse container seek with a decoded-frame skip so segment extraction
//! lands on the exact frame.

use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::audio::StreamSpec;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("could not open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unsupported audio file {path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },

    #[error("audio decode error: {0}")]
    Decode(#[from] SymphoniaError),
}

/// A readable audio file, decoded on demand.
pub struct FileSource {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    channels: u16,
    sample_rate: u32,
    frames: Option<u64>,
    /// Decoded interleaved samples not yet handed to the caller.
    buffered: VecDeque<i16>,
    finished: bool,
}

impl FileSource {
    /// Opens an audio file and prepares its first audio track for decoding.
    pub fn open(path: &Path) -> Result<FileSource, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let unsupported = |reason: &str| SourceError::Unsupported {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let fmt_opts: FormatOptions = Default::default();
        let meta_opts: MetadataOptions = Default::default();
        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &fmt_opts, &meta_opts)
            .map_err(|e| unsupported(&e.to_string()))?;
        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| unsupported("no audio track"))?;
        let track_id = track.id;
        let params = &track.codec_params;

        let sample_rate = params
            .sample_rate
            .ok_or_else(|| unsupported("sample rate not specified"))?;
        let channels = params
            .channels
            .map(|channels| channels.count() as u16)
            .ok_or_else(|| unsupported("channel layout not specified"))?;
        let frames = params.n_frames;

        let decoder = symphonia::default::get_codecs()
            .make(params, &DecoderOptions::default())
            .map_err(|e| unsupported(&e.to_string()))?;

        Ok(FileSource {
            reader,
            decoder,
            track_id,
            channels,
            sample_rate,
            frames,
            buffered: VecDeque::new(),
            finished: false,
        })
    }

    /// The native stream format of this file.
    pub fn spec(&self) -> StreamSpec {
        StreamSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// The total number of frames, when the container declares it.
    pub fn frames(&self) -> Option<u64> {
        self.frames
    }

    /// Seeks so the next read starts at exactly the given frame. The
    /// container seek may land early on packet boundaries; the remainder is
    /// decoded and skipped. Track timestamps are in frames at the native rate
    /// for every format symphonia exposes here.
    pub fn seek_to_frame(&mut self, frame: u64) -> Result<(), SourceError> {
        let seeked = self.reader.seek(
            SeekMode::Accurate,
            SeekTo::TimeStamp {
                ts: frame,
                track_id: self.track_id,
            },
        )?;
        self.decoder.reset();
        self.buffered.clear();
        self.finished = false;

        self.skip_frames(seeked.required_ts.saturating_sub(seeked.actual_ts))
    }

    /// Reads up to `max_frames` frames of interleaved samples. A short result
    /// means the end of the stream; an empty one means it was already
    /// reached.
    pub fn read_frames(&mut self, max_frames: usize) -> Result<Vec<i16>, SourceError> {
        let want = max_frames.saturating_mul(usize::from(self.channels));
        while self.buffered.len() < want && !self.finished {
            self.refill()?;
        }

        let take = want.min(self.buffered.len());
        Ok(self.buffered.drain(..take).collect())
    }

    /// Decodes and discards the given number of frames.
    fn skip_frames(&mut self, frames: u64) -> Result<(), SourceError> {
        let mut remaining = frames.saturating_mul(u64::from(self.channels));
        while remaining > 0 {
            if self.buffered.is_empty() {
                if self.finished {
                    return Ok(());
                }
                self.refill()?;
                continue;
            }
            let drop = usize::try_from(remaining)
                .unwrap_or(usize::MAX)
                .min(self.buffered.len());
            self.buffered.drain(..drop);
            remaining -= drop as u64;
        }
        Ok(())
    }

    /// Decodes packets until at least one lands in the buffer or the stream
    /// ends. Undecodable packets are skipped, not fatal.
    fn refill(&mut self) -> Result<(), SourceError> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    self.finished = true;
                    return Ok(());
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.finished = true;
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    if decoded.frames() == 0 {
                        continue;
                    }
                    let mut samples =
                        SampleBuffer::<i16>::new(decoded.capacity() as u64, *decoded.spec());
                    samples.copy_interleaved_ref(decoded);
                    self.buffered.extend(samples.samples().iter().copied());
                    return Ok(());
                }
                Err(SymphoniaError::DecodeError(err)) => {
                    debug!(err, "Skipping undecodable packet.");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
