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

//! A voice is one independent playback instance of a sample.
//!
//! Every trigger creates a fresh voice over the shared waveform buffer, so
//! rapid re-triggers of the same sample overlap instead of cutting each
//! other off. A voice carries no scheduled start: it begins rendering on
//! the first mixed block after submission and retires itself at the end of
//! the buffer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::decoder::WaveformBuffer;

/// Global voice ID counter.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// An active playback instance of a single sample.
pub struct Voice {
    /// Unique ID for this voice.
    id: u64,
    /// The sample id being played.
    sample_id: Arc<str>,
    /// The shared waveform buffer (Arc-backed, cloning is cheap).
    buffer: WaveformBuffer,
    /// Playback cursor in frames.
    position: usize,
    /// Fixed gain applied while mixing.
    gain: f32,
}

impl Voice {
    /// Creates a new voice over the given buffer.
    pub fn new(sample_id: Arc<str>, buffer: WaveformBuffer, gain: f32) -> Self {
        Self {
            id: NEXT_VOICE_ID.fetch_add(1, Ordering::Relaxed),
            sample_id,
            buffer,
            position: 0,
            gain,
        }
    }

    /// Returns the unique id of this voice.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the sample id this voice is playing.
    pub fn sample_id(&self) -> &str {
        &self.sample_id
    }

    /// Returns the playback cursor in frames. Zero means the voice is still
    /// pending (submitted but not yet mixed).
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns true once the cursor has reached the end of the buffer.
    pub fn is_finished(&self) -> bool {
        self.position >= self.buffer.frames()
    }

    /// Mixes this voice additively into an interleaved output block and
    /// advances the cursor. Mono sources fan out to every output channel;
    /// multi-channel sources map by channel index. Returns the number of
    /// frames written.
    pub fn mix_into(&mut self, output: &mut [f32], output_channels: u16) -> usize {
        let out_channels = output_channels.max(1) as usize;
        let src_channels = self.buffer.channel_count().max(1) as usize;
        let samples = self.buffer.samples();

        let out_frames = output.len() / out_channels;
        let remaining = self.buffer.frames().saturating_sub(self.position);
        let frames = out_frames.min(remaining);

        for frame in 0..frames {
            let src_base = (self.position + frame) * src_channels;
            let out_base = frame * out_channels;
            for out_ch in 0..out_channels {
                let sample = samples[src_base + (out_ch % src_channels)];
                output[out_base + out_ch] += sample * self.gain;
            }
        }

        self.position += frames;
        frames
    }
}

impl std::fmt::Debug for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Voice")
            .field("id", &self.id)
            .field("sample", &self.sample_id)
            .field("position", &self.position)
            .field("frames", &self.buffer.frames())
            .finish()
    }
}
