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

//! Mixing of live voices into the shared output stream.
//!
//! Triggers submit voices through an unbounded channel; the device's render
//! schedule drains the channel and mixes. The control thread never blocks
//! on the audio thread and vice versa.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use super::voice::Voice;

/// Mixes pending and active voices into interleaved output blocks.
pub struct VoiceMixer {
    /// Voices submitted by triggers, not yet picked up by the mixer.
    pending: Receiver<Voice>,
    /// Voices currently rendering.
    active: Mutex<Vec<Voice>>,
    /// Number of output channels.
    channel_count: u16,
    /// Output sample rate.
    sample_rate: u32,
    /// Total frames mixed since creation.
    frames_processed: AtomicU64,
    /// Total voices picked up since creation.
    voices_started: AtomicU64,
}

impl VoiceMixer {
    /// Creates a mixer plus the sender half used for voice submission.
    pub fn new(channel_count: u16, sample_rate: u32) -> (Arc<Self>, Sender<Voice>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mixer = Arc::new(Self {
            pending: rx,
            active: Mutex::new(Vec::new()),
            channel_count,
            sample_rate,
            frames_processed: AtomicU64::new(0),
            voices_started: AtomicU64::new(0),
        });
        (mixer, tx)
    }

    /// Fills one interleaved output block: picks up newly submitted voices,
    /// mixes all live voices additively, and retires finished ones.
    pub fn mix_into(&self, output: &mut [f32]) {
        output.fill(0.0);

        let mut active = self.active.lock();
        while let Ok(voice) = self.pending.try_recv() {
            self.voices_started.fetch_add(1, Ordering::Relaxed);
            active.push(voice);
        }

        active.retain_mut(|voice| {
            voice.mix_into(output, self.channel_count);
            !voice.is_finished()
        });
        drop(active);

        let frames = output.len() as u64 / self.channel_count.max(1) as u64;
        self.frames_processed.fetch_add(frames, Ordering::Relaxed);
    }

    /// Returns the number of voices currently rendering. Submitted voices
    /// are counted once the mixer has picked them up.
    pub fn active_voices(&self) -> usize {
        self.active.lock().len()
    }

    /// Returns the total number of voices the mixer has picked up.
    pub fn voices_started(&self) -> u64 {
        self.voices_started.load(Ordering::Relaxed)
    }

    /// Returns the total number of frames mixed.
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed.load(Ordering::Relaxed)
    }

    /// Returns the number of output channels.
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Returns the output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Runs a closure over every live voice, for inspection in tests.
    #[cfg(test)]
    pub fn with_active_voices<R>(&self, f: impl FnOnce(&[Voice]) -> R) -> R {
        f(&self.active.lock())
    }
}

impl std::fmt::Debug for VoiceMixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceMixer")
            .field("active_voices", &self.active_voices())
            .field("channels", &self.channel_count)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}
