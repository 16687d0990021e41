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

use std::{error::Error, fmt, sync::Arc};

use parking_lot::Mutex;
use tracing::info;

use crate::audio::OutputHandle;
use crate::sampler::VoiceMixer;

/// A mock device. Doesn't actually play anything; tests drive the mixer
/// manually via `mix_frames` so they control the render schedule.
///
/// A device named "mock-unavailable" refuses to resume, simulating an
/// output device blocked by the host (e.g. an autoplay policy).
#[derive(Clone)]
pub struct Device {
    name: String,
    mixer: Arc<Mutex<Option<Arc<VoiceMixer>>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            mixer: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns true if the device has a running (resumed) stream.
    pub fn is_resumed(&self) -> bool {
        self.mixer.lock().is_some()
    }

    /// Renders the given number of frames through the mixer, as the real
    /// device's callback would, and returns the interleaved output.
    pub fn mix_frames(&self, frames: usize) -> Vec<f32> {
        match self.mixer.lock().as_ref() {
            Some(mixer) => {
                let mut output = vec![0.0f32; frames * mixer.channel_count() as usize];
                mixer.mix_into(&mut output);
                output
            }
            None => Vec::new(),
        }
    }

    /// Returns the number of voices currently rendering.
    pub fn active_voices(&self) -> usize {
        self.mixer
            .lock()
            .as_ref()
            .map(|m| m.active_voices())
            .unwrap_or(0)
    }

    /// Returns the total number of voices the mixer has picked up.
    pub fn voices_started(&self) -> u64 {
        self.mixer
            .lock()
            .as_ref()
            .map(|m| m.voices_started())
            .unwrap_or(0)
    }

    /// Returns the mixer of the running stream, if any.
    pub fn mixer(&self) -> Option<Arc<VoiceMixer>> {
        self.mixer.lock().clone()
    }
}

impl crate::audio::Device for Device {
    fn resume(
        &self,
        sample_rate: u32,
        channel_count: u16,
    ) -> Result<OutputHandle, Box<dyn Error>> {
        if self.name.ends_with("unavailable") {
            return Err(format!("mock device {} refused to resume", self.name).into());
        }

        let (mixer, voice_tx) = VoiceMixer::new(channel_count, sample_rate);
        *self.mixer.lock() = Some(mixer);

        info!(device = self.name, sample_rate, channel_count, "Mock stream running");
        Ok(OutputHandle::new(voice_tx, sample_rate, channel_count))
    }

    fn suspend(&self) {
        self.mixer.lock().take();
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<Device>, Box<dyn Error>> {
        Ok(Arc::new(self.clone()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
