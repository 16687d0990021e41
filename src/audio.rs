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

//! Shared audio-output device abstraction.
//!
//! A device can be created/resumed, accepts voices for immediate rendering
//! through the returned handle, and can be released. The cpal backend does
//! the real work; the mock backend records what would have been audible.

use std::{error::Error, fmt, sync::Arc};

use crossbeam_channel::Sender;

use crate::sampler::Voice;

pub mod cpal;
pub mod mock;

/// A running output stream. Submitting a voice is enqueue-only: the device
/// drains the queue on its own render schedule.
pub struct OutputHandle {
    /// Channel into the device's voice mixer.
    voice_tx: Sender<Voice>,
    /// Rate the device is rendering at.
    sample_rate: u32,
    /// Number of output channels.
    channel_count: u16,
}

impl OutputHandle {
    /// Creates a handle around the mixer's submission channel.
    pub fn new(voice_tx: Sender<Voice>, sample_rate: u32, channel_count: u16) -> Self {
        Self {
            voice_tx,
            sample_rate,
            channel_count,
        }
    }

    /// Submits a voice for rendering starting now. Never blocks.
    pub fn submit(&self, voice: Voice) -> Result<(), Box<dyn Error>> {
        self.voice_tx.send(voice)?;
        Ok(())
    }

    /// Returns the device's sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the device's channel count.
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }
}

pub trait Device: fmt::Display + Send + Sync {
    /// Creates and resumes the output stream. The returned outcome is not
    /// success until the stream is actively rendering.
    fn resume(&self, sample_rate: u32, channel_count: u16)
        -> Result<OutputHandle, Box<dyn Error>>;

    /// Releases the output stream. Idempotent.
    fn suspend(&self);

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<mock::Device>, Box<dyn Error>>;
}

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets a device with the given name. Names starting with "mock" resolve to
/// a mock device; "default" resolves to the host's default output device.
pub fn get_device(name: &str) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    if name.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(name)));
    }

    Ok(Arc::new(cpal::Device::get(name)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_device_dispatches_mock_names() {
        let device = get_device("mock-pads").unwrap();
        let mock = device.to_mock().unwrap();

        assert!(!mock.is_resumed());
        let handle = device.resume(44100, 2).unwrap();
        assert!(mock.is_resumed());
        assert_eq!(handle.sample_rate(), 44100);
        assert_eq!(handle.channel_count(), 2);

        device.suspend();
        assert!(!mock.is_resumed());
    }
}
