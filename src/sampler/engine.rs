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

//! Main playback engine: owns the output device connection, the one-time
//! decode of all samples, and the trigger protocol.
//!
//! The engine is an explicit owned instance with a lifecycle, not an
//! ambient global: construct one per process (or per test), initialize it,
//! hand it by reference to whatever turns input events into triggers.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::decoder::{self, WaveformBuffer};
use super::error::EngineError;
use super::voice::Voice;
use crate::audio::{Device, OutputHandle};
use crate::store::SampleStore;

/// Default playback gain applied to every voice.
pub const DEFAULT_GAIN: f32 = 0.8;

/// Engine lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

/// The sample playback engine.
///
/// Initialization is all-or-nothing: the engine becomes `Ready` only once
/// the output device is actively rendering and every registered sample has
/// decoded. A single decode failure aborts initialization; there is no
/// partial-ready state.
pub struct PadEngine {
    /// The shared output device.
    device: Arc<dyn Device>,
    /// Requested output sample rate.
    sample_rate: u32,
    /// Requested output channel count.
    channel_count: u16,
    /// Fixed gain applied to every voice.
    gain: f32,
    /// Current lifecycle state.
    state: RwLock<EngineState>,
    /// Serializes initialize/shutdown so Initializing never races.
    lifecycle_lock: Mutex<()>,
    /// Decoded buffers by sample id. Written once under the lifecycle lock,
    /// read-only afterwards.
    buffers: RwLock<Option<Arc<HashMap<String, WaveformBuffer>>>>,
    /// Handle to the running output stream.
    output: RwLock<Option<OutputHandle>>,
}

impl PadEngine {
    /// Creates an engine bound to the given device. No device or decode
    /// work happens until `initialize`.
    pub fn new(device: Arc<dyn Device>, sample_rate: u32, channel_count: u16, gain: f32) -> Self {
        Self {
            device,
            sample_rate,
            channel_count,
            gain,
            state: RwLock::new(EngineState::Uninitialized),
            lifecycle_lock: Mutex::new(()),
            buffers: RwLock::new(None),
            output: RwLock::new(None),
        }
    }

    /// Resumes the output device and decodes every sample in the store.
    ///
    /// Decoding runs in parallel and unordered; all decodes are joined
    /// before the engine declares itself ready. Idempotent: a second call
    /// while already ready is a no-op and keeps the existing buffers.
    pub fn initialize(&self, store: &SampleStore) -> Result<(), EngineError> {
        let _guard = self.lifecycle_lock.lock();

        if *self.state.read() == EngineState::Ready {
            debug!("Engine already ready, skipping initialization");
            return Ok(());
        }
        *self.state.write() = EngineState::Initializing;

        let handle = match self.device.resume(self.sample_rate, self.channel_count) {
            Ok(handle) => handle,
            Err(e) => {
                *self.state.write() = EngineState::Failed;
                return Err(EngineError::DeviceUnavailable(e.to_string()));
            }
        };

        let target_rate = handle.sample_rate();
        let ids: Vec<&str> = store.ids().collect();
        let decoded: Result<HashMap<String, WaveformBuffer>, EngineError> = ids
            .par_iter()
            .map(|id| {
                let bytes = store
                    .bytes_for(id)
                    .map_err(|_| EngineError::UnknownSample((*id).to_string()))?;
                let buffer =
                    decoder::decode(bytes, target_rate).map_err(|e| EngineError::Decode {
                        sample_id: (*id).to_string(),
                        source: e,
                    })?;
                debug!(
                    sample = *id,
                    frames = buffer.frames(),
                    channels = buffer.channel_count(),
                    "Sample decoded"
                );
                Ok(((*id).to_string(), buffer))
            })
            .collect();

        let buffers = match decoded {
            Ok(buffers) => buffers,
            Err(e) => {
                warn!(error = %e, "Decode failed, aborting initialization");
                self.device.suspend();
                *self.state.write() = EngineState::Failed;
                return Err(e);
            }
        };

        let memory_kb = buffers.values().map(|b| b.memory_size()).sum::<usize>() / 1024;
        info!(
            samples = buffers.len(),
            sample_rate = target_rate,
            memory_kb,
            "Engine ready"
        );

        *self.buffers.write() = Some(Arc::new(buffers));
        *self.output.write() = Some(handle);
        *self.state.write() = EngineState::Ready;
        Ok(())
    }

    /// Triggers playback of a sample, starting now.
    ///
    /// Enqueue-only: creates one fresh voice over the decoded buffer and
    /// submits it to the output device. Never blocks, never re-touches the
    /// encoded bytes. Errors are signals for the caller to log and drop,
    /// not to abort on.
    pub fn trigger(&self, sample_id: &str) -> Result<(), EngineError> {
        if *self.state.read() != EngineState::Ready {
            return Err(EngineError::NotReady);
        }

        let buffer = {
            let buffers = self.buffers.read();
            let map = buffers.as_ref().ok_or(EngineError::NotReady)?;
            map.get(sample_id)
                .ok_or_else(|| EngineError::UnknownSample(sample_id.to_string()))?
                .clone()
        };

        let voice = Voice::new(sample_id.into(), buffer, self.gain);
        let voice_id = voice.id();

        let output = self.output.read();
        let handle = output.as_ref().ok_or(EngineError::NotReady)?;
        handle
            .submit(voice)
            .map_err(|e| EngineError::DeviceUnavailable(e.to_string()))?;

        debug!(sample = sample_id, voice = voice_id, "Voice triggered");
        Ok(())
    }

    /// Returns true once the engine is ready to trigger. Pure state query.
    pub fn is_ready(&self) -> bool {
        *self.state.read() == EngineState::Ready
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> EngineState {
        *self.state.read()
    }

    /// Releases the device and the decoded-buffer cache. Idempotent.
    pub fn shutdown(&self) {
        let _guard = self.lifecycle_lock.lock();

        self.output.write().take();
        self.device.suspend();
        let had_buffers = self.buffers.write().take().is_some();
        *self.state.write() = EngineState::Uninitialized;

        if had_buffers {
            info!("Engine shut down");
        }
    }

    /// Returns the number of decoded samples.
    pub fn decoded_samples(&self) -> usize {
        self.buffers
            .read()
            .as_ref()
            .map(|b| b.len())
            .unwrap_or(0)
    }

    /// Returns the decoded duration of a sample, if known.
    pub fn sample_duration(&self, sample_id: &str) -> Option<std::time::Duration> {
        self.buffers
            .read()
            .as_ref()
            .and_then(|b| b.get(sample_id).map(|buf| buf.duration()))
    }

    /// Returns the decoded-buffer cache for identity checks in tests.
    #[cfg(test)]
    pub fn buffer_cache(&self) -> Option<Arc<HashMap<String, WaveformBuffer>>> {
        self.buffers.read().clone()
    }
}

impl std::fmt::Debug for PadEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PadEngine")
            .field("state", &self.state())
            .field("samples", &self.decoded_samples())
            .finish()
    }
}
