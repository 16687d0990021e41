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

/// Errors raised while decoding an encoded sample payload.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("no audio track found")]
    NoAudioTrack,

    #[error("sample conversion failed: {0}")]
    SampleConversionFailed(String),

    #[error("audio format error: {0}")]
    AudioError(#[from] symphonia::core::errors::Error),
}

/// Errors raised by the playback engine.
///
/// None of these are fatal to the host: initialization errors are returned
/// as values so the caller can proceed in a degraded, silent state, and
/// trigger-time errors are expected to be logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The output device could not be created or resumed.
    #[error("output device unavailable: {0}")]
    DeviceUnavailable(String),

    /// One sample's bytes could not be turned into a playable buffer. The
    /// engine is all-or-nothing: this aborts initialization.
    #[error("failed to decode sample '{sample_id}': {source}")]
    Decode {
        sample_id: String,
        #[source]
        source: DecodeError,
    },

    /// A trigger or lookup referenced an id that was never registered.
    #[error("unknown sample '{0}'")]
    UnknownSample(String),

    /// A trigger arrived before the engine reached the ready state.
    #[error("engine is not ready")]
    NotReady,
}
