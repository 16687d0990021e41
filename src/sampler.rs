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

//! Trigger-to-sound sample playback engine.
//!
//! This module provides:
//! - One-time decoding of encoded sample payloads into immutable waveform
//!   buffers (in-memory for zero-latency playback)
//! - A fresh, independent voice per trigger so overlapping hits of the same
//!   sample never truncate each other
//! - Mixing of all live voices into the shared output stream

mod decoder;
mod engine;
mod error;
mod mixer;
mod voice;

pub use decoder::{decode, WaveformBuffer};
pub use engine::{EngineState, PadEngine, DEFAULT_GAIN};
pub use error::{DecodeError, EngineError};
pub use mixer::VoiceMixer;
pub use voice::Voice;
