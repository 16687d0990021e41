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

#[cfg(test)]
use std::{f32::consts::PI, io::Cursor};

#[cfg(test)]
use hound::{SampleFormat, WavSpec, WavWriter};

/// Generates a mono sine wave test signal.
#[cfg(test)]
pub fn sine_wave(frequency: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            0.5 * (2.0 * PI * frequency * t).sin()
        })
        .collect()
}

/// Encodes interleaved f32 samples as an in-memory 32-bit float WAV payload.
#[cfg(test)]
pub fn wav_bytes(interleaved: &[f32], channels: u16, sample_rate: u32) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = WavWriter::new(
        &mut cursor,
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )
    .expect("failed to create wav writer");

    for sample in interleaved {
        writer.write_sample(*sample).expect("failed to write sample");
    }
    writer.finalize().expect("failed to finalize wav");

    cursor.into_inner()
}
