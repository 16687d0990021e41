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

//! One-time decoding of encoded sample payloads into waveform buffers.
//!
//! The payload format is treated opaquely: symphonia probes the container
//! (WAV, MP3, FLAC, OGG, ...) and yields linear PCM. Decoding happens once
//! per engine lifetime; the trigger hot path only ever sees the resulting
//! immutable f32 buffer.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::debug;

use super::error::DecodeError;

/// A fully decoded, ready-to-render sample.
///
/// The PCM data is interleaved f32 behind an `Arc`, so cloning a buffer to
/// hand it to a new voice is cheap and allocation-free.
#[derive(Clone)]
pub struct WaveformBuffer {
    /// Interleaved samples, already at the output device's rate.
    data: Arc<Vec<f32>>,
    /// Number of channels in the sample.
    channel_count: u16,
    /// Sample rate of the audio data.
    sample_rate: u32,
}

impl WaveformBuffer {
    /// Returns the interleaved sample data.
    pub(crate) fn samples(&self) -> &[f32] {
        &self.data
    }

    /// Returns the number of channels.
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Returns the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.data.len() / self.channel_count.max(1) as usize
    }

    /// Returns the playback duration of the buffer.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }

    /// Returns true if this buffer shares its PCM data with `other`.
    #[cfg(test)]
    pub fn shares_data_with(&self, other: &WaveformBuffer) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl std::fmt::Debug for WaveformBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaveformBuffer")
            .field("frames", &self.frames())
            .field("channels", &self.channel_count)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

/// Decodes an encoded payload into a waveform buffer at the target rate.
pub fn decode(bytes: &[u8], target_sample_rate: u32) -> Result<WaveformBuffer, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    // The payload carries no file name, so probe without an extension hint.
    let hint = Hint::new();
    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(DecodeError::AudioError)?;

    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioTrack)?;
    let track_id = track.id;
    let params = &track.codec_params;

    let source_rate = params.sample_rate.ok_or_else(|| {
        DecodeError::SampleConversionFailed("sample rate not specified".to_string())
    })?;
    let mut channels = params.channels.map(|c| c.count() as u16).unwrap_or(0);

    let decoder_opts: DecoderOptions = Default::default();
    let mut decoder = get_codecs()
        .make(params, &decoder_opts)
        .map_err(DecodeError::AudioError)?;

    // Read every packet of the track and accumulate interleaved samples.
    // If the container didn't report a channel count, derive it from the
    // first decoded buffer.
    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            // Some decoders return DecodeError at EOF instead of IoError.
            Err(SymphoniaError::DecodeError(_)) => break,
            Err(e) => return Err(DecodeError::AudioError(e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                decoder.decode(&packet).map_err(DecodeError::AudioError)?
            }
            Err(e) => return Err(DecodeError::AudioError(e)),
        };

        let (packet_samples, packet_channels) = interleave(decoded);
        if channels == 0 {
            channels = packet_channels as u16;
        }
        samples.extend_from_slice(&packet_samples);
    }

    if channels == 0 || samples.is_empty() {
        return Err(DecodeError::SampleConversionFailed(
            "payload decoded to no audio".to_string(),
        ));
    }

    let (data, sample_rate) = if source_rate != target_sample_rate {
        debug!(
            source_rate,
            target_rate = target_sample_rate,
            "Resampling sample"
        );
        (
            resample_linear(&samples, channels, source_rate, target_sample_rate),
            target_sample_rate,
        )
    } else {
        (samples, source_rate)
    };

    Ok(WaveformBuffer {
        data: Arc::new(data),
        channel_count: channels,
        sample_rate,
    })
}

/// Converts a decoded symphonia buffer to interleaved f32 samples, returning
/// the channel count observed in the buffer.
fn interleave(decoded: AudioBufferRef) -> (Vec<f32>, usize) {
    match decoded {
        AudioBufferRef::F32(buf) => interleave_planar(&buf, |s| s),
        AudioBufferRef::F64(buf) => interleave_planar(&buf, |s| s as f32),
        AudioBufferRef::S8(buf) => interleave_planar(&buf, scale_s8),
        AudioBufferRef::S16(buf) => interleave_planar(&buf, scale_s16),
        AudioBufferRef::S24(buf) => interleave_planar(&buf, |s| scale_s24(s.inner())),
        AudioBufferRef::S32(buf) => interleave_planar(&buf, scale_s32),
        AudioBufferRef::U8(buf) => interleave_planar(&buf, scale_u8),
        AudioBufferRef::U16(buf) => interleave_planar(&buf, scale_u16),
        AudioBufferRef::U24(buf) => interleave_planar(&buf, |s| scale_u24(s.inner())),
        AudioBufferRef::U32(buf) => interleave_planar(&buf, scale_u32),
    }
}

/// Interleaves the planes of a generic symphonia buffer through a per-sample
/// conversion closure.
fn interleave_planar<T, F>(buf: &AudioBuffer<T>, convert: F) -> (Vec<f32>, usize)
where
    T: symphonia::core::sample::Sample,
    F: Fn(T) -> f32,
{
    let frames = buf.frames();
    let channels = buf.spec().channels.count();
    let planes = buf.planes();
    let mut samples = Vec::with_capacity(frames * channels);
    for frame_idx in 0..frames {
        for ch_idx in 0..channels {
            samples.push(convert(planes.planes()[ch_idx][frame_idx]));
        }
    }
    (samples, channels)
}

/// Resamples interleaved samples to the target rate using linear
/// interpolation. Sufficient quality for drum hits and one-shots; a
/// bandlimited resampler would be overkill for this use.
fn resample_linear(samples: &[f32], channel_count: u16, source_rate: u32, target_rate: u32) -> Vec<f32> {
    let ratio = target_rate as f64 / source_rate as f64;
    let channels = channel_count as usize;
    let source_frames = samples.len() / channels;
    let target_frames = (source_frames as f64 * ratio).ceil() as usize;

    let mut output = Vec::with_capacity(target_frames * channels);
    for target_frame in 0..target_frames {
        let source_pos = target_frame as f64 / ratio;
        let source_frame = source_pos.floor() as usize;
        let frac = source_pos.fract() as f32;

        for channel in 0..channels {
            let idx0 = source_frame * channels + channel;
            let idx1 = (source_frame + 1) * channels + channel;

            let s0 = samples.get(idx0).copied().unwrap_or(0.0);
            let s1 = samples.get(idx1).copied().unwrap_or(s0);

            output.push(s0 + (s1 - s0) * frac);
        }
    }

    output
}

#[inline]
fn scale_s8(sample: i8) -> f32 {
    sample as f32 / (1i64 << 7) as f32
}

#[inline]
fn scale_s16(sample: i16) -> f32 {
    sample as f32 / (1i64 << 15) as f32
}

#[inline]
fn scale_s24(sample: i32) -> f32 {
    sample as f32 / (1i64 << 23) as f32
}

#[inline]
fn scale_s32(sample: i32) -> f32 {
    sample as f32 / (1i64 << 31) as f32
}

#[inline]
fn scale_u8(sample: u8) -> f32 {
    (sample as f32 / u8::MAX as f32) * 2.0 - 1.0
}

#[inline]
fn scale_u16(sample: u16) -> f32 {
    (sample as f32 / u16::MAX as f32) * 2.0 - 1.0
}

#[inline]
fn scale_u24(sample: u32) -> f32 {
    let max = (1u32 << 24) - 1;
    (sample as f32 / max as f32) * 2.0 - 1.0
}

#[inline]
fn scale_u32(sample: u32) -> f32 {
    (sample as f32 / u32::MAX as f32) * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{sine_wave, wav_bytes};

    #[test]
    fn test_decode_wav_roundtrip() {
        // 100ms of mono audio at the device rate: the decoded buffer must
        // have the same frame count and duration as the source.
        let source = sine_wave(440.0, 44100, 4410);
        let bytes = wav_bytes(&source, 1, 44100);

        let buffer = decode(&bytes, 44100).unwrap();

        assert_eq!(buffer.frames(), 4410);
        assert_eq!(buffer.channel_count(), 1);
        assert_eq!(buffer.sample_rate(), 44100);

        let expected = Duration::from_millis(100);
        let diff = if buffer.duration() > expected {
            buffer.duration() - expected
        } else {
            expected - buffer.duration()
        };
        assert!(diff <= Duration::from_millis(1));
    }

    #[test]
    fn test_decode_preserves_samples() {
        let source = vec![0.0f32, 0.25, 0.5, -0.5, -1.0, 1.0];
        let bytes = wav_bytes(&source, 1, 44100);

        let buffer = decode(&bytes, 44100).unwrap();

        assert_eq!(buffer.samples().len(), source.len());
        for (decoded, original) in buffer.samples().iter().zip(source.iter()) {
            assert!((decoded - original).abs() < 0.001);
        }
    }

    #[test]
    fn test_decode_stereo() {
        // L = 0.5, R = -0.5 throughout.
        let source: Vec<f32> = (0..200).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        let bytes = wav_bytes(&source, 2, 44100);

        let buffer = decode(&bytes, 44100).unwrap();

        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frames(), 100);
        assert!((buffer.samples()[0] - 0.5).abs() < 0.001);
        assert!((buffer.samples()[1] + 0.5).abs() < 0.001);
    }

    #[test]
    fn test_decode_resamples_to_target_rate() {
        let source = sine_wave(440.0, 22050, 2205); // 100ms at 22.05kHz
        let bytes = wav_bytes(&source, 1, 22050);

        let buffer = decode(&bytes, 44100).unwrap();

        assert_eq!(buffer.sample_rate(), 44100);
        // 100ms at 44.1kHz, within a frame of rounding.
        assert!((buffer.frames() as i64 - 4410).unsigned_abs() <= 1);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode(&[0xde, 0xad, 0xbe, 0xef], 44100);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_empty_fails() {
        assert!(decode(&[], 44100).is_err());
    }

    #[test]
    fn test_resample_linear_frame_count() {
        let source = sine_wave(440.0, 44100, 4410);
        let result = resample_linear(&source, 1, 44100, 48000);

        let expected_len = (4410.0_f64 * 48000.0 / 44100.0).ceil() as usize;
        assert_eq!(result.len(), expected_len);
    }

    #[test]
    fn test_resample_linear_stereo_preserves_channels() {
        let source = vec![1.0f32, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let result = resample_linear(&source, 2, 44100, 48000);

        assert!(result.len() >= 8);
        assert!((result[0] - 1.0).abs() < 0.1);
        assert!((result[1] + 1.0).abs() < 0.1);
    }

    #[test]
    fn test_scale_helpers() {
        assert_eq!(scale_s16(0), 0.0);
        assert_eq!(scale_s16(i16::MIN), -1.0);
        assert!((scale_s16(i16::MAX) - 1.0).abs() < 0.001);
        assert!((scale_u8(u8::MAX) - 1.0).abs() < 0.001);
        assert_eq!(scale_u8(0), -1.0);
    }
}
