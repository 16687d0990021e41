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

use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use crate::audio::{Device as AudioDevice, OutputHandle};
use crate::sampler::VoiceMixer;

/// How long to wait for the output stream to report it is running before
/// declaring the device unavailable.
const RESUME_TIMEOUT: Duration = Duration::from_secs(5);

/// A small wrapper around a cpal::Device that manages one continuous output
/// stream fed by the voice mixer.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The underlying cpal device.
    device: cpal::Device,
    /// Set to request the output thread to stop.
    shutdown: Arc<AtomicBool>,
    /// Handle to the output thread (keeps the stream alive).
    output_thread: parking_lot::Mutex<Option<thread::JoinHandle<()>>>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal output devices.
    fn list_cpal_devices() -> Result<Vec<Device>, Box<dyn Error>> {
        // Suppress noisy backend output during enumeration.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let mut max_channels = 0;

                let output_configs = device.supported_output_configs();
                if output_configs.is_err() {
                    continue;
                }

                for output_config in device.supported_output_configs()? {
                    if max_channels < output_config.channels() {
                        max_channels = output_config.channels();
                    }
                }

                if max_channels > 0 {
                    devices.push(Device {
                        name: device.name()?,
                        host_id,
                        max_channels,
                        device,
                        shutdown: Arc::new(AtomicBool::new(false)),
                        output_thread: parking_lot::Mutex::new(None),
                    })
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the cpal device with the given name, or the host default for
    /// the name "default".
    pub fn get(name: &str) -> Result<Device, Box<dyn Error>> {
        if name == "default" {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or("no default output device")?;

            let mut max_channels = 0;
            for output_config in device.supported_output_configs()? {
                if max_channels < output_config.channels() {
                    max_channels = output_config.channels();
                }
            }

            return Ok(Device {
                name: device.name()?,
                host_id: host.id(),
                max_channels,
                device,
                shutdown: Arc::new(AtomicBool::new(false)),
                output_thread: parking_lot::Mutex::new(None),
            });
        }

        match Device::list_cpal_devices()?
            .into_iter()
            .find(|device| device.name.trim() == name)
        {
            Some(device) => Ok(device),
            None => Err(format!("no device found with name {}", name).into()),
        }
    }
}

impl AudioDevice for Device {
    /// Builds the output stream on a dedicated thread and waits for it to
    /// start rendering. cpal streams are not Send on all platforms, so the
    /// stream lives and dies on that thread.
    fn resume(
        &self,
        sample_rate: u32,
        channel_count: u16,
    ) -> Result<OutputHandle, Box<dyn Error>> {
        if channel_count > self.max_channels {
            return Err(format!(
                "{} channels requested, audio device {} only has {}",
                channel_count, self.name, self.max_channels
            )
            .into());
        }

        let (mixer, voice_tx) = VoiceMixer::new(channel_count, sample_rate);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

        self.shutdown.store(false, Ordering::Relaxed);
        let shutdown = self.shutdown.clone();
        let device = self.device.clone();

        let output_thread = thread::spawn(move || {
            let config = cpal::StreamConfig {
                channels: channel_count,
                sample_rate,
                buffer_size: cpal::BufferSize::Default,
            };

            let mixer_for_callback = mixer.clone();
            let stream = device.build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    mixer_for_callback.mix_into(data);
                },
                |err| error!("cpal output stream error: {}", err),
                None,
            );

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }
            let _ = ready_tx.send(Ok(()));

            // Keep the stream alive until suspended.
            while !shutdown.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(100));
            }
        });

        *self.output_thread.lock() = Some(output_thread);

        match ready_rx.recv_timeout(RESUME_TIMEOUT) {
            Ok(Ok(())) => {
                info!(
                    device = self.name,
                    sample_rate, channel_count, "Output stream running"
                );
                Ok(OutputHandle::new(voice_tx, sample_rate, channel_count))
            }
            Ok(Err(e)) => {
                self.suspend();
                Err(format!("failed to start output stream: {}", e).into())
            }
            Err(_) => {
                self.suspend();
                Err("timed out waiting for output stream to start".into())
            }
        }
    }

    fn suspend(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(thread) = self.output_thread.lock().take() {
            let _ = thread.join();
            info!(device = self.name, "Output stream released");
        }
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<super::mock::Device>, Box<dyn Error>> {
        Err("not a mock".into())
    }
}
