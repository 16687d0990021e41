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

//! YAML configuration for the pad sampler: the output device, the sample
//! files to load, and the kits that map pads to samples.

use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::sampler::DEFAULT_GAIN;

/// Number of pads in a kit.
pub const PADS_PER_KIT: usize = 16;

/// A YAML representation of the sampler configuration.
#[derive(Deserialize, Clone, Serialize, Debug)]
pub struct Config {
    /// The audio device to play through.
    #[serde(default = "default_device")]
    device: String,

    /// The output sample rate.
    #[serde(default = "default_sample_rate")]
    sample_rate: u32,

    /// The number of output channels.
    #[serde(default = "default_channels")]
    channels: u16,

    /// The playback gain applied to every voice.
    #[serde(default = "default_gain")]
    gain: f32,

    /// Sample files by sample name. Paths are relative to the config file.
    samples: HashMap<String, String>,

    /// The kits available to the pad controller.
    #[serde(default)]
    kits: Vec<KitConfig>,

    /// The directory containing the config file; set after parsing so
    /// relative sample paths resolve.
    #[serde(skip)]
    base_path: PathBuf,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_channels() -> u16 {
    2
}

fn default_gain() -> f32 {
    DEFAULT_GAIN
}

impl Config {
    /// Parses the configuration from a YAML file and validates it.
    pub fn from_file(path: &Path) -> Result<Config, Box<dyn Error>> {
        let mut config: Config = serde_yml::from_str(&fs::read_to_string(path)?)
            .map_err(|e| format!("error parsing file {}: {}", path.display(), e))?;
        config.base_path = path
            .canonicalize()?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Validates that every kit pad references a known sample and that each
    /// kit has the expected pad count.
    fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.samples.is_empty() {
            return Err("config defines no samples".into());
        }
        if !(0.0..=1.0).contains(&self.gain) {
            return Err(format!("gain {} is outside 0.0..=1.0", self.gain).into());
        }

        for kit in &self.kits {
            if kit.pads.len() != PADS_PER_KIT {
                return Err(format!(
                    "kit {} has {} pads, expected {}",
                    kit.name,
                    kit.pads.len(),
                    PADS_PER_KIT
                )
                .into());
            }
            for pad in &kit.pads {
                if !self.samples.contains_key(&pad.sample) {
                    return Err(format!(
                        "kit {} pad {} references unknown sample {}",
                        kit.name, pad.name, pad.sample
                    )
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Gets the audio device name.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Gets the output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Gets the number of output channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Gets the playback gain.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Gets the sample files by sample name.
    pub fn samples(&self) -> &HashMap<String, String> {
        &self.samples
    }

    /// Gets the kits.
    pub fn kits(&self) -> &[KitConfig] {
        &self.kits
    }

    /// Gets the directory that relative sample paths resolve against.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[cfg(test)]
impl Config {
    /// Creates a new configuration (test only).
    pub fn new(
        device: String,
        sample_rate: u32,
        channels: u16,
        gain: f32,
        samples: HashMap<String, String>,
        kits: Vec<KitConfig>,
    ) -> Config {
        Config {
            device,
            sample_rate,
            channels,
            gain,
            samples,
            kits,
            base_path: PathBuf::new(),
        }
    }
}

/// A kit: a named assignment of samples to the sixteen pads.
#[derive(Deserialize, Clone, Serialize, Debug)]
pub struct KitConfig {
    /// The name of the kit.
    name: String,

    /// The pads, in pad order.
    pads: Vec<PadConfig>,
}

impl KitConfig {
    /// Gets the name of the kit.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the pads.
    pub fn pads(&self) -> &[PadConfig] {
        &self.pads
    }
}

#[cfg(test)]
impl KitConfig {
    /// Creates a new kit (test only).
    pub fn new(name: String, pads: Vec<PadConfig>) -> KitConfig {
        KitConfig { name, pads }
    }
}

/// A single pad assignment.
#[derive(Deserialize, Clone, Serialize, Debug)]
pub struct PadConfig {
    /// The display name of the pad.
    name: String,

    /// The name of the sample the pad triggers.
    sample: String,
}

impl PadConfig {
    /// Gets the display name of the pad.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the name of the sample the pad triggers.
    pub fn sample(&self) -> &str {
        &self.sample
    }
}

#[cfg(test)]
impl PadConfig {
    /// Creates a new pad assignment (test only).
    pub fn new(name: String, sample: String) -> PadConfig {
        PadConfig { name, sample }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(dir: &Path, yaml: &str) -> PathBuf {
        let path = dir.join("sampler.yaml");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        path
    }

    fn sixteen_pads(sample: &str) -> String {
        (0..16)
            .map(|i| format!("      - {{ name: \"Pad {}\", sample: \"{}\" }}\n", i + 1, sample))
            .collect()
    }

    #[test]
    fn test_parse_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = format!(
            r#"device: "default"
sample_rate: 48000
channels: 2
gain: 0.8
samples:
  kick: "sounds/kick.wav"
kits:
  - name: "Hip Hop"
    pads:
{}"#,
            sixteen_pads("kick")
        );
        let path = write_config(dir.path(), &yaml);

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.device(), "default");
        assert_eq!(config.sample_rate(), 48000);
        assert_eq!(config.channels(), 2);
        assert!((config.gain() - 0.8).abs() < 0.001);
        assert_eq!(config.samples().get("kick").unwrap(), "sounds/kick.wav");
        assert_eq!(config.kits().len(), 1);
        assert_eq!(config.kits()[0].name(), "Hip Hop");
        assert_eq!(config.kits()[0].pads().len(), 16);
        assert_eq!(config.base_path(), dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "samples:\n  kick: \"kick.wav\"\n");

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.device(), "default");
        assert_eq!(config.sample_rate(), 44100);
        assert_eq!(config.channels(), 2);
        assert!((config.gain() - DEFAULT_GAIN).abs() < 0.001);
        assert!(config.kits().is_empty());
    }

    #[test]
    fn test_rejects_unknown_pad_sample() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = format!(
            r#"samples:
  kick: "kick.wav"
kits:
  - name: "Broken"
    pads:
{}"#,
            sixteen_pads("snare")
        );
        let path = write_config(dir.path(), &yaml);

        let result = Config::from_file(&path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("unknown sample"));
    }

    #[test]
    fn test_rejects_wrong_pad_count() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = r#"samples:
  kick: "kick.wav"
kits:
  - name: "Short"
    pads:
      - { name: "Pad 1", sample: "kick" }
"#;
        let path = write_config(dir.path(), yaml);

        let result = Config::from_file(&path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("expected 16"));
    }

    #[test]
    fn test_rejects_no_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "samples: {}\n");

        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_gain() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "gain: 1.5\nsamples:\n  kick: \"kick.wav\"\n");

        assert!(Config::from_file(&path).is_err());
    }
}
