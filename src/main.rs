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
mod audio;
mod config;
mod controller;
mod sampler;
mod store;
#[cfg(test)]
mod testutil;

use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};

use crate::config::Config;
use crate::controller::PadController;
use crate::sampler::PadEngine;
use crate::store::SampleStore;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A low-latency drum pad sampler."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Loads and decodes every sample in the config, reporting durations.
    Verify {
        /// The path to the sampler config.
        config_path: String,
    },
    /// Plays a single sample through the audio interface.
    Play {
        /// The path to the sampler config.
        config_path: String,
        /// The name of the sample to play.
        sample_name: String,
        /// The device name to play through, overriding the config.
        #[arg(short, long)]
        device_name: Option<String>,
    },
    /// Starts the interactive pad sampler.
    Start {
        /// The path to the sampler config.
        config_path: String,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Verify { config_path } => {
            let config = Config::from_file(&PathBuf::from(config_path))?;
            let store = load_store(&config)?;

            let mut names: Vec<&str> = store.ids().collect();
            names.sort_unstable();

            println!("Samples (count: {}):", names.len());
            for name in names {
                let buffer = sampler::decode(store.bytes_for(name)?, config.sample_rate())
                    .map_err(|e| format!("sample {}: {}", name, e))?;
                println!(
                    "- {} ({:.3}s, {} channels)",
                    name,
                    buffer.duration().as_secs_f64(),
                    buffer.channel_count()
                );
            }

            println!("\nKits (count: {}):", config.kits().len());
            for kit in config.kits() {
                println!("- {}", kit.name());
            }
        }
        Commands::Play {
            config_path,
            sample_name,
            device_name,
        } => {
            let config = Config::from_file(&PathBuf::from(config_path))?;
            let store = load_store(&config)?;

            let device = audio::get_device(device_name.as_deref().unwrap_or(config.device()))?;
            let engine = PadEngine::new(
                device,
                config.sample_rate(),
                config.channels(),
                config.gain(),
            );
            engine.initialize(&store)?;

            let duration = engine
                .sample_duration(&sample_name)
                .ok_or_else(|| format!("no sample named {}", sample_name))?;
            engine.trigger(&sample_name)?;

            // Let the voice play out before releasing the device.
            thread::sleep(duration + Duration::from_millis(200));
            engine.shutdown();
        }
        Commands::Start { config_path } => {
            let config = Config::from_file(&PathBuf::from(config_path))?;
            let store = load_store(&config)?;

            let device = audio::get_device(config.device())?;
            let engine = Arc::new(PadEngine::new(
                device,
                config.sample_rate(),
                config.channels(),
                config.gain(),
            ));
            engine.initialize(&store)?;

            let mut controller = PadController::new(engine.clone(), config.kits().to_vec());
            run_pad_loop(&mut controller)?;
            engine.shutdown();
        }
    }

    Ok(())
}

/// Reads the config's sample files into a store.
fn load_store(config: &Config) -> Result<SampleStore, Box<dyn Error>> {
    let mut store = SampleStore::new();
    store.load_files(config.samples(), config.base_path())?;
    Ok(store)
}

/// Drives the controller from stdin: pad numbers 1-16 trigger pads,
/// "kit <name>" switches kits, "q" quits.
fn run_pad_loop(controller: &mut PadController) -> Result<(), Box<dyn Error>> {
    if let Some(kit) = controller.active_kit() {
        println!("Active kit: {}", kit.name());
        for (i, pad) in kit.pads().iter().enumerate() {
            println!("  {:2}: {} ({})", i + 1, pad.name(), pad.sample());
        }
    }
    println!("Enter a pad number (1-16), 'kit <name>', or 'q' to quit.");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        let line = line.trim();

        if line == "q" {
            return Ok(());
        }
        if let Some(name) = line.strip_prefix("kit ") {
            controller.select_kit(name.trim());
            continue;
        }
        match line.parse::<usize>() {
            Ok(number) if number >= 1 => {
                controller.hit(number - 1);
            }
            _ => println!("Unrecognized input: {}", line),
        }
    }
}
