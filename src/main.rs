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
mod keys;
mod pack;
mod player;
mod playsync;
#[cfg(test)]
mod testutil;

use clap::{crate_version, Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::audio::source::FileSource;
use crate::controller::Controller;
use crate::player::Player;

/// How long in-flight sounds get to finish naturally on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A mechanical keyboard sound simulator."
)]
struct Cli {
    /// Enables verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plays sounds for key events read from stdin. Expects the keyboard
    /// listener to be piped in by the supervisor.
    Start {
        /// The path to the sound pack config file.
        config_path: String,
        /// The playback volume percentage [0-100].
        #[arg(long, default_value_t = 50)]
        volume: u8,
        /// The audio output device to play through. Defaults to the system
        /// default output device.
        #[arg(short, long)]
        device: Option<String>,
        /// The maximum number of simultaneous sounds.
        #[arg(long, default_value_t = player::DEFAULT_MAX_SOUNDS)]
        max_sounds: usize,
    },
    /// Lists the sound packs in the given directory.
    Packs {
        /// The path to the sound pack repository on disk.
        path: String,
    },
    /// Lists the available audio output devices.
    Devices {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Start {
            config_path,
            volume,
            device,
            max_sounds,
        } => start(PathBuf::from(config_path), volume, device, max_sounds).await,
        Commands::Packs { path } => {
            let packs = config::list_packs(Path::new(&path))?;

            if packs.is_empty() {
                println!("No sound packs found in {}.", path);
                return Ok(());
            }

            println!("Sound packs:");
            for pack in packs {
                println!("- {}", pack);
            }
            Ok(())
        }
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
            Ok(())
        }
    }
}

/// Runs the playback engine until the event stream ends or an interrupt
/// arrives. Startup failures propagate out and exit non-zero; once the
/// engine is listening, per-event failures only ever drop that one sound.
async fn start(
    config_path: PathBuf,
    volume: u8,
    device_name: Option<String>,
    max_sounds: usize,
) -> Result<(), Box<dyn Error>> {
    let pack = config::load_pack(&config_path)?;

    // In single mode every sound comes from the shared file, so it must be
    // playable before we start accepting events.
    if let Some(source) = pack.primary_source() {
        let probe = FileSource::open(source)?;
        info!(
            file = %source.display(),
            frames = probe.frames().unwrap_or_default(),
            channels = probe.channels(),
            sample_rate = probe.sample_rate(),
            "Loaded sound file."
        );
    }

    let device = audio::get_device(device_name.as_deref())?;
    let volume = f32::from(volume.min(100)) / 100.0;
    let mapped_keys = pack.mapped_keys();
    let player = Arc::new(Player::new(device, Arc::new(pack), volume, max_sounds));
    info!(mapped_keys, max_sounds, "Listening for key events.");

    let mut controller = Controller::new(player.clone(), tokio::io::stdin());
    tokio::select! {
        result = controller.join() => result?,
        _ = tokio::signal::ctrl_c() => info!("Received interrupt."),
    }

    info!("Shutting down.");
    let shutdown_player = player.clone();
    tokio::task::spawn_blocking(move || shutdown_player.shutdown(SHUTDOWN_GRACE)).await?;
    Ok(())
}
