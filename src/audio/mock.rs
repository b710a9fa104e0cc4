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
use std::{error::Error, fmt, sync::Arc};

use parking_lot::{Condvar, Mutex};

use crate::audio::StreamSpec;

/// Everything one sink received over its lifetime.
#[derive(Debug, Clone)]
pub struct Playback {
    pub spec: StreamSpec,
    pub samples: Vec<i16>,
    pub drained: bool,
}

struct State {
    playbacks: Mutex<Vec<Playback>>,
    /// While held, drain blocks. Tests use this to keep workers occupying
    /// their slots for as long as the test needs.
    hold: Mutex<bool>,
    release: Condvar,
}

/// A mock device. Doesn't actually play anything, but records every stream
/// opened against it.
#[derive(Clone)]
pub struct Device {
    name: String,
    state: Arc<State>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            state: Arc::new(State {
                playbacks: Mutex::new(Vec::new()),
                hold: Mutex::new(false),
                release: Condvar::new(),
            }),
        }
    }

    /// Makes all subsequent drains block until release is called.
    #[cfg(test)]
    pub fn hold(&self) {
        *self.state.hold.lock() = true;
    }

    /// Unblocks every sink currently waiting in drain.
    #[cfg(test)]
    pub fn release(&self) {
        *self.state.hold.lock() = false;
        self.state.release.notify_all();
    }

    /// A snapshot of every playback this device has seen.
    #[cfg(test)]
    pub fn playbacks(&self) -> Vec<Playback> {
        self.state.playbacks.lock().clone()
    }

    /// The number of playbacks written but not yet drained.
    #[cfg(test)]
    pub fn undrained(&self) -> usize {
        self.state
            .playbacks
            .lock()
            .iter()
            .filter(|p| !p.drained)
            .count()
    }
}

impl crate::audio::Device for Device {
    fn open_sink(&self, spec: StreamSpec) -> Result<Box<dyn crate::audio::Sink>, Box<dyn Error>> {
        let index = {
            let mut playbacks = self.state.playbacks.lock();
            playbacks.push(Playback {
                spec,
                samples: Vec::new(),
                drained: false,
            });
            playbacks.len() - 1
        };
        Ok(Box::new(Sink {
            state: self.state.clone(),
            index,
        }))
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<Device>, Box<dyn Error>> {
        Ok(Arc::new(self.clone()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

struct Sink {
    state: Arc<State>,
    index: usize,
}

impl crate::audio::Sink for Sink {
    fn write(&mut self, frames: &[i16]) -> Result<(), Box<dyn Error>> {
        self.state.playbacks.lock()[self.index]
            .samples
            .extend_from_slice(frames);
        Ok(())
    }

    fn drain(&mut self) -> Result<(), Box<dyn Error>> {
        let mut hold = self.state.hold.lock();
        while *hold {
            self.state.release.wait(&mut hold);
        }
        drop(hold);

        self.state.playbacks.lock()[self.index].drained = true;
        Ok(())
    }
}
