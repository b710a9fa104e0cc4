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
use std::{sync::Arc, thread, time::Duration};

use tracing::{debug, span, warn, Level, Span};

use crate::{audio, keys::KeyEvent, pack::SoundPack, playsync::CancelHandle};

use self::slots::SlotPool;

mod slots;
pub mod worker;

/// The default bound on simultaneously sounding keys.
pub const DEFAULT_MAX_SOUNDS: usize = 10;

/// How often shutdown re-checks the pool while waiting for workers to finish.
const SHUTDOWN_POLL: Duration = Duration::from_millis(10);

/// Plays key sounds through the configured audio device, one short-lived
/// worker thread per sound, bounded by a fixed pool of playback slots.
pub struct Player {
    /// The device to play sounds through.
    device: Arc<dyn audio::Device>,
    /// The loaded sound pack, shared read-only with every worker.
    pack: Arc<SoundPack>,
    /// The concurrency bound.
    slots: Arc<SlotPool>,
    /// Linear volume factor applied to every sample, 0.0 to 1.0.
    volume: f32,
    /// Observed by all workers; cancelled once on shutdown.
    cancel_handle: CancelHandle,
    /// The logging span.
    span: Span,
}

impl Player {
    /// Creates a new player with all slots free.
    pub fn new(
        device: Arc<dyn audio::Device>,
        pack: Arc<SoundPack>,
        volume: f32,
        max_sounds: usize,
    ) -> Player {
        Player {
            device,
            pack,
            slots: SlotPool::new(max_sounds),
            volume,
            cancel_handle: CancelHandle::new(),
            span: span!(Level::INFO, "player"),
        }
    }

    /// Dispatches one key event: resolve it against the pack, claim a slot,
    /// and hand the sound to a worker thread. Returns immediately in every
    /// case. An unresolvable event and a full pool are both normal, silent
    /// outcomes; the event is simply dropped, never queued or retried.
    pub fn dispatch(&self, event: KeyEvent) {
        let _enter = self.span.enter();

        if self.cancel_handle.is_cancelled() {
            return;
        }

        let Some(target) = self.pack.resolve(event.key_code, event.pressed) else {
            debug!(
                key_code = event.key_code,
                pressed = event.pressed,
                "No sound for event."
            );
            return;
        };

        let Some(slot) = SlotPool::acquire(&self.slots) else {
            debug!(key_code = event.key_code, "All slots busy, dropping event.");
            return;
        };

        let device = self.device.clone();
        let cancel_handle = self.cancel_handle.clone();
        let volume = self.volume;
        let spawned = thread::Builder::new()
            .name(format!("playback-{}", slot.index()))
            .spawn(move || worker::run(device, target, volume, cancel_handle, slot));
        if let Err(e) = spawned {
            // The closure was dropped with the slot guard inside it, so the
            // slot is already free again.
            warn!(err = %e, "Failed to spawn playback worker.");
        }
    }

    /// The number of sounds currently occupying slots.
    pub fn active_sounds(&self) -> usize {
        self.slots.active()
    }

    /// Returns true once shutdown has begun; new events are no longer
    /// accepted.
    pub fn is_stopping(&self) -> bool {
        self.cancel_handle.is_cancelled()
    }

    /// Stops accepting new events, then gives in-flight workers a bounded
    /// grace period to finish naturally before reclaiming their slots.
    pub fn shutdown(&self, grace: Duration) {
        let _enter = self.span.enter();

        self.cancel_handle.cancel();

        let deadline = std::time::Instant::now() + grace;
        while self.slots.active() > 0 && std::time::Instant::now() < deadline {
            thread::sleep(SHUTDOWN_POLL);
        }

        let remaining = self.slots.active();
        if remaining > 0 {
            warn!(remaining, "Reclaiming slots from unfinished workers.");
        }
        self.slots.clear();
    }
}
