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

//! The in-memory sound pack model.
//!
//! A sound pack maps key codes to playable audio material in one of two
//! addressing modes. In single mode every key shares one audio file and is
//! differentiated by a time segment within it. In multi mode keys reference
//! independent files per direction, with generic fallbacks for unmapped keys.
//!
//! Packs are built once by the config loader and shared read-only between all
//! playback workers, so resolution needs no locking.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;

/// The number of addressable key codes. Key codes are bounds-checked into u8
/// at the event parse boundary, so every code indexes the tables safely.
pub const KEY_CODES: usize = 256;

/// The maximum size of the generic press fallback pool.
pub const MAX_GENERIC_SOUNDS: usize = 5;

/// A time segment within the shared audio file of a single mode pack.
/// A zero duration means the key has no mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Segment {
    pub start_ms: u32,
    pub duration_ms: u32,
}

impl Segment {
    /// Returns true if this segment maps to actual audio material.
    pub fn is_mapped(&self) -> bool {
        self.duration_ms != 0
    }
}

/// The per-key file bindings of a multi mode pack. Press and release sounds
/// are owned independently.
#[derive(Debug, Clone, Default)]
pub struct KeySounds {
    pub press: Option<PathBuf>,
    pub release: Option<PathBuf>,
}

/// A loaded sound pack. All paths are absolute; the config loader resolves
/// them against the config file's directory so the pack stays valid no matter
/// what the process working directory is.
pub enum SoundPack {
    /// All keys share one audio file, addressed by time segments.
    Single {
        source: PathBuf,
        segments: Box<[Segment; KEY_CODES]>,
    },
    /// Keys reference independent per-direction files, with fallbacks.
    Multi {
        keys: Box<[KeySounds; KEY_CODES]>,
        generic_press: Vec<PathBuf>,
        release_fallback: Option<PathBuf>,
    },
}

/// The audio material resolved for one key event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayTarget {
    /// A segment of the shared single mode file.
    Segment {
        source: PathBuf,
        start_ms: u32,
        duration_ms: u32,
    },
    /// An entire independent file.
    File(PathBuf),
}

impl SoundPack {
    /// Resolves the audio material for a key event. None is a normal, silent
    /// outcome: releases in single mode, unmapped keys with no fallback.
    ///
    /// Multi mode resolution order: the exact per-key file for the event's
    /// direction, then the generic press pool (uniform random pick) or the
    /// release fallback, then silence.
    pub fn resolve(&self, key_code: u8, pressed: bool) -> Option<PlayTarget> {
        match self {
            SoundPack::Single { source, segments } => {
                if !pressed {
                    return None;
                }
                let segment = &segments[usize::from(key_code)];
                if !segment.is_mapped() {
                    return None;
                }
                Some(PlayTarget::Segment {
                    source: source.clone(),
                    start_ms: segment.start_ms,
                    duration_ms: segment.duration_ms,
                })
            }
            SoundPack::Multi {
                keys,
                generic_press,
                release_fallback,
            } => {
                let sounds = &keys[usize::from(key_code)];
                let exact = if pressed {
                    sounds.press.as_ref()
                } else {
                    sounds.release.as_ref()
                };
                if let Some(file) = exact {
                    return Some(PlayTarget::File(file.clone()));
                }
                let fallback = if pressed {
                    generic_press.choose(&mut rand::thread_rng())
                } else {
                    release_fallback.as_ref()
                };
                fallback.map(|file| PlayTarget::File(file.clone()))
            }
        }
    }

    /// The shared audio file of a single mode pack. The engine probe-opens it
    /// at startup; in multi mode there is no single primary source.
    pub fn primary_source(&self) -> Option<&Path> {
        match self {
            SoundPack::Single { source, .. } => Some(source),
            SoundPack::Multi { .. } => None,
        }
    }

    /// The number of keys with at least one mapping, for startup reporting.
    pub fn mapped_keys(&self) -> usize {
        match self {
            SoundPack::Single { segments, .. } => {
                segments.iter().filter(|s| s.is_mapped()).count()
            }
            SoundPack::Multi { keys, .. } => keys
                .iter()
                .filter(|k| k.press.is_some() || k.release.is_some())
                .count(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn single_pack() -> SoundPack {
        let mut segments = Box::new([Segment::default(); KEY_CODES]);
        segments[30] = Segment {
            start_ms: 200,
            duration_ms: 150,
        };
        segments[0] = Segment {
            start_ms: 0,
            duration_ms: 100,
        };
        SoundPack::Single {
            source: PathBuf::from("/packs/oreo/sound.wav"),
            segments,
        }
    }

    fn multi_pack() -> SoundPack {
        let mut keys: Box<[KeySounds; KEY_CODES]> =
            Box::new(std::array::from_fn(|_| KeySounds::default()));
        keys[30].press = Some(PathBuf::from("/packs/blue/30.wav"));
        keys[30].release = Some(PathBuf::from("/packs/blue/30-up.wav"));
        keys[57].release = Some(PathBuf::from("/packs/blue/space-up.wav"));
        SoundPack::Multi {
            keys,
            generic_press: vec![
                PathBuf::from("/packs/blue/R0.wav"),
                PathBuf::from("/packs/blue/R1.wav"),
                PathBuf::from("/packs/blue/R2.wav"),
            ],
            release_fallback: Some(PathBuf::from("/packs/blue/up.wav")),
        }
    }

    #[test]
    fn test_single_resolves_mapped_press() {
        let pack = single_pack();
        assert_eq!(
            pack.resolve(30, true),
            Some(PlayTarget::Segment {
                source: PathBuf::from("/packs/oreo/sound.wav"),
                start_ms: 200,
                duration_ms: 150,
            })
        );
    }

    #[test]
    fn test_single_release_never_resolves() {
        let pack = single_pack();
        for key_code in 0..=u8::MAX {
            assert_eq!(pack.resolve(key_code, false), None);
        }
    }

    #[test]
    fn test_single_unmapped_key_is_silent() {
        let pack = single_pack();
        assert_eq!(pack.resolve(31, true), None);
    }

    #[test]
    fn test_multi_exact_beats_generic_pool() {
        let pack = multi_pack();
        // The generic pool is non-empty, but the exact file must win on every
        // call, not just most of the time.
        for _ in 0..100 {
            assert_eq!(
                pack.resolve(30, true),
                Some(PlayTarget::File(PathBuf::from("/packs/blue/30.wav")))
            );
        }
        assert_eq!(
            pack.resolve(30, false),
            Some(PlayTarget::File(PathBuf::from("/packs/blue/30-up.wav")))
        );
    }

    #[test]
    fn test_multi_generic_pool_pick_is_a_pool_member() {
        let pack = multi_pack();
        let pool: Vec<PathBuf> = match &pack {
            SoundPack::Multi { generic_press, .. } => generic_press.clone(),
            _ => unreachable!(),
        };
        for _ in 0..100 {
            match pack.resolve(31, true) {
                Some(PlayTarget::File(file)) => assert!(pool.contains(&file)),
                other => panic!("expected a pool file, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_multi_release_fallback() {
        let pack = multi_pack();
        // Key 57 has an exact release file.
        assert_eq!(
            pack.resolve(57, false),
            Some(PlayTarget::File(PathBuf::from("/packs/blue/space-up.wav")))
        );
        // Key 31 has none and falls back to the shared release file.
        assert_eq!(
            pack.resolve(31, false),
            Some(PlayTarget::File(PathBuf::from("/packs/blue/up.wav")))
        );
    }

    #[test]
    fn test_multi_empty_fallbacks_are_silent() {
        let keys: Box<[KeySounds; KEY_CODES]> =
            Box::new(std::array::from_fn(|_| KeySounds::default()));
        let pack = SoundPack::Multi {
            keys,
            generic_press: Vec::new(),
            release_fallback: None,
        };
        assert_eq!(pack.resolve(30, true), None);
        assert_eq!(pack.resolve(30, false), None);
    }

    #[test]
    fn test_mapped_keys() {
        assert_eq!(single_pack().mapped_keys(), 2);
        assert_eq!(multi_pack().mapped_keys(), 2);
    }
}
