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
use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::pack::{KeySounds, Segment, SoundPack, KEY_CODES, MAX_GENERIC_SOUNDS};

use self::error::ConfigError;
use self::pattern::Pattern;

pub mod error;
pub mod pattern;

/// The label suffix that marks a multi mode binding as a release sound.
const RELEASE_SUFFIX: &str = "-up";

/// The addressing mode declared by a pack config.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum KeyDefineType {
    #[default]
    Single,
    Multi,
}

/// The JSON representation of a pack config file.
#[derive(Deserialize)]
struct RawPack {
    /// The addressing mode. Packs that predate multi mode omit this.
    #[serde(default)]
    key_define_type: KeyDefineType,
    /// Single mode: the shared audio file. Multi mode: a literal filename or
    /// pattern for the generic press pool.
    sound: Option<String>,
    /// Multi mode: the shared release fallback file.
    soundup: Option<String>,
    /// Key label to segment pair (single) or filename (multi).
    #[serde(default)]
    defines: HashMap<String, serde_json::Value>,
}

/// Loads a sound pack from a config file. All file references in the result
/// are absolute, resolved against the config file's own directory.
pub fn load_pack(path: &Path) -> Result<SoundPack, ConfigError> {
    let path = path
        .canonicalize()
        .map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Unreadable {
        path: path.clone(),
        source,
    })?;
    let raw: RawPack = serde_json::from_str(&contents)?;

    // The canonicalized path always has a parent.
    let base = path.parent().unwrap_or_else(|| Path::new("/"));
    match raw.key_define_type {
        KeyDefineType::Single => load_single(raw, base),
        KeyDefineType::Multi => load_multi(raw, base),
    }
}

/// Builds a single mode pack. The shared sound file is required; individual
/// defines entries that are out of range or malformed are skipped.
fn load_single(raw: RawPack, base: &Path) -> Result<SoundPack, ConfigError> {
    let sound = raw.sound.ok_or(ConfigError::MissingSound)?;

    let mut segments = Box::new([Segment::default(); KEY_CODES]);
    for (label, value) in &raw.defines {
        let Ok(key_code) = label.parse::<u8>() else {
            debug!(label, "Skipping define with unusable key label.");
            continue;
        };
        let Some(segment) = parse_segment(value) else {
            debug!(label, "Skipping define with malformed segment.");
            continue;
        };
        segments[usize::from(key_code)] = segment;
    }

    Ok(SoundPack::Single {
        source: resolve_path(base, &sound),
        segments,
    })
}

/// Reads a `[start_ms, duration_ms]` pair. Extra elements are tolerated,
/// anything else is malformed.
fn parse_segment(value: &serde_json::Value) -> Option<Segment> {
    let pair = value.as_array()?;
    if pair.len() < 2 {
        return None;
    }
    let start_ms = u32::try_from(pair[0].as_u64()?).ok()?;
    let duration_ms = u32::try_from(pair[1].as_u64()?).ok()?;
    Some(Segment {
        start_ms,
        duration_ms,
    })
}

/// Builds a multi mode pack. Nothing here is fatal beyond a malformed
/// pattern: missing files simply shrink the fallback pool, and unusable
/// defines entries are skipped.
fn load_multi(raw: RawPack, base: &Path) -> Result<SoundPack, ConfigError> {
    let mut keys: Box<[KeySounds; KEY_CODES]> =
        Box::new(std::array::from_fn(|_| KeySounds::default()));

    for (label, value) in &raw.defines {
        let (key_label, release) = match label.strip_suffix(RELEASE_SUFFIX) {
            Some(stripped) => (stripped, true),
            None => (label.as_str(), false),
        };
        let Ok(key_code) = key_label.parse::<u8>() else {
            debug!(label, "Skipping define with unusable key label.");
            continue;
        };
        let Some(file) = value.as_str() else {
            debug!(label, "Skipping define without a filename.");
            continue;
        };
        let file = resolve_path(base, file);
        let sounds = &mut keys[usize::from(key_code)];
        if release {
            sounds.release = Some(file);
        } else {
            sounds.press = Some(file);
        }
    }

    let generic_press = match &raw.sound {
        Some(spec) => expand_pool(spec, base)?,
        None => Vec::new(),
    };
    let release_fallback = raw.soundup.as_deref().map(|file| resolve_path(base, file));

    Ok(SoundPack::Multi {
        keys,
        generic_press,
        release_fallback,
    })
}

/// Expands the generic press pool from a filename or pattern, probing each
/// candidate on disk. Expansion stops at the first missing file and the pool
/// is capped at `MAX_GENERIC_SOUNDS` confirmed entries.
fn expand_pool(spec: &str, base: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let pattern = Pattern::parse(spec).map_err(|source| ConfigError::BadPattern {
        pattern: spec.to_string(),
        source,
    })?;

    let mut pool = Vec::new();
    while pool.len() < MAX_GENERIC_SOUNDS {
        let Some(candidate) = pattern.candidate(pool.len()) else {
            break;
        };
        let path = resolve_path(base, &candidate);
        if !path.is_file() {
            debug!(
                candidate = %path.display(),
                confirmed = pool.len(),
                "Stopping press pool expansion at missing file."
            );
            break;
        }
        pool.push(path);
    }
    if pool.is_empty() {
        warn!(sound = spec, "No generic press sounds found.");
    }
    Ok(pool)
}

/// Resolves a file reference against the config file's directory. Absolute
/// references pass through unchanged.
fn resolve_path(base: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Returns the names of all sound packs under the given directory. A sound
/// pack is any subdirectory containing a config.json.
pub fn list_packs(path: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    let mut packs = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        if !entry.path().join("config.json").is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            packs.push(name.to_string());
        }
    }
    packs.sort();
    Ok(packs)
}
