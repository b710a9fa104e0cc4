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
use std::path::PathBuf;

use super::pattern::PatternError;

/// Typed error for sound pack load failures so the caller can distinguish
/// e.g. an unreadable file from malformed content without string matching.
/// Every variant is fatal at startup; per-key problems inside a readable
/// config are skipped by the loader instead.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse config file: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("single mode config has no 'sound' entry")]
    MissingSound,

    #[error("bad sound pattern '{pattern}': {source}")]
    BadPattern {
        pattern: String,
        source: PatternError,
    },
}
