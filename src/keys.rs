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
use serde::Deserialize;

/// One line of the event stream as emitted by the keyboard listener process.
/// The state code follows the evdev convention: zero is a release, anything
/// else is a press (including autorepeat).
#[derive(Deserialize)]
struct RawEvent {
    key_code: i64,
    state_code: i64,
}

/// A single key press or release. Key codes outside 0-255 are rejected at
/// parse time, so a `KeyEvent` always carries an addressable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key_code: u8,
    pub pressed: bool,
}

impl KeyEvent {
    /// Parses a key event from one line of the event stream. Returns None for
    /// malformed lines and for key codes outside the addressable range, both
    /// of which the caller is expected to skip.
    pub fn parse(line: &str) -> Option<KeyEvent> {
        let raw: RawEvent = serde_json::from_str(line).ok()?;
        let key_code = u8::try_from(raw.key_code).ok()?;
        Some(KeyEvent {
            key_code,
            pressed: raw.state_code != 0,
        })
    }
}
