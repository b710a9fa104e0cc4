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

//! Filename template expansion for the generic press pool.
//!
//! A multi mode `sound` entry is either a literal filename or a pattern with
//! exactly one placeholder:
//!
//! - `R{3}.wav`: numeric placeholder, candidates `R3.wav`, `R4.wav`, ...
//! - `R{0-4}.wav`: range placeholder, candidates `R0.wav` through `R4.wav`.
//!
//! Candidates are generated in index order; the loader probes each one and
//! stops at the first missing file. Anything else brace-shaped is a malformed
//! pattern and fails the load.

/// A malformed placeholder. Load-fatal, never silently ignored.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("unbalanced braces")]
    UnbalancedBraces,

    #[error("more than one placeholder")]
    MultiplePlaceholders,

    #[error("placeholder '{0}' is not numeric")]
    NotNumeric(String),

    #[error("range {0}-{1} is reversed")]
    ReversedRange(u32, u32),
}

/// A parsed sound filename specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// No placeholder; the filename stands for itself.
    Literal(String),
    /// A placeholder expanding to `prefix{index}suffix` for indices
    /// `start..=end` in order.
    Indexed {
        prefix: String,
        suffix: String,
        start: u32,
        end: u32,
    },
}

impl Pattern {
    /// Parses a filename specification.
    pub fn parse(spec: &str) -> Result<Pattern, PatternError> {
        let open = spec.find('{');
        let close = spec.find('}');
        let (open, close) = match (open, close) {
            (None, None) => return Ok(Pattern::Literal(spec.to_string())),
            (Some(open), Some(close)) if open < close => (open, close),
            _ => return Err(PatternError::UnbalancedBraces),
        };

        let prefix = &spec[..open];
        let body = &spec[open + 1..close];
        let suffix = &spec[close + 1..];
        if suffix.contains('{') || suffix.contains('}') {
            return Err(PatternError::MultiplePlaceholders);
        }

        let parse_bound = |s: &str| {
            s.parse::<u32>()
                .map_err(|_| PatternError::NotNumeric(body.to_string()))
        };
        let (start, end) = match body.split_once('-') {
            Some((low, high)) => (parse_bound(low)?, parse_bound(high)?),
            None => (parse_bound(body)?, u32::MAX),
        };
        if start > end {
            return Err(PatternError::ReversedRange(start, end));
        }

        Ok(Pattern::Indexed {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            start,
            end,
        })
    }

    /// The nth candidate filename, or None once the pattern is exhausted.
    /// A literal has exactly one candidate.
    pub fn candidate(&self, n: usize) -> Option<String> {
        match self {
            Pattern::Literal(name) => (n == 0).then(|| name.clone()),
            Pattern::Indexed {
                prefix,
                suffix,
                start,
                end,
            } => {
                let index = start.checked_add(u32::try_from(n).ok()?)?;
                (index <= *end).then(|| format!("{}{}{}", prefix, index, suffix))
            }
        }
    }
}
