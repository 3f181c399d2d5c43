//! Identifier matching.
//!
//! # Responsibilities
//! - Validate and extract a path segment as a resource instance identifier
//!
//! # Design Decisions
//! - A matcher holds a compiled regex; invalid patterns are rejected at
//!   construction, so every live matcher is usable
//! - Matching is leftmost-substring, not whole-segment: identifiers may be
//!   embedded in noisier path segments. Patterns wanting whole-segment
//!   semantics anchor themselves (the UUID constant does)

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;

/// One or more digits; the default identifier format.
pub const NUMERIC_ID: &str = "[0-9]+";

/// A lowercase hyphenated UUID, anchored to the whole segment.
pub const UUID_ID: &str = "^[0-9a-f]{8}(?:-[0-9a-f]{4}){3}-[0-9a-f]{12}$";

static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NUMERIC_ID).expect("built-in numeric pattern compiles"));

/// A compiled identifier pattern for one resource.
#[derive(Debug, Clone)]
pub struct IdPattern {
    regex: Regex,
}

impl IdPattern {
    /// Compile `pattern` into a matcher.
    ///
    /// Fails with [`Error::InvalidIdPattern`] when the pattern does not
    /// compile; callers keep their previous matcher in that case.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// The built-in one-or-more-digits matcher.
    pub fn numeric() -> Self {
        Self {
            regex: NUMERIC.clone(),
        }
    }

    /// The source pattern this matcher was compiled from.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Return the leftmost match of the pattern in `segment`, if any.
    pub fn find<'s>(&self, segment: &'s str) -> Option<&'s str> {
        self.regex.find(segment).map(|m| m.as_str())
    }
}

impl Default for IdPattern {
    fn default() -> Self {
        Self::numeric()
    }
}
