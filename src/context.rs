//! Request-scoped dispatch context.
//!
//! # Design Decisions
//! - Created fresh per request by the host; destroyed when the request
//!   completes. Nothing here outlives a request
//! - Moves by value through the resource tree: each level derives its own
//!   state instead of mutating a shared one, so concurrent requests need
//!   no synchronization
//! - Identifiers are keyed by `ResourceName` in a typed map rather than
//!   formatted string keys, ruling out key collisions and runtime type
//!   assertions

use std::collections::HashMap;

use crate::resource::ResourceName;

/// Per-request carrier of remaining path segments, extracted identifiers
/// and per-resource trailing-segment flags.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    segments: Vec<String>,
    ids: HashMap<ResourceName, String>,
    sub_segment: HashMap<ResourceName, bool>,
}

impl RequestContext {
    /// Seed a fresh context with the not-yet-consumed path segments.
    pub fn new(segments: Vec<String>) -> Self {
        Self {
            segments,
            ids: HashMap::new(),
            sub_segment: HashMap::new(),
        }
    }

    /// The remaining, not-yet-consumed path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The identifier extracted for `resource`, if one was matched at any
    /// level above or including the current one.
    pub fn identifier(&self, resource: &str) -> Option<&str> {
        self.ids.get(resource).map(String::as_str)
    }

    /// Whether a path segment followed `resource`'s own name, regardless
    /// of whether it matched the identifier pattern.
    pub fn had_sub_segment(&self, resource: &str) -> bool {
        self.sub_segment.get(resource).copied().unwrap_or(false)
    }

    pub(crate) fn set_segments(&mut self, segments: Vec<String>) {
        self.segments = segments;
    }

    pub(crate) fn insert_identifier(&mut self, resource: ResourceName, value: String) {
        self.ids.insert(resource, value);
    }

    pub(crate) fn set_sub_segment(&mut self, resource: ResourceName, present: bool) {
        self.sub_segment.insert(resource, present);
    }
}
