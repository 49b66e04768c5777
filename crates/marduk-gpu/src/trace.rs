//! GPU trace markers.
//!
//! Markers label ranges of GPU work for external debuggers. The facade keeps
//! the active set so that it can be stashed and reinstated around scopes that
//! must not inherit the caller's labels.

use std::collections::BTreeSet;
use std::borrow::Cow;

/// A named instrumentation marker. Identity is `(id, label)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TraceMarker {
    pub id: i32,
    pub label: Cow<'static, str>,
}

impl TraceMarker {
    pub fn new(id: i32, label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

/// Unordered collection of distinct markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceMarkerSet {
    markers: BTreeSet<TraceMarker>,
}

impl TraceMarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    #[inline]
    pub fn contains(&self, marker: &TraceMarker) -> bool {
        self.markers.contains(marker)
    }

    /// Returns false if the marker was already present.
    pub fn add(&mut self, marker: TraceMarker) -> bool {
        self.markers.insert(marker)
    }

    /// Returns false if the marker was not present.
    pub fn remove(&mut self, marker: &TraceMarker) -> bool {
        self.markers.remove(marker)
    }

    pub fn add_set(&mut self, other: &TraceMarkerSet) {
        self.markers.extend(other.markers.iter().cloned());
    }

    pub fn iter(&self) -> impl Iterator<Item = &TraceMarker> {
        self.markers.iter()
    }

    /// Labels joined with `/`, for debug group names.
    pub fn joined_labels(&self) -> String {
        self.markers
            .iter()
            .map(|m| m.label.as_ref())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_unique_by_identity() {
        let mut set = TraceMarkerSet::new();
        assert!(set.add(TraceMarker::new(1, "blur")));
        assert!(!set.add(TraceMarker::new(1, "blur")));
        assert!(set.add(TraceMarker::new(2, "blur")));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn add_set_merges() {
        let mut a = TraceMarkerSet::new();
        a.add(TraceMarker::new(1, "a"));
        let mut b = TraceMarkerSet::new();
        b.add(TraceMarker::new(1, "a"));
        b.add(TraceMarker::new(2, "b"));
        a.add_set(&b);
        assert_eq!(a, b);
        assert_eq!(a.joined_labels(), "a/b");
    }
}
