use super::Gpu;
use crate::backend::Backend;
use crate::trace::{TraceMarker, TraceMarkerSet};

impl<B: Backend> Gpu<B> {
    #[inline]
    fn tracing(&self) -> bool {
        self.backend.caps().gpu_tracing_support
    }

    pub fn add_gpu_trace_marker(&mut self, marker: TraceMarker) {
        if !self.tracing() {
            return;
        }
        self.trace_marker_count += 1;
        self.backend.on_add_trace_marker(&marker);
        self.active_trace_markers.add(marker);
    }

    /// Panics if more markers are removed than were added. In debug builds
    /// the marker must also be active.
    pub fn remove_gpu_trace_marker(&mut self, marker: &TraceMarker) {
        if !self.tracing() {
            return;
        }
        assert!(self.trace_marker_count > 0, "removing trace marker {marker:?} that was never added");
        debug_assert!(
            self.active_trace_markers.contains(marker),
            "removing trace marker {marker:?} that is not active"
        );
        self.active_trace_markers.remove(marker);
        self.backend.on_remove_trace_marker(marker);
        self.trace_marker_count -= 1;
    }

    /// Moves the active markers aside, removing each one from the backend.
    pub fn save_active_trace_markers(&mut self) {
        if !self.tracing() {
            return;
        }
        assert!(
            self.stored_trace_markers.is_empty(),
            "trace markers saved twice without a restore"
        );
        self.stored_trace_markers.add_set(&self.active_trace_markers);
        let saved: Vec<TraceMarker> = self.stored_trace_markers.iter().cloned().collect();
        for marker in &saved {
            self.remove_gpu_trace_marker(marker);
        }
    }

    /// Re-adds the saved markers and empties the stored set. A marker that
    /// was re-added independently while saved stays active once.
    pub fn restore_active_trace_markers(&mut self) {
        if !self.tracing() {
            return;
        }
        let saved = std::mem::replace(&mut self.stored_trace_markers, TraceMarkerSet::new());
        for marker in saved.iter() {
            if !self.active_trace_markers.contains(marker) {
                self.add_gpu_trace_marker(marker.clone());
            }
        }
    }

    #[inline]
    pub fn active_trace_markers(&self) -> &TraceMarkerSet {
        &self.active_trace_markers
    }

    #[inline]
    pub fn stored_trace_markers(&self) -> &TraceMarkerSet {
        &self.stored_trace_markers
    }

    /// Markers added and not yet removed.
    #[inline]
    pub fn trace_marker_count(&self) -> usize {
        self.trace_marker_count
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{mock_gpu, mock_gpu_with, Call, MockBackend};
    use crate::trace::TraceMarker;

    #[test]
    fn add_and_remove_notify_the_backend() {
        let mut gpu = mock_gpu();
        let marker = TraceMarker::new(1, "clip");
        gpu.add_gpu_trace_marker(marker.clone());
        assert_eq!(gpu.trace_marker_count(), 1);
        assert!(gpu.active_trace_markers().contains(&marker));

        gpu.remove_gpu_trace_marker(&marker);
        assert_eq!(gpu.trace_marker_count(), 0);
        assert!(gpu.active_trace_markers().is_empty());
        assert_eq!(
            gpu.backend().calls,
            vec![Call::AddMarker(marker.clone()), Call::RemoveMarker(marker)]
        );
    }

    #[test]
    #[should_panic(expected = "never added")]
    fn removing_more_than_added_panics() {
        let mut gpu = mock_gpu();
        gpu.remove_gpu_trace_marker(&TraceMarker::new(1, "x"));
    }

    #[test]
    fn save_and_restore_swap_the_active_set() {
        let mut gpu = mock_gpu();
        gpu.add_gpu_trace_marker(TraceMarker::new(1, "a"));
        gpu.add_gpu_trace_marker(TraceMarker::new(2, "b"));

        gpu.save_active_trace_markers();
        assert!(gpu.active_trace_markers().is_empty());
        assert_eq!(gpu.stored_trace_markers().len(), 2);
        assert_eq!(gpu.trace_marker_count(), 0);

        gpu.restore_active_trace_markers();
        assert_eq!(gpu.active_trace_markers().len(), 2);
        assert!(gpu.stored_trace_markers().is_empty());
        assert_eq!(gpu.trace_marker_count(), 2);
    }

    #[test]
    fn restore_keeps_a_marker_re_added_while_saved_once() {
        let mut gpu = mock_gpu();
        let marker = TraceMarker::new(7, "blur");
        gpu.add_gpu_trace_marker(marker.clone());
        gpu.save_active_trace_markers();

        gpu.add_gpu_trace_marker(marker.clone());
        gpu.restore_active_trace_markers();

        assert_eq!(gpu.active_trace_markers().len(), 1);
        assert!(gpu.active_trace_markers().contains(&marker));
        assert!(gpu.stored_trace_markers().is_empty());
        assert_eq!(gpu.trace_marker_count(), 1);
        assert_eq!(gpu.backend().count(|c| matches!(c, Call::AddMarker(_))), 2);
        assert_eq!(gpu.backend().count(|c| matches!(c, Call::RemoveMarker(_))), 1);

        gpu.remove_gpu_trace_marker(&marker);
        assert_eq!(gpu.trace_marker_count(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "is not active")]
    fn removing_an_inactive_marker_panics_in_debug() {
        let mut gpu = mock_gpu();
        gpu.add_gpu_trace_marker(TraceMarker::new(1, "a"));
        gpu.remove_gpu_trace_marker(&TraceMarker::new(2, "b"));
    }

    #[test]
    fn save_without_tracing_support_is_a_no_op() {
        let mut backend = MockBackend::new();
        backend.caps.gpu_tracing_support = false;
        let mut gpu = mock_gpu_with(backend);

        gpu.add_gpu_trace_marker(TraceMarker::new(1, "a"));
        gpu.save_active_trace_markers();
        gpu.restore_active_trace_markers();

        assert!(gpu.active_trace_markers().is_empty());
        assert!(gpu.stored_trace_markers().is_empty());
        assert_eq!(gpu.trace_marker_count(), 0);
        assert!(gpu.backend().calls.is_empty());
    }

    #[test]
    fn save_leaves_sets_untouched_when_unsupported() {
        let mut gpu = mock_gpu();
        let marker = TraceMarker::new(3, "layer");
        gpu.add_gpu_trace_marker(marker.clone());
        gpu.backend_mut().caps.gpu_tracing_support = false;

        gpu.save_active_trace_markers();
        assert!(gpu.active_trace_markers().contains(&marker));
        assert!(gpu.stored_trace_markers().is_empty());
    }

    #[test]
    #[should_panic(expected = "saved twice")]
    fn saving_twice_panics() {
        let mut gpu = mock_gpu();
        gpu.add_gpu_trace_marker(TraceMarker::new(1, "a"));
        gpu.save_active_trace_markers();
        gpu.save_active_trace_markers();
    }
}
