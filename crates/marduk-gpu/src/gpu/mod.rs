//! GPU facade.
//!
//! `Gpu` owns the state shared by every backend: the geometry source stack
//! and its pools, the stencil cache, the quad index buffer, trace markers,
//! and the current draw state. It validates requests, keeps that state
//! consistent, and forwards the hardware work to a [`Backend`].
//!
//! Every call that reaches the backend goes through
//! [`Gpu::handle_dirty_context`] first, which releases dropped resources and
//! lets the backend re-validate state touched behind its back.

mod dispatch;
mod geometry;
mod options;
mod path;
mod quad;
mod resources;
mod trace;

pub use options::GpuOptions;
pub use quad::MAX_QUADS;

use std::rc::Rc;

use crate::backend::{Backend, BackendState};
use crate::draw::DrawState;
use crate::geometry::{BufferPool, GeometryStack};
use crate::resource::{GpuBuffer, ReleaseQueue, StencilCache};
use crate::trace::TraceMarkerSet;

pub struct Gpu<B: Backend> {
    backend: B,
    options: GpuOptions,

    /// Ids of dropped handles, released at the next backend call.
    releases: ReleaseQueue,
    reset_bits: BackendState,
    reset_timestamp: u64,

    default_draw_state: Rc<DrawState>,
    draw_state: Rc<DrawState>,

    geometry: GeometryStack,
    vertex_pool: Option<BufferPool>,
    index_pool: Option<BufferPool>,

    quad_index_buffer: Option<Rc<GpuBuffer>>,
    stencil_cache: StencilCache,

    active_trace_markers: TraceMarkerSet,
    stored_trace_markers: TraceMarkerSet,
    trace_marker_count: usize,
}

impl<B: Backend> Gpu<B> {
    pub fn new(backend: B, options: GpuOptions) -> Self {
        let default_draw_state = Rc::new(DrawState::default());
        Self {
            backend,
            options,
            releases: ReleaseQueue::new(),
            // Nothing is known about the context yet.
            reset_bits: BackendState::all(),
            reset_timestamp: 1,
            draw_state: default_draw_state.clone(),
            default_draw_state,
            geometry: GeometryStack::new(),
            vertex_pool: None,
            index_pool: None,
            quad_index_buffer: None,
            stencil_cache: StencilCache::new(),
            active_trace_markers: TraceMarkerSet::new(),
            stored_trace_markers: TraceMarkerSet::new(),
            trace_marker_count: 0,
        }
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Direct backend access. State changed through it should be reported
    /// with [`mark_context_dirty`](Self::mark_context_dirty).
    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    pub fn options(&self) -> &GpuOptions {
        &self.options
    }

    // ── context ───────────────────────────────────────────────────────────

    /// Releases dropped resources and replays pending context resets.
    pub fn handle_dirty_context(&mut self) {
        self.purge_releases();
        if !self.reset_bits.is_empty() {
            log::trace!("resetting backend state {:?}", self.reset_bits);
            self.backend.on_reset_context(self.reset_bits);
            self.reset_bits = BackendState::empty();
            self.reset_timestamp += 1;
        }
    }

    /// Records that `state` was changed outside this layer.
    pub fn mark_context_dirty(&mut self, state: BackendState) {
        self.reset_bits |= state;
    }

    /// Bumped each time the backend re-validates its state.
    #[inline]
    pub fn reset_timestamp(&self) -> u64 {
        self.reset_timestamp
    }

    /// The backend objects are gone (device loss). Drops everything that
    /// refers to them; resources are recreated on demand.
    pub fn context_abandoned(&mut self) {
        log::warn!("gpu context abandoned");
        self.release_geometry();
        self.vertex_pool = None;
        self.index_pool = None;
        self.quad_index_buffer = None;
        self.stencil_cache.clear();
        self.reset_bits = BackendState::all();
    }

    // ── draw state ────────────────────────────────────────────────────────

    /// `None` restores the default state.
    pub fn set_draw_state(&mut self, state: Option<Rc<DrawState>>) {
        self.draw_state = state.unwrap_or_else(|| self.default_draw_state.clone());
    }

    #[inline]
    pub fn draw_state(&self) -> &Rc<DrawState> {
        &self.draw_state
    }

    fn purge_releases(&mut self) {
        for id in self.releases.drain() {
            self.backend.release_resource(id);
        }
    }
}

impl<B: Backend> Drop for Gpu<B> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        self.release_geometry();
        self.quad_index_buffer = None;
        self.vertex_pool = None;
        self.index_pool = None;
        self.stencil_cache.clear();
        self.draw_state = self.default_draw_state.clone();
        self.purge_releases();
    }
}
