//! Backend interface.
//!
//! A backend owns the actual graphics objects and performs the
//! hardware-affecting work. The facade (`Gpu`) validates requests, keeps the
//! shared bookkeeping, and calls into this trait; it never depends on a
//! concrete backend type.
//!
//! Backends identify objects by `ResourceId`. Handles given back to callers
//! wrap those ids, and `release_resource` is called once per id when the
//! last handle is gone.

mod caps;

pub use caps::{BackendState, Caps};

use crate::coords::{Color, IRect};
use crate::draw::{BoundGeometry, DrawInfo, DrawState, DrawType, PathTransformType, ScissorState};
use crate::resource::{
    BackendRenderTargetDesc, BackendTextureDesc, BufferKind, Path, PathDesc, PathRange, PixelConfig,
    RenderTarget, ResourceId, StencilBuffer, SurfaceDesc, Texture,
};
use crate::trace::TraceMarker;

/// Ids of a newly created or wrapped texture.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BackendTexture {
    pub texture: ResourceId,
    /// Present when the texture was created renderable.
    pub render_target: Option<ResourceId>,
}

pub trait Backend {
    fn caps(&self) -> &Caps;

    /// Re-validate the given pieces of state before the next operation.
    fn on_reset_context(&mut self, dirty: BackendState);

    /// The last handle to `id` was dropped.
    fn release_resource(&mut self, id: ResourceId);

    /// True if the object behind `id` no longer exists (e.g. after device loss).
    fn was_destroyed(&self, id: ResourceId) -> bool;

    // ── creation ──────────────────────────────────────────────────────────

    fn create_texture(
        &mut self,
        desc: &SurfaceDesc,
        data: Option<&[u8]>,
        row_bytes: usize,
    ) -> Option<BackendTexture>;

    fn create_compressed_texture(
        &mut self,
        desc: &SurfaceDesc,
        data: Option<&[u8]>,
    ) -> Option<BackendTexture>;

    fn wrap_backend_texture(&mut self, desc: &BackendTextureDesc) -> Option<BackendTexture>;

    fn wrap_backend_render_target(&mut self, desc: &BackendRenderTargetDesc) -> Option<ResourceId>;

    fn create_buffer(&mut self, kind: BufferKind, size: usize, dynamic: bool) -> Option<ResourceId>;

    fn create_stencil_buffer(
        &mut self,
        target: &RenderTarget,
        width: u32,
        height: u32,
    ) -> Option<ResourceId>;

    /// Only called when `Caps::path_rendering_support` is set.
    fn create_path(&mut self, desc: &PathDesc) -> Option<ResourceId>;

    fn create_path_range(&mut self, paths: &[PathDesc]) -> Option<ResourceId>;

    // ── buffer data ───────────────────────────────────────────────────────

    /// Direct CPU access to the buffer contents, if the backend can map.
    fn map_buffer(&mut self, buffer: ResourceId) -> Option<&mut [u8]>;

    fn unmap_buffer(&mut self, buffer: ResourceId);

    fn update_buffer(&mut self, buffer: ResourceId, offset: usize, data: &[u8]) -> bool;

    // ── draw / state ──────────────────────────────────────────────────────

    fn attach_stencil_buffer(&mut self, stencil: &StencilBuffer, target: &RenderTarget) -> bool;

    /// Prepares pipeline, target, and scissor state. Returning false skips
    /// the draw.
    fn flush_state(
        &mut self,
        draw_type: DrawType,
        state: &DrawState,
        scissor: &ScissorState,
        dst_copy: Option<&Texture>,
    ) -> bool;

    fn submit_draw(&mut self, info: &DrawInfo, geometry: &BoundGeometry);

    // ── paths ─────────────────────────────────────────────────────────────
    //
    // Called after a successful `flush_state` with the matching path
    // `DrawType`.

    /// Writes the path's coverage into the stencil buffer only.
    fn stencil_path(&mut self, path: &Path);

    /// Stencils the path, then covers it with the flushed draw state.
    fn draw_path(&mut self, path: &Path);

    /// `transforms` holds `transform_type.components()` floats per index.
    fn draw_paths(
        &mut self,
        range: &PathRange,
        indices: &[u32],
        transforms: &[f32],
        transform_type: PathTransformType,
    );

    /// `rect = None` clears the whole target. With `can_ignore_rect` the
    /// backend may clear more than `rect` if that is cheaper.
    fn clear(&mut self, target: &RenderTarget, rect: Option<IRect>, color: Color, can_ignore_rect: bool);

    fn clear_stencil(&mut self, target: &RenderTarget);

    /// Sets the clip bit inside `rect` to `inside_clip`.
    fn clear_stencil_clip(&mut self, target: &RenderTarget, rect: IRect, inside_clip: bool);

    // ── pixel transfer ────────────────────────────────────────────────────

    fn read_pixels(
        &mut self,
        target: &RenderTarget,
        rect: IRect,
        config: PixelConfig,
        dst: &mut [u8],
        row_bytes: usize,
    ) -> bool;

    fn write_texture_pixels(
        &mut self,
        texture: &Texture,
        rect: IRect,
        config: PixelConfig,
        src: &[u8],
        row_bytes: usize,
    ) -> bool;

    fn resolve_render_target(&mut self, target: &RenderTarget);

    // ── instrumentation ───────────────────────────────────────────────────

    fn on_add_trace_marker(&mut self, marker: &TraceMarker);

    fn on_remove_trace_marker(&mut self, marker: &TraceMarker);
}
