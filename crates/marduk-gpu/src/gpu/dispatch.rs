use std::rc::Rc;

use super::Gpu;
use crate::backend::Backend;
use crate::coords::{Color, IRect};
use crate::draw::{BoundGeometry, DrawInfo, IndexBinding, ScissorState, VertexBinding};
use crate::error::{GpuError, GpuResult};
use crate::geometry::{IndexSource, VertexSource};
use crate::resource::{PixelConfig, RenderTarget, Texture};

impl<B: Backend> Gpu<B> {
    // ── draws ─────────────────────────────────────────────────────────────

    /// Draws from the current geometry source with the current draw state.
    ///
    /// If the backend cannot flush the state for this draw, nothing is drawn.
    /// Panics if the draw needs a vertex or index source that is not set.
    pub fn draw(&mut self, info: &DrawInfo, scissor: &ScissorState) {
        self.handle_dirty_context();
        self.finalize_reserved_geometry();
        let geometry = self.bound_geometry(info);

        let state = self.draw_state.clone();
        if !self
            .backend
            .flush_state(info.draw_type(), &state, scissor, info.dst_copy.as_deref())
        {
            log::trace!("skipping {:?} draw: state flush failed", info.primitive);
            return;
        }
        log::trace!(
            "draw {:?}: {} vertices, {} indices",
            info.primitive,
            info.vertex_count,
            info.index_count
        );
        self.backend.submit_draw(info, &geometry);
    }

    fn bound_geometry(&self, info: &DrawInfo) -> BoundGeometry {
        let top = self.geometry.top();
        let vertex = match &top.vertex {
            VertexSource::Reserved { stride, slot, .. } => VertexBinding {
                buffer: slot.buffer.clone(),
                base_vertex: slot.start,
                stride: *stride,
            },
            VertexSource::Buffer { buffer, stride } => VertexBinding {
                buffer: buffer.clone(),
                base_vertex: 0,
                stride: *stride,
            },
            VertexSource::None => panic!("draw without a vertex source"),
        };

        let index = if info.is_indexed() {
            Some(match &top.index {
                IndexSource::Reserved { slot, .. } => IndexBinding {
                    buffer: slot.buffer.clone(),
                    base_index: slot.start,
                },
                IndexSource::Buffer(buffer) => IndexBinding {
                    buffer: buffer.clone(),
                    base_index: 0,
                },
                IndexSource::None => panic!("indexed draw without an index source"),
            })
        } else {
            None
        };

        BoundGeometry { vertex, index }
    }

    // ── clears ────────────────────────────────────────────────────────────

    /// Clears `rect` (or the whole target) of `target`, defaulting to the
    /// draw state's render target.
    pub fn clear(
        &mut self,
        rect: Option<IRect>,
        color: Color,
        can_ignore_rect: bool,
        target: Option<&Rc<RenderTarget>>,
    ) {
        let Some(target) = self.resolve_target(target) else {
            log::debug!("clear without a render target ignored");
            return;
        };
        self.handle_dirty_context();
        self.backend.clear(&target, rect, color, can_ignore_rect);
    }

    /// Sets the stencil clip bit inside `rect` to `inside_clip`.
    pub fn clear_stencil_clip(&mut self, rect: IRect, inside_clip: bool, target: Option<&Rc<RenderTarget>>) {
        let Some(target) = self.resolve_target(target) else {
            log::debug!("stencil clip clear without a render target ignored");
            return;
        };
        self.handle_dirty_context();
        self.backend.clear_stencil_clip(&target, rect, inside_clip);
    }

    fn resolve_target(&self, target: Option<&Rc<RenderTarget>>) -> Option<Rc<RenderTarget>> {
        target.cloned().or_else(|| self.draw_state.render_target.clone())
    }

    // ── pixel transfer ────────────────────────────────────────────────────

    pub fn read_pixels(
        &mut self,
        target: &RenderTarget,
        rect: IRect,
        config: PixelConfig,
        dst: &mut [u8],
        row_bytes: usize,
    ) -> GpuResult<()> {
        self.handle_dirty_context();
        if self.backend.read_pixels(target, rect, config, dst, row_bytes) {
            Ok(())
        } else {
            Err(GpuError::ReadPixelsFailed)
        }
    }

    pub fn write_texture_pixels(
        &mut self,
        texture: &Texture,
        rect: IRect,
        config: PixelConfig,
        src: &[u8],
        row_bytes: usize,
    ) -> GpuResult<()> {
        self.handle_dirty_context();
        if self.backend.write_texture_pixels(texture, rect, config, src, row_bytes) {
            Ok(())
        } else {
            Err(GpuError::WritePixelsFailed)
        }
    }

    /// Resolves a multisampled target into its sampled texture.
    pub fn resolve_render_target(&mut self, target: &RenderTarget) {
        self.handle_dirty_context();
        self.backend.resolve_render_target(target);
    }
}
