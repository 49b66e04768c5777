use std::rc::Rc;

use crate::coords::Color;
use crate::resource::RenderTarget;

/// Bundle of configuration active for a draw call.
///
/// Only the pieces this layer reasons about are modeled: the vertex layout
/// stride recorded by buffer-backed sources, the render target, and the solid
/// color used by backends without a program system.
#[derive(Debug, Clone)]
pub struct DrawState {
    pub vertex_stride: usize,
    pub render_target: Option<Rc<RenderTarget>>,
    pub color: Color,
}

impl DrawState {
    /// Two `f32` positions per vertex.
    pub const DEFAULT_VERTEX_STRIDE: usize = 2 * std::mem::size_of::<f32>();

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_render_target(mut self, target: Rc<RenderTarget>) -> Self {
        self.render_target = Some(target);
        self
    }

    pub fn with_vertex_stride(mut self, stride: usize) -> Self {
        self.vertex_stride = stride;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            vertex_stride: Self::DEFAULT_VERTEX_STRIDE,
            render_target: None,
            color: Color::opaque_black(),
        }
    }
}
