use std::cell::RefCell;
use std::rc::Rc;

use super::handle::ReleaseToken;
use super::{PixelConfig, ResourceId, StencilBuffer, SurfaceDesc};

/// Something that can be drawn into.
///
/// The stencil attachment is a shared handle: several targets of the same
/// size and sample count may reference one `StencilBuffer`, which lives as
/// long as any of them does.
#[derive(Debug)]
pub struct RenderTarget {
    token: ReleaseToken,
    width: u32,
    height: u32,
    sample_count: u32,
    config: PixelConfig,
    stencil: RefCell<Option<Rc<StencilBuffer>>>,
}

impl RenderTarget {
    pub(crate) fn new(
        token: ReleaseToken,
        width: u32,
        height: u32,
        sample_count: u32,
        config: PixelConfig,
    ) -> Self {
        Self {
            token,
            width,
            height,
            sample_count,
            config,
            stencil: RefCell::new(None),
        }
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.token.id()
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// MSAA sample count; 0 means not multisampled.
    #[inline]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    #[inline]
    pub fn config(&self) -> PixelConfig {
        self.config
    }

    #[inline]
    pub fn stencil_buffer(&self) -> Option<Rc<StencilBuffer>> {
        self.stencil.borrow().clone()
    }

    #[inline]
    pub fn has_stencil_buffer(&self) -> bool {
        self.stencil.borrow().is_some()
    }

    pub(crate) fn set_stencil_buffer(&self, stencil: Option<Rc<StencilBuffer>>) {
        *self.stencil.borrow_mut() = stencil;
    }
}

/// Sampled texture, optionally renderable.
#[derive(Debug)]
pub struct Texture {
    token: ReleaseToken,
    desc: SurfaceDesc,
    render_target: Option<Rc<RenderTarget>>,
}

impl Texture {
    pub(crate) fn new(
        token: ReleaseToken,
        desc: SurfaceDesc,
        render_target: Option<Rc<RenderTarget>>,
    ) -> Self {
        Self {
            token,
            desc,
            render_target,
        }
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.token.id()
    }

    #[inline]
    pub fn desc(&self) -> &SurfaceDesc {
        &self.desc
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.desc.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.desc.height
    }

    #[inline]
    pub fn config(&self) -> PixelConfig {
        self.desc.config
    }

    #[inline]
    pub fn as_render_target(&self) -> Option<&Rc<RenderTarget>> {
        self.render_target.as_ref()
    }
}
