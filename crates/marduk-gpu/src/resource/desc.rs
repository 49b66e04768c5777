use bitflags::bitflags;

use super::PixelConfig;

bitflags! {
    /// Creation flags for textures.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct SurfaceFlags: u32 {
        /// The texture can be bound as a render target.
        const RENDER_TARGET = 1 << 0;
        /// Do not attach a stencil buffer to the render target.
        const NO_STENCIL = 1 << 1;
    }
}

/// Row order of a surface's pixel storage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum SurfaceOrigin {
    /// Whatever the backend prefers.
    #[default]
    Default,
    TopLeft,
    BottomLeft,
}

/// Describes a texture to create.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceDesc {
    pub flags: SurfaceFlags,
    pub origin: SurfaceOrigin,
    pub width: u32,
    pub height: u32,
    pub config: PixelConfig,
    /// MSAA sample count; 0 means not multisampled.
    pub sample_count: u32,
}

impl SurfaceDesc {
    /// Plain sampled texture.
    pub const fn new(width: u32, height: u32, config: PixelConfig) -> Self {
        Self {
            flags: SurfaceFlags::empty(),
            origin: SurfaceOrigin::Default,
            width,
            height,
            config,
            sample_count: 0,
        }
    }

    /// Texture usable as a render target (stencil attached on creation).
    pub const fn render_target(width: u32, height: u32, config: PixelConfig) -> Self {
        Self {
            flags: SurfaceFlags::RENDER_TARGET,
            ..Self::new(width, height, config)
        }
    }

    #[inline]
    pub fn with_flags(mut self, flags: SurfaceFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[inline]
    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    #[inline]
    pub fn is_render_target(&self) -> bool {
        self.flags.contains(SurfaceFlags::RENDER_TARGET)
    }

    #[inline]
    pub fn wants_stencil(&self) -> bool {
        self.is_render_target() && !self.flags.contains(SurfaceFlags::NO_STENCIL)
    }

    #[inline]
    pub fn is_multisampled(&self) -> bool {
        self.sample_count > 0
    }
}

/// Describes a texture created outside this layer that should be wrapped.
///
/// `handle` is interpreted by the backend (for wgpu, a handle returned by
/// `WgpuBackend::register_external_texture`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BackendTextureDesc {
    pub flags: SurfaceFlags,
    pub origin: SurfaceOrigin,
    pub width: u32,
    pub height: u32,
    pub config: PixelConfig,
    pub sample_count: u32,
    pub handle: u64,
}

/// Describes a render target created outside this layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BackendRenderTargetDesc {
    pub origin: SurfaceOrigin,
    pub width: u32,
    pub height: u32,
    pub config: PixelConfig,
    pub sample_count: u32,
    /// Stencil bits already provided by the external target.
    pub stencil_bits: u32,
    pub handle: u64,
}
