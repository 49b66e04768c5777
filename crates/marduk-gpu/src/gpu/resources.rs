use std::rc::Rc;

use super::Gpu;
use crate::backend::{Backend, BackendTexture};
use crate::error::{GpuError, GpuResult};
use crate::resource::{
    BackendRenderTargetDesc, BackendTextureDesc, BufferKind, GpuBuffer, RenderTarget,
    StencilBuffer, StencilKey, SurfaceDesc, SurfaceFlags, Texture,
};

impl<B: Backend> Gpu<B> {
    // ── textures ──────────────────────────────────────────────────────────

    /// Creates a texture, attaching a stencil buffer to render targets unless
    /// `SurfaceFlags::NO_STENCIL` is set.
    ///
    /// Unsupported configs are rejected before the backend is called.
    /// Compressed configs take `data` as tightly packed blocks and ignore
    /// `row_bytes`.
    pub fn create_texture(
        &mut self,
        desc: &SurfaceDesc,
        data: Option<&[u8]>,
        row_bytes: usize,
    ) -> GpuResult<Rc<Texture>> {
        let compressed = desc.config.is_compressed();
        let caps = self.backend.caps();
        if !caps.is_config_texturable(desc.config) {
            return Err(GpuError::ConfigNotTexturable(desc.config));
        }
        if desc.is_render_target() && !caps.is_config_renderable(desc.config, desc.is_multisampled()) {
            return Err(GpuError::ConfigNotRenderable {
                config: desc.config,
                multisampled: desc.is_multisampled(),
            });
        }
        if compressed {
            assert!(
                !desc.is_render_target(),
                "compressed config {:?} cannot be a render target",
                desc.config
            );
        }
        if compressed
            && !caps.npot_texture_tile_support
            && !(desc.width.is_power_of_two() && desc.height.is_power_of_two())
        {
            return Err(GpuError::NonPowerOfTwoUnsupported {
                width: desc.width,
                height: desc.height,
            });
        }

        self.handle_dirty_context();
        let created = if compressed {
            self.backend.create_compressed_texture(desc, data)
        } else {
            self.backend.create_texture(desc, data, row_bytes)
        };
        let created = created.ok_or(GpuError::CreationFailed("texture"))?;
        log::debug!(
            "created texture {} ({}x{} {:?}, render target: {})",
            created.texture,
            desc.width,
            desc.height,
            desc.config,
            created.render_target.is_some()
        );

        let texture = self.adopt_texture(*desc, created);
        if desc.wants_stencil() {
            self.attach_stencil_or_destroy(texture)
        } else {
            Ok(texture)
        }
    }

    /// Wraps a texture created outside this layer. A wrapped texture with a
    /// render target always gets a stencil buffer.
    pub fn wrap_backend_texture(&mut self, desc: &BackendTextureDesc) -> GpuResult<Rc<Texture>> {
        self.handle_dirty_context();
        let created = self
            .backend
            .wrap_backend_texture(desc)
            .ok_or(GpuError::CreationFailed("wrapped texture"))?;

        let surface = SurfaceDesc {
            flags: desc.flags,
            origin: desc.origin,
            width: desc.width,
            height: desc.height,
            config: desc.config,
            sample_count: desc.sample_count,
        };
        // Wrapped render targets always get a stencil; `NO_STENCIL` only
        // applies to textures this layer creates.
        let texture = self.adopt_texture(surface, created);
        self.attach_stencil_or_destroy(texture)
    }

    /// Wraps a render target created outside this layer. Its stencil, if
    /// any, is owned by the caller.
    pub fn wrap_backend_render_target(
        &mut self,
        desc: &BackendRenderTargetDesc,
    ) -> GpuResult<Rc<RenderTarget>> {
        self.handle_dirty_context();
        let id = self
            .backend
            .wrap_backend_render_target(desc)
            .ok_or(GpuError::CreationFailed("wrapped render target"))?;
        Ok(Rc::new(RenderTarget::new(
            self.releases.token(id),
            desc.width,
            desc.height,
            desc.sample_count,
            desc.config,
        )))
    }

    /// Descriptor for a texture that can receive a copy of `src`.
    pub fn copy_surface_dst_desc(&self, src: &Texture) -> SurfaceDesc {
        SurfaceDesc {
            origin: src.desc().origin,
            ..SurfaceDesc::render_target(src.width(), src.height(), src.config())
        }
        .with_flags(SurfaceFlags::NO_STENCIL)
    }

    // ── buffers ───────────────────────────────────────────────────────────

    pub fn create_vertex_buffer(&mut self, size: usize, dynamic: bool) -> GpuResult<Rc<GpuBuffer>> {
        self.create_buffer(BufferKind::Vertex, size, dynamic)
    }

    pub fn create_index_buffer(&mut self, size: usize, dynamic: bool) -> GpuResult<Rc<GpuBuffer>> {
        self.create_buffer(BufferKind::Index, size, dynamic)
    }

    fn create_buffer(&mut self, kind: BufferKind, size: usize, dynamic: bool) -> GpuResult<Rc<GpuBuffer>> {
        self.handle_dirty_context();
        let id = self
            .backend
            .create_buffer(kind, size, dynamic)
            .ok_or(GpuError::CreationFailed("buffer"))?;
        Ok(Rc::new(GpuBuffer::new(self.releases.token(id), kind, size, dynamic)))
    }

    // ── stencil ───────────────────────────────────────────────────────────

    /// Gives `target` a stencil buffer, sharing a live one of the same size
    /// and sample count when possible.
    ///
    /// Panics if `target` already has a stencil buffer. On failure the
    /// target is left without one.
    pub fn attach_stencil_buffer_to_render_target(&mut self, target: &RenderTarget) -> GpuResult<()> {
        assert!(
            !target.has_stencil_buffer(),
            "render target {} already has a stencil buffer",
            target.id()
        );
        self.handle_dirty_context();

        let key = StencilKey {
            width: target.width(),
            height: target.height(),
            sample_count: target.sample_count(),
        };

        if let Some(stencil) = self.stencil_cache.find(key) {
            log::debug!("stencil cache hit {} for target {}", stencil.id(), target.id());
            target.set_stencil_buffer(Some(stencil.clone()));
            if self.backend.attach_stencil_buffer(&stencil, target) {
                return Ok(());
            }
            target.set_stencil_buffer(None);
            log::warn!("failed to attach shared stencil {} to {}", stencil.id(), target.id());
            return Err(GpuError::StencilAttachFailed);
        }

        log::debug!("stencil cache miss for {key:?}");
        let id = self
            .backend
            .create_stencil_buffer(target, key.width, key.height)
            .ok_or(GpuError::CreationFailed("stencil buffer"))?;
        let stencil = Rc::new(StencilBuffer::new(self.releases.token(id), key));

        target.set_stencil_buffer(Some(stencil.clone()));
        if !self.backend.attach_stencil_buffer(&stencil, target) {
            target.set_stencil_buffer(None);
            log::warn!("failed to attach new stencil {} to {}", stencil.id(), target.id());
            return Err(GpuError::StencilAttachFailed);
        }
        self.stencil_cache.insert(&stencil);

        // Only new buffers are cleared. A shared buffer keeps whatever the
        // other targets left in it.
        self.backend.clear_stencil(target);
        Ok(())
    }

    /// Stencil buffers still referenced by some render target.
    pub fn live_stencil_buffer_count(&self) -> usize {
        self.stencil_cache.live_count()
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn adopt_texture(&self, desc: SurfaceDesc, created: BackendTexture) -> Rc<Texture> {
        let render_target = created.render_target.map(|id| {
            Rc::new(RenderTarget::new(
                self.releases.token(id),
                desc.width,
                desc.height,
                desc.sample_count,
                desc.config,
            ))
        });
        Rc::new(Texture::new(self.releases.token(created.texture), desc, render_target))
    }

    fn attach_stencil_or_destroy(&mut self, texture: Rc<Texture>) -> GpuResult<Rc<Texture>> {
        let Some(target) = texture.as_render_target().cloned() else {
            return Ok(texture);
        };
        if let Err(err) = self.attach_stencil_buffer_to_render_target(&target) {
            log::warn!("destroying texture {}: {err}", texture.id());
            drop(target);
            drop(texture);
            self.purge_releases();
            return Err(err);
        }
        Ok(texture)
    }
}
