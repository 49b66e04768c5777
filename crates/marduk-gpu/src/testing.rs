//! Recording backend for unit tests.

use std::collections::{HashMap, HashSet};

use crate::backend::{Backend, BackendState, BackendTexture, Caps};
use crate::coords::{Color, IRect};
use crate::draw::{BoundGeometry, DrawInfo, DrawState, DrawType, PathTransformType, ScissorState};
use crate::gpu::{Gpu, GpuOptions};
use crate::logging::{init_logging, LoggingConfig};
use crate::resource::{
    BackendRenderTargetDesc, BackendTextureDesc, BufferKind, Path, PathDesc, PathRange, PixelConfig,
    RenderTarget, ResourceId, StencilBuffer, SurfaceDesc, Texture,
};
use crate::trace::TraceMarker;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    ResetContext(BackendState),
    Release(ResourceId),
    CreateTexture { width: u32, height: u32, render_target: bool },
    CreateCompressedTexture { width: u32, height: u32 },
    WrapTexture(u64),
    WrapRenderTarget(u64),
    CreateBuffer { id: ResourceId, kind: BufferKind, size: usize },
    CreateStencil { target: ResourceId, width: u32, height: u32 },
    AttachStencil { stencil: ResourceId, target: ResourceId },
    CreatePath(ResourceId),
    CreatePathRange { id: ResourceId, len: usize },
    MapBuffer(ResourceId),
    UnmapBuffer(ResourceId),
    UpdateBuffer { id: ResourceId, offset: usize, len: usize },
    FlushState(DrawType),
    SubmitDraw { vertex_buffer: ResourceId, base_vertex: usize, index_buffer: Option<ResourceId>, base_index: usize },
    StencilPath(ResourceId),
    DrawPath(ResourceId),
    DrawPaths { range: ResourceId, indices: Vec<u32>, transforms: usize },
    Clear { target: ResourceId, rect: Option<IRect>, color: Color },
    ClearStencil(ResourceId),
    ClearStencilClip { target: ResourceId, rect: IRect, inside_clip: bool },
    ReadPixels { target: ResourceId, rect: IRect },
    WritePixels { texture: ResourceId, rect: IRect },
    Resolve(ResourceId),
    AddMarker(TraceMarker),
    RemoveMarker(TraceMarker),
}

pub(crate) struct MockBackend {
    pub caps: Caps,
    pub calls: Vec<Call>,
    pub buffers: HashMap<ResourceId, Vec<u8>>,
    pub destroyed: HashSet<ResourceId>,
    pub map_supported: bool,
    pub fail_texture_creation: bool,
    pub fail_buffer_creation: bool,
    pub fail_stencil_creation: bool,
    pub fail_stencil_attach: bool,
    pub fail_path_creation: bool,
    pub reject_flush: bool,
    pub read_fill: u8,
    next_id: u64,
}

impl MockBackend {
    pub fn new() -> Self {
        let mut caps = Caps::default();
        for config in [PixelConfig::Alpha8, PixelConfig::Rgba8888, PixelConfig::Bgra8888] {
            caps.set_config_texturable(config, true);
            caps.set_config_renderable(config, false, true);
            caps.set_config_renderable(config, true, true);
        }
        caps.set_config_texturable(PixelConfig::Etc1, true);
        caps.set_config_texturable(PixelConfig::RgbaFloat, true);
        caps.npot_texture_tile_support = true;
        caps.gpu_tracing_support = true;
        caps.max_sample_count = 4;

        Self {
            caps,
            calls: Vec::new(),
            buffers: HashMap::new(),
            destroyed: HashSet::new(),
            map_supported: true,
            fail_texture_creation: false,
            fail_buffer_creation: false,
            fail_stencil_creation: false,
            fail_stencil_attach: false,
            fail_path_creation: false,
            reject_flush: false,
            read_fill: 0,
            next_id: 1,
        }
    }

    fn alloc_id(&mut self) -> ResourceId {
        let id = ResourceId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn buffer_data(&self, id: ResourceId) -> &[u8] {
        self.buffers.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Simulates the object disappearing underneath the layer (device loss).
    pub fn destroy(&mut self, id: ResourceId) {
        self.destroyed.insert(id);
    }

    fn backend_texture(&mut self, render_target: bool) -> BackendTexture {
        let texture = self.alloc_id();
        let render_target = render_target.then(|| self.alloc_id());
        BackendTexture { texture, render_target }
    }
}

impl Backend for MockBackend {
    fn caps(&self) -> &Caps {
        &self.caps
    }

    fn on_reset_context(&mut self, dirty: BackendState) {
        self.calls.push(Call::ResetContext(dirty));
    }

    fn release_resource(&mut self, id: ResourceId) {
        self.buffers.remove(&id);
        self.calls.push(Call::Release(id));
    }

    fn was_destroyed(&self, id: ResourceId) -> bool {
        self.destroyed.contains(&id)
    }

    fn create_texture(
        &mut self,
        desc: &SurfaceDesc,
        _data: Option<&[u8]>,
        _row_bytes: usize,
    ) -> Option<BackendTexture> {
        self.calls.push(Call::CreateTexture {
            width: desc.width,
            height: desc.height,
            render_target: desc.is_render_target(),
        });
        if self.fail_texture_creation {
            return None;
        }
        Some(self.backend_texture(desc.is_render_target()))
    }

    fn create_compressed_texture(&mut self, desc: &SurfaceDesc, _data: Option<&[u8]>) -> Option<BackendTexture> {
        self.calls.push(Call::CreateCompressedTexture { width: desc.width, height: desc.height });
        if self.fail_texture_creation {
            return None;
        }
        Some(self.backend_texture(false))
    }

    fn wrap_backend_texture(&mut self, desc: &BackendTextureDesc) -> Option<BackendTexture> {
        self.calls.push(Call::WrapTexture(desc.handle));
        Some(self.backend_texture(desc.flags.contains(crate::resource::SurfaceFlags::RENDER_TARGET)))
    }

    fn wrap_backend_render_target(&mut self, desc: &BackendRenderTargetDesc) -> Option<ResourceId> {
        self.calls.push(Call::WrapRenderTarget(desc.handle));
        Some(self.alloc_id())
    }

    fn create_buffer(&mut self, kind: BufferKind, size: usize, _dynamic: bool) -> Option<ResourceId> {
        if self.fail_buffer_creation {
            return None;
        }
        let id = self.alloc_id();
        self.buffers.insert(id, vec![0; size]);
        self.calls.push(Call::CreateBuffer { id, kind, size });
        Some(id)
    }

    fn create_stencil_buffer(&mut self, target: &RenderTarget, width: u32, height: u32) -> Option<ResourceId> {
        self.calls.push(Call::CreateStencil { target: target.id(), width, height });
        if self.fail_stencil_creation {
            return None;
        }
        Some(self.alloc_id())
    }

    fn map_buffer(&mut self, buffer: ResourceId) -> Option<&mut [u8]> {
        self.calls.push(Call::MapBuffer(buffer));
        if !self.map_supported {
            return None;
        }
        self.buffers.get_mut(&buffer).map(Vec::as_mut_slice)
    }

    fn unmap_buffer(&mut self, buffer: ResourceId) {
        self.calls.push(Call::UnmapBuffer(buffer));
    }

    fn update_buffer(&mut self, buffer: ResourceId, offset: usize, data: &[u8]) -> bool {
        self.calls.push(Call::UpdateBuffer { id: buffer, offset, len: data.len() });
        match self.buffers.get_mut(&buffer) {
            Some(contents) if offset + data.len() <= contents.len() => {
                contents[offset..offset + data.len()].copy_from_slice(data);
                true
            }
            _ => false,
        }
    }

    fn create_path(&mut self, _desc: &PathDesc) -> Option<ResourceId> {
        if self.fail_path_creation {
            return None;
        }
        let id = self.alloc_id();
        self.calls.push(Call::CreatePath(id));
        Some(id)
    }

    fn create_path_range(&mut self, paths: &[PathDesc]) -> Option<ResourceId> {
        if self.fail_path_creation {
            return None;
        }
        let id = self.alloc_id();
        self.calls.push(Call::CreatePathRange { id, len: paths.len() });
        Some(id)
    }

    fn attach_stencil_buffer(&mut self, stencil: &StencilBuffer, target: &RenderTarget) -> bool {
        self.calls.push(Call::AttachStencil { stencil: stencil.id(), target: target.id() });
        !self.fail_stencil_attach
    }

    fn flush_state(
        &mut self,
        draw_type: DrawType,
        _state: &DrawState,
        _scissor: &ScissorState,
        _dst_copy: Option<&Texture>,
    ) -> bool {
        self.calls.push(Call::FlushState(draw_type));
        !self.reject_flush
    }

    fn submit_draw(&mut self, _info: &DrawInfo, geometry: &BoundGeometry) {
        self.calls.push(Call::SubmitDraw {
            vertex_buffer: geometry.vertex.buffer.id(),
            base_vertex: geometry.vertex.base_vertex,
            index_buffer: geometry.index.as_ref().map(|i| i.buffer.id()),
            base_index: geometry.index.as_ref().map_or(0, |i| i.base_index),
        });
    }

    fn stencil_path(&mut self, path: &Path) {
        self.calls.push(Call::StencilPath(path.id()));
    }

    fn draw_path(&mut self, path: &Path) {
        self.calls.push(Call::DrawPath(path.id()));
    }

    fn draw_paths(
        &mut self,
        range: &PathRange,
        indices: &[u32],
        transforms: &[f32],
        _transform_type: PathTransformType,
    ) {
        self.calls.push(Call::DrawPaths {
            range: range.id(),
            indices: indices.to_vec(),
            transforms: transforms.len(),
        });
    }

    fn clear(&mut self, target: &RenderTarget, rect: Option<IRect>, color: Color, _can_ignore_rect: bool) {
        self.calls.push(Call::Clear { target: target.id(), rect, color });
    }

    fn clear_stencil(&mut self, target: &RenderTarget) {
        self.calls.push(Call::ClearStencil(target.id()));
    }

    fn clear_stencil_clip(&mut self, target: &RenderTarget, rect: IRect, inside_clip: bool) {
        self.calls.push(Call::ClearStencilClip { target: target.id(), rect, inside_clip });
    }

    fn read_pixels(
        &mut self,
        target: &RenderTarget,
        rect: IRect,
        _config: PixelConfig,
        dst: &mut [u8],
        _row_bytes: usize,
    ) -> bool {
        self.calls.push(Call::ReadPixels { target: target.id(), rect });
        dst.fill(self.read_fill);
        true
    }

    fn write_texture_pixels(
        &mut self,
        texture: &Texture,
        rect: IRect,
        config: PixelConfig,
        _src: &[u8],
        _row_bytes: usize,
    ) -> bool {
        self.calls.push(Call::WritePixels { texture: texture.id(), rect });
        config == texture.config()
    }

    fn resolve_render_target(&mut self, target: &RenderTarget) {
        self.calls.push(Call::Resolve(target.id()));
    }

    fn on_add_trace_marker(&mut self, marker: &TraceMarker) {
        self.calls.push(Call::AddMarker(marker.clone()));
    }

    fn on_remove_trace_marker(&mut self, marker: &TraceMarker) {
        self.calls.push(Call::RemoveMarker(marker.clone()));
    }
}

/// Facade over a fresh mock backend with small pools.
pub(crate) fn mock_gpu() -> Gpu<MockBackend> {
    mock_gpu_with(MockBackend::new())
}

pub(crate) fn mock_gpu_with(backend: MockBackend) -> Gpu<MockBackend> {
    init_logging(LoggingConfig {
        env_filter: Some("marduk_gpu=trace".into()),
        is_test: true,
        ..Default::default()
    });
    let options = GpuOptions {
        vertex_pool_block_size: 4096,
        vertex_pool_block_count: 2,
        index_pool_block_size: 1024,
        index_pool_block_count: 2,
    };
    Gpu::new(backend, options)
}
