//! `Backend` implementation on top of wgpu.
//!
//! The device is headless: render targets are textures created through the
//! facade or registered with [`WgpuBackend::register_external_texture`].
//! Draws render the current draw state's color through a small cache of
//! solid-color pipelines, one command buffer per backend call.
//!
//! Limits of this backend:
//! - triangle fans are not drawn
//! - stencil attachments are cleared but draws do not test against them
//! - multisampled targets resolve at the end of every pass

mod format;
mod objects;
mod pass;
mod pipeline;
mod transfer;

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::backend::{Backend, BackendState, BackendTexture, Caps};
use crate::coords::{Color, IRect};
use crate::draw::{BoundGeometry, DrawInfo, DrawState, DrawType, PathTransformType, ScissorState};
use crate::resource::{
    BackendRenderTargetDesc, BackendTextureDesc, BufferKind, Path, PathDesc, PathRange, PixelConfig,
    RenderTarget, ResourceId, StencilBuffer, SurfaceDesc, SurfaceFlags, Texture,
};
use crate::trace::{TraceMarker, TraceMarkerSet};

use format::{probe_caps, texture_format, wgpu_samples};
use objects::{BufferEntry, StencilEntry, TargetEntry, TextureEntry};
use pass::PendingDraw;
use pipeline::SolidPipelines;

/// Initialization parameters for the headless wgpu device.
#[derive(Debug, Clone)]
pub struct WgpuInit {
    pub power_preference: wgpu::PowerPreference,

    /// Use a software adapter if available.
    pub force_fallback_adapter: bool,

    /// Required wgpu features.
    ///
    /// Compressed configs are only reported texturable when their
    /// format's features are listed here.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,
}

impl Default for WgpuInit {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        }
    }
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    caps: Caps,
    /// Per config: solid draws may blend into it.
    blendable: [bool; PixelConfig::COUNT],

    next_id: u64,
    textures: HashMap<ResourceId, TextureEntry>,
    targets: HashMap<ResourceId, TargetEntry>,
    buffers: HashMap<ResourceId, BufferEntry>,
    stencils: HashMap<ResourceId, StencilEntry>,
    /// Buffer currently handed out by `map_buffer`.
    mapped: Option<ResourceId>,

    next_external: u64,
    externals: HashMap<u64, wgpu::Texture>,

    pipelines: SolidPipelines,
    clear_quad: wgpu::Buffer,
    pending: Option<PendingDraw>,
    trace_markers: TraceMarkerSet,
}

impl WgpuBackend {
    /// Creates a headless device, blocking on adapter and device requests.
    pub fn new(init: WgpuInit) -> Result<Self> {
        pollster::block_on(Self::new_async(init))
    }

    pub async fn new_async(init: WgpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: init.force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("marduk-gpu device"),
                required_features: init.required_features,
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let info = adapter.get_info();
        log::info!("wgpu backend on {} ({:?})", info.name, info.backend);

        Ok(Self::from_device(&adapter, device, queue))
    }

    /// Wraps an existing device. `adapter` is only used to probe formats.
    pub fn from_device(adapter: &wgpu::Adapter, device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let (caps, blendable) = probe_caps(adapter, &device);
        let pipelines = SolidPipelines::new(&device);
        let clear_quad = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("marduk clear quad"),
            size: 6 * 2 * std::mem::size_of::<f32>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            device,
            queue,
            caps,
            blendable,
            next_id: 1,
            textures: HashMap::new(),
            targets: HashMap::new(),
            buffers: HashMap::new(),
            stencils: HashMap::new(),
            mapped: None,
            next_external: 1,
            externals: HashMap::new(),
            pipelines,
            clear_quad,
            pending: None,
            trace_markers: TraceMarkerSet::new(),
        }
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Makes `texture` available to `wrap_backend_texture` and
    /// `wrap_backend_render_target` under the returned handle.
    pub fn register_external_texture(&mut self, texture: wgpu::Texture) -> u64 {
        let handle = self.next_external;
        self.next_external += 1;
        self.externals.insert(handle, texture);
        handle
    }

    /// The wgpu texture behind a texture handle.
    pub fn texture(&self, texture: &Texture) -> Option<&wgpu::Texture> {
        self.textures.get(&texture.id()).map(|entry| &entry.texture)
    }

    /// Number of live backend objects.
    pub fn live_objects(&self) -> usize {
        self.textures.len() + self.targets.len() + self.buffers.len() + self.stencils.len()
    }

    fn alloc_id(&mut self) -> ResourceId {
        let id = ResourceId(self.next_id);
        self.next_id += 1;
        id
    }

    fn fits_device(&self, width: u32, height: u32) -> bool {
        let max = self.device.limits().max_texture_dimension_2d;
        width > 0 && height > 0 && width <= max && height <= max
    }

    fn add_texture(&mut self, texture: wgpu::Texture, config: PixelConfig, sample_count: Option<u32>) -> BackendTexture {
        let render_target = sample_count.map(|samples| {
            let target = objects::create_target(&self.device, &texture, config, samples);
            let id = self.alloc_id();
            self.targets.insert(id, target);
            id
        });
        let id = self.alloc_id();
        self.textures.insert(id, TextureEntry { texture, config });
        BackendTexture {
            texture: id,
            render_target,
        }
    }
}

impl Backend for WgpuBackend {
    fn caps(&self) -> &Caps {
        &self.caps
    }

    fn on_reset_context(&mut self, dirty: BackendState) {
        log::trace!("wgpu backend reset: {dirty:?}");
        self.pending = None;
    }

    fn release_resource(&mut self, id: ResourceId) {
        let removed = self.textures.remove(&id).is_some()
            || self.targets.remove(&id).is_some()
            || self.buffers.remove(&id).is_some()
            || self.stencils.remove(&id).is_some();
        if !removed {
            log::warn!("release of unknown resource {id}");
        }
        if self.mapped == Some(id) {
            self.mapped = None;
        }
    }

    fn was_destroyed(&self, id: ResourceId) -> bool {
        !(self.textures.contains_key(&id)
            || self.targets.contains_key(&id)
            || self.buffers.contains_key(&id)
            || self.stencils.contains_key(&id))
    }

    // ── creation ──────────────────────────────────────────────────────────

    fn create_texture(&mut self, desc: &SurfaceDesc, data: Option<&[u8]>, row_bytes: usize) -> Option<BackendTexture> {
        if !self.fits_device(desc.width, desc.height) {
            return None;
        }
        let texture = objects::create_texture(&self.device, desc)?;
        if let Some(data) = data {
            if !objects::write_region(&self.queue, &texture, (0, 0), (desc.width, desc.height), data, row_bytes) {
                log::warn!("create_texture: initial data too short for {}x{}", desc.width, desc.height);
                return None;
            }
        }
        let sample_count = desc.is_render_target().then_some(desc.sample_count);
        Some(self.add_texture(texture, desc.config, sample_count))
    }

    fn create_compressed_texture(&mut self, desc: &SurfaceDesc, data: Option<&[u8]>) -> Option<BackendTexture> {
        let format = texture_format(desc.config)?;
        let (bw, bh) = format.block_dimensions();
        if !self.fits_device(desc.width, desc.height) || desc.width % bw != 0 || desc.height % bh != 0 {
            log::debug!("compressed texture {}x{} does not fit {bw}x{bh} blocks", desc.width, desc.height);
            return None;
        }
        let texture = objects::create_texture(&self.device, desc)?;
        if let Some(data) = data {
            if !objects::write_region(&self.queue, &texture, (0, 0), (desc.width, desc.height), data, 0) {
                return None;
            }
        }
        Some(self.add_texture(texture, desc.config, None))
    }

    fn wrap_backend_texture(&mut self, desc: &BackendTextureDesc) -> Option<BackendTexture> {
        let texture = self.externals.get(&desc.handle)?.clone();
        if texture_format(desc.config) != Some(texture.format()) {
            log::warn!("external texture {} is not {:?}", desc.handle, desc.config);
            return None;
        }
        let render_target = desc.flags.contains(SurfaceFlags::RENDER_TARGET);
        if render_target && !texture.usage().contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
            return None;
        }
        Some(self.add_texture(texture, desc.config, render_target.then_some(desc.sample_count)))
    }

    fn wrap_backend_render_target(&mut self, desc: &BackendRenderTargetDesc) -> Option<ResourceId> {
        let texture = self.externals.get(&desc.handle)?.clone();
        if !texture.usage().contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
            return None;
        }
        let target = objects::create_target(&self.device, &texture, desc.config, desc.sample_count);
        let id = self.alloc_id();
        self.targets.insert(id, target);
        Some(id)
    }

    fn create_buffer(&mut self, kind: BufferKind, size: usize, dynamic: bool) -> Option<ResourceId> {
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        };
        if size as u64 > self.device.limits().max_buffer_size {
            return None;
        }
        let entry = objects::create_buffer(&self.device, usage, size);
        let id = self.alloc_id();
        log::trace!("created {kind:?} buffer {id} ({size} bytes, dynamic: {dynamic})");
        self.buffers.insert(id, entry);
        Some(id)
    }

    fn create_stencil_buffer(&mut self, target: &RenderTarget, width: u32, height: u32) -> Option<ResourceId> {
        let samples = self
            .targets
            .get(&target.id())
            .map_or(wgpu_samples(target.sample_count()), |entry| entry.samples);
        if !self.fits_device(width, height) {
            return None;
        }
        let entry = objects::create_stencil(&self.device, width, height, samples);
        let id = self.alloc_id();
        self.stencils.insert(id, entry);
        Some(id)
    }

    // No path renderer; `probe_caps` leaves `path_rendering_support` off.
    fn create_path(&mut self, _desc: &PathDesc) -> Option<ResourceId> {
        None
    }

    fn create_path_range(&mut self, _paths: &[PathDesc]) -> Option<ResourceId> {
        None
    }

    // ── buffer data ───────────────────────────────────────────────────────

    /// Hands out the CPU shadow; `unmap_buffer` uploads it.
    fn map_buffer(&mut self, buffer: ResourceId) -> Option<&mut [u8]> {
        let entry = self.buffers.get_mut(&buffer)?;
        self.mapped = Some(buffer);
        Some(&mut entry.shadow[..entry.size])
    }

    fn unmap_buffer(&mut self, buffer: ResourceId) {
        if self.mapped.take() != Some(buffer) {
            log::warn!("unmap of buffer {buffer} that is not mapped");
            return;
        }
        if let Some(entry) = self.buffers.get(&buffer) {
            self.queue.write_buffer(&entry.buffer, 0, &entry.shadow);
        }
    }

    fn update_buffer(&mut self, buffer: ResourceId, offset: usize, data: &[u8]) -> bool {
        match self.buffers.get_mut(&buffer) {
            Some(entry) => objects::update_buffer(&self.queue, entry, offset, data),
            None => false,
        }
    }

    // ── draw / state ──────────────────────────────────────────────────────

    fn attach_stencil_buffer(&mut self, stencil: &StencilBuffer, target: &RenderTarget) -> bool {
        let Some(stencil_entry) = self.stencils.get(&stencil.id()) else { return false };
        let Some(target_entry) = self.targets.get_mut(&target.id()) else { return false };
        if stencil_entry.width != target_entry.width
            || stencil_entry.height != target_entry.height
            || stencil_entry.samples != target_entry.samples
        {
            log::debug!("stencil {} does not match target {}", stencil.id(), target.id());
            return false;
        }
        target_entry.stencil = Some(stencil.id());
        true
    }

    fn flush_state(
        &mut self,
        draw_type: DrawType,
        state: &DrawState,
        scissor: &ScissorState,
        _dst_copy: Option<&Texture>,
    ) -> bool {
        log::trace!("flush {draw_type:?}");
        if draw_type.is_path() {
            log::debug!("{draw_type:?} is not supported by the wgpu backend");
            return false;
        }
        self.flush_draw_state(state, scissor)
    }

    fn submit_draw(&mut self, info: &DrawInfo, geometry: &BoundGeometry) {
        self.submit_solid_draw(info, geometry);
    }

    fn stencil_path(&mut self, path: &Path) {
        log::warn!("ignoring stencil of path {}", path.id());
    }

    fn draw_path(&mut self, path: &Path) {
        log::warn!("ignoring draw of path {}", path.id());
    }

    fn draw_paths(
        &mut self,
        range: &PathRange,
        indices: &[u32],
        _transforms: &[f32],
        _transform_type: PathTransformType,
    ) {
        log::warn!("ignoring draw of {} paths from range {}", indices.len(), range.id());
    }

    fn clear(&mut self, target: &RenderTarget, rect: Option<IRect>, color: Color, can_ignore_rect: bool) {
        self.clear_target(target, rect, color, can_ignore_rect);
    }

    fn clear_stencil(&mut self, target: &RenderTarget) {
        self.clear_stencil_value(target, 0);
    }

    fn clear_stencil_clip(&mut self, target: &RenderTarget, rect: IRect, inside_clip: bool) {
        self.clear_stencil_clip_rect(target, rect, inside_clip);
    }

    // ── pixel transfer ────────────────────────────────────────────────────

    fn read_pixels(
        &mut self,
        target: &RenderTarget,
        rect: IRect,
        config: PixelConfig,
        dst: &mut [u8],
        row_bytes: usize,
    ) -> bool {
        self.read_target_pixels(target, rect, config, dst, row_bytes)
    }

    fn write_texture_pixels(
        &mut self,
        texture: &Texture,
        rect: IRect,
        config: PixelConfig,
        src: &[u8],
        row_bytes: usize,
    ) -> bool {
        self.write_texture_region(texture, rect, config, src, row_bytes)
    }

    fn resolve_render_target(&mut self, target: &RenderTarget) {
        // Every pass on a multisampled target already resolves.
        log::trace!("resolve of {} is implicit", target.id());
    }

    // ── instrumentation ───────────────────────────────────────────────────

    fn on_add_trace_marker(&mut self, marker: &TraceMarker) {
        self.trace_markers.add(marker.clone());
    }

    fn on_remove_trace_marker(&mut self, marker: &TraceMarker) {
        self.trace_markers.remove(marker);
    }
}
