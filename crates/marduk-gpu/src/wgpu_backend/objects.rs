//! wgpu objects behind resource ids.

use crate::resource::{PixelConfig, SurfaceDesc};

use super::format::{texture_format, wgpu_samples};

pub(super) struct TextureEntry {
    pub texture: wgpu::Texture,
    pub config: PixelConfig,
}

/// Attachments of a render target.
///
/// Multisampled targets render into `color` and resolve into `resolve` at
/// the end of every pass, so `readable` always holds the latest pixels.
pub(super) struct TargetEntry {
    pub color: wgpu::TextureView,
    pub resolve: Option<wgpu::TextureView>,
    /// Single-sampled texture holding the target's pixels, if any.
    pub readable: Option<wgpu::Texture>,
    pub format: wgpu::TextureFormat,
    pub config: PixelConfig,
    pub width: u32,
    pub height: u32,
    /// wgpu sample count (1 when not multisampled).
    pub samples: u32,
    pub stencil: Option<crate::resource::ResourceId>,
}

pub(super) struct BufferEntry {
    pub buffer: wgpu::Buffer,
    /// CPU copy of the contents, padded to wgpu's copy alignment.
    pub shadow: Vec<u8>,
    /// Size the buffer was requested with.
    pub size: usize,
}

pub(super) struct StencilEntry {
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
}

pub(super) const STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

#[inline]
pub(super) fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

#[inline]
pub(super) fn align_up(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

/// Creates the sampled texture for `desc`.
pub(super) fn create_texture(device: &wgpu::Device, desc: &SurfaceDesc) -> Option<wgpu::Texture> {
    let format = texture_format(desc.config)?;

    let mut usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
    if !desc.config.is_compressed() {
        usage |= wgpu::TextureUsages::COPY_SRC;
    }
    if desc.is_render_target() {
        usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }

    Some(device.create_texture(&wgpu::TextureDescriptor {
        label: Some("marduk texture"),
        size: extent(desc.width, desc.height),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    }))
}

/// Render target over `texture`, with an MSAA color buffer when
/// `sample_count` asks for one.
pub(super) fn create_target(
    device: &wgpu::Device,
    texture: &wgpu::Texture,
    config: PixelConfig,
    sample_count: u32,
) -> TargetEntry {
    let samples = wgpu_samples(sample_count);
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let (color, resolve) = if samples > 1 && texture.sample_count() == 1 {
        let msaa = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("marduk msaa color"),
            size: texture.size(),
            mip_level_count: 1,
            sample_count: samples,
            dimension: wgpu::TextureDimension::D2,
            format: texture.format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        (msaa.create_view(&wgpu::TextureViewDescriptor::default()), Some(view))
    } else {
        (view, None)
    };

    let readable = (texture.sample_count() == 1
        && texture.usage().contains(wgpu::TextureUsages::COPY_SRC))
    .then(|| texture.clone());

    TargetEntry {
        color,
        resolve,
        readable,
        format: texture.format(),
        config,
        width: texture.width(),
        height: texture.height(),
        samples: texture.sample_count().max(samples),
        stencil: None,
    }
}

pub(super) fn create_stencil(device: &wgpu::Device, width: u32, height: u32, samples: u32) -> StencilEntry {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("marduk stencil"),
        size: extent(width, height),
        mip_level_count: 1,
        sample_count: samples,
        dimension: wgpu::TextureDimension::D2,
        format: STENCIL_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    StencilEntry {
        view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
        width,
        height,
        samples,
    }
}

pub(super) fn create_buffer(device: &wgpu::Device, usage: wgpu::BufferUsages, size: usize) -> BufferEntry {
    let padded = align_up(size.max(1), wgpu::COPY_BUFFER_ALIGNMENT as usize);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("marduk buffer"),
        size: padded as u64,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    BufferEntry {
        buffer,
        shadow: vec![0; padded],
        size,
    }
}

/// Writes `data` into the shadow at `offset` and uploads the covering
/// aligned range. Returns false if the range is out of bounds.
pub(super) fn update_buffer(queue: &wgpu::Queue, entry: &mut BufferEntry, offset: usize, data: &[u8]) -> bool {
    let end = offset + data.len();
    if end > entry.size {
        return false;
    }
    entry.shadow[offset..end].copy_from_slice(data);

    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
    let start = offset / align * align;
    let stop = align_up(end, align).min(entry.shadow.len());
    if stop > start {
        queue.write_buffer(&entry.buffer, start as u64, &entry.shadow[start..stop]);
    }
    true
}

/// Uploads tightly or `row_bytes`-strided pixel data into `texture`.
///
/// Returns false when `data` is too short for the region.
pub(super) fn write_region(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    origin: (u32, u32),
    size: (u32, u32),
    data: &[u8],
    row_bytes: usize,
) -> bool {
    let format = texture.format();
    let (bw, bh) = format.block_dimensions();
    let Some(block_bytes) = format.block_copy_size(None) else { return false };

    let blocks_wide = size.0.div_ceil(bw) as usize;
    let blocks_high = size.1.div_ceil(bh) as usize;
    let tight = blocks_wide * block_bytes as usize;
    let row_bytes = if row_bytes == 0 { tight } else { row_bytes };
    if row_bytes < tight || blocks_high == 0 || data.len() < row_bytes * (blocks_high - 1) + tight {
        return false;
    }

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: origin.0,
                y: origin.1,
                z: 0,
            },
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(row_bytes as u32),
            rows_per_image: Some(blocks_high as u32),
        },
        extent(size.0, size.1),
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_multiples() {
        assert_eq!(align_up(0, 4), 0);
        assert_eq!(align_up(1, 4), 4);
        assert_eq!(align_up(8, 4), 8);
        assert_eq!(align_up(257, 256), 512);
    }
}
