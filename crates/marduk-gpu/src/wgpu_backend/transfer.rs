//! Pixel readback and texture uploads.

use std::sync::mpsc::channel;

use crate::coords::IRect;
use crate::resource::{PixelConfig, RenderTarget, Texture};

use super::objects::{align_up, extent, write_region};
use super::WgpuBackend;

impl WgpuBackend {
    /// Copies `rect` of `target` into `dst`, `row_bytes` apart.
    ///
    /// No format conversion happens: `config` must match the target.
    pub(super) fn read_target_pixels(
        &mut self,
        target: &RenderTarget,
        rect: IRect,
        config: PixelConfig,
        dst: &mut [u8],
        row_bytes: usize,
    ) -> bool {
        let Some(entry) = self.targets.get(&target.id()) else { return false };
        let Some(texture) = entry.readable.as_ref() else {
            log::debug!("render target {} cannot be read back", target.id());
            return false;
        };
        if config != entry.config {
            log::debug!("read_pixels: {config:?} differs from target config {:?}", entry.config);
            return false;
        }
        let Some(bpp) = config.bytes_per_pixel() else { return false };
        if rect.is_empty() || !IRect::from_size(entry.width, entry.height).contains(rect) {
            return false;
        }

        let (width, height) = (rect.width as u32, rect.height as u32);
        let tight = width as usize * bpp;
        let row_bytes = if row_bytes == 0 { tight } else { row_bytes };
        if row_bytes < tight || dst.len() < row_bytes * (height as usize - 1) + tight {
            return false;
        }
        let padded = align_up(tight, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize);

        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("marduk readback"),
            size: (padded * height as usize) as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("marduk readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: rect.x as u32,
                    y: rect.y as u32,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded as u32),
                    rows_per_image: Some(height),
                },
            },
            extent(width, height),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (sender, receiver) = channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            drop(sender.send(res));
        });
        if let Err(err) = self.device.poll(wgpu::PollType::wait_indefinitely()) {
            log::warn!("read_pixels: device poll failed: {err}");
            return false;
        }
        match receiver.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                log::warn!("read_pixels: map failed: {err}");
                return false;
            }
            Err(_) => {
                log::warn!("read_pixels: map callback dropped");
                return false;
            }
        }

        {
            let mapped = slice.get_mapped_range();
            for row in 0..height as usize {
                let src = &mapped[row * padded..row * padded + tight];
                dst[row * row_bytes..row * row_bytes + tight].copy_from_slice(src);
            }
        }
        readback.unmap();
        true
    }

    /// Uploads `src` into `rect` of `texture`. `config` must match the
    /// texture; compressed textures only take data at creation.
    pub(super) fn write_texture_region(
        &mut self,
        texture: &Texture,
        rect: IRect,
        config: PixelConfig,
        src: &[u8],
        row_bytes: usize,
    ) -> bool {
        let Some(entry) = self.textures.get(&texture.id()) else { return false };
        if config != entry.config || config.is_compressed() {
            return false;
        }
        if rect.is_empty() || !IRect::from_size(texture.width(), texture.height()).contains(rect) {
            return false;
        }
        write_region(
            &self.queue,
            &entry.texture,
            (rect.x as u32, rect.y as u32),
            (rect.width as u32, rect.height as u32),
            src,
            row_bytes,
        )
    }
}
