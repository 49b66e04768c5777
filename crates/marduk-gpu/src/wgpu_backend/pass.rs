//! Render passes: solid draws, clears, and stencil clears.

use bytemuck::{Pod, Zeroable};

use crate::coords::{Color, IRect};
use crate::draw::{BoundGeometry, DrawInfo, DrawState, ScissorState};
use crate::resource::{RenderTarget, ResourceId};

use super::objects::TargetEntry;
use super::pipeline::{topology, PipelineKey, SolidUniform};
use super::WgpuBackend;

/// Stencil value that marks pixels inside the clip.
pub(super) const CLIP_BIT: u32 = 0x80;

/// State accepted by `flush_state` for the next `submit_draw`.
pub(super) struct PendingDraw {
    pub target: ResourceId,
    pub color: Color,
    pub scissor: Option<(u32, u32, u32, u32)>,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ClearVertex {
    pos: [f32; 2],
}

/// Clamps `rect` to the target bounds as wgpu scissor arguments.
///
/// Returns `None` for an empty intersection.
fn clamp_rect(rect: IRect, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let bounds = IRect::from_size(width, height);
    let r = rect.intersect(bounds)?;
    if r.is_empty() {
        return None;
    }
    Some((r.x as u32, r.y as u32, r.width as u32, r.height as u32))
}

fn color_attachment(entry: &TargetEntry, load: wgpu::LoadOp<wgpu::Color>) -> wgpu::RenderPassColorAttachment<'_> {
    wgpu::RenderPassColorAttachment {
        view: &entry.color,
        resolve_target: entry.resolve.as_ref(),
        ops: wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    }
}

fn to_wgpu_color(color: Color) -> wgpu::Color {
    wgpu::Color {
        r: color.r as f64,
        g: color.g as f64,
        b: color.b as f64,
        a: color.a as f64,
    }
}

impl WgpuBackend {
    fn encoder(&self, label: &'static str) -> wgpu::CommandEncoder {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
        if !self.trace_markers.is_empty() {
            encoder.push_debug_group(&self.trace_markers.joined_labels());
        }
        encoder
    }

    fn submit(&self, mut encoder: wgpu::CommandEncoder) {
        if !self.trace_markers.is_empty() {
            encoder.pop_debug_group();
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    // ── draws ─────────────────────────────────────────────────────────────

    pub(super) fn flush_draw_state(&mut self, state: &DrawState, scissor: &ScissorState) -> bool {
        self.pending = None;

        let Some(target) = state.render_target.as_ref() else {
            log::trace!("flush rejected: no render target");
            return false;
        };
        let Some(entry) = self.targets.get(&target.id()) else {
            log::warn!("flush rejected: unknown render target {}", target.id());
            return false;
        };
        if !self.blendable[entry.config.index()] {
            log::debug!("flush rejected: {:?} is not blendable", entry.config);
            return false;
        }

        let scissor = if scissor.enabled {
            match clamp_rect(scissor.rect, entry.width, entry.height) {
                Some(rect) => Some(rect),
                None => {
                    log::trace!("flush rejected: scissor is empty");
                    return false;
                }
            }
        } else {
            None
        };

        self.pending = Some(PendingDraw {
            target: target.id(),
            color: state.color,
            scissor,
        });
        true
    }

    pub(super) fn submit_solid_draw(&mut self, info: &DrawInfo, geometry: &BoundGeometry) {
        let Some(pending) = self.pending.take() else {
            log::warn!("submit_draw without a flushed state");
            return;
        };
        let Some(topology) = topology(info.primitive) else {
            log::warn!("{:?} draws are not supported by the wgpu backend", info.primitive);
            return;
        };
        let stride = geometry.vertex.stride;
        if stride < 8 || stride % 4 != 0 {
            log::warn!("unsupported vertex stride {stride}");
            return;
        }
        let Some(entry) = self.targets.get(&pending.target) else { return };
        let Some(vertices) = self.buffers.get(&geometry.vertex.buffer.id()) else {
            log::warn!("unknown vertex buffer {}", geometry.vertex.buffer.id());
            return;
        };
        let indices = match &geometry.index {
            Some(binding) => match self.buffers.get(&binding.buffer.id()) {
                Some(indices) => Some((indices, binding.base_index)),
                None => {
                    log::warn!("unknown index buffer {}", binding.buffer.id());
                    return;
                }
            },
            None => None,
        };

        let strip = matches!(
            topology,
            wgpu::PrimitiveTopology::TriangleStrip | wgpu::PrimitiveTopology::LineStrip
        );
        let key = PipelineKey {
            format: entry.format,
            samples: entry.samples,
            topology,
            strip_index_format: (strip && indices.is_some()).then_some(wgpu::IndexFormat::Uint16),
            stride: stride as u64,
            blend: true,
        };

        self.pipelines.write_uniform(
            &self.queue,
            &SolidUniform {
                viewport: [entry.width as f32, entry.height as f32],
                _pad: [0.0; 2],
                color: pending.color.to_array(),
            },
        );
        let pipeline = self.pipelines.get(&self.device, key).clone();

        let mut encoder = self.encoder("marduk draw encoder");
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("marduk draw pass"),
                color_attachments: &[Some(color_attachment(entry, wgpu::LoadOp::Load))],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_pipeline(&pipeline);
            rpass.set_bind_group(0, self.pipelines.bind_group(), &[]);
            rpass.set_vertex_buffer(0, vertices.buffer.slice(..));
            if let Some((x, y, w, h)) = pending.scissor {
                rpass.set_scissor_rect(x, y, w, h);
            }

            let base_vertex = geometry.vertex.base_vertex + info.start_vertex;
            match indices {
                Some((indices, base_index)) => {
                    let first = (base_index + info.start_index) as u32;
                    rpass.set_index_buffer(indices.buffer.slice(..), wgpu::IndexFormat::Uint16);
                    rpass.draw_indexed(first..first + info.index_count as u32, base_vertex as i32, 0..1);
                }
                None => {
                    let first = base_vertex as u32;
                    rpass.draw(first..first + info.vertex_count as u32, 0..1);
                }
            }
        }
        self.submit(encoder);
    }

    // ── clears ────────────────────────────────────────────────────────────

    pub(super) fn clear_target(&mut self, target: &RenderTarget, rect: Option<IRect>, color: Color, can_ignore_rect: bool) {
        let Some(entry) = self.targets.get(&target.id()) else {
            log::warn!("clear of unknown render target {}", target.id());
            return;
        };

        let partial = match rect {
            Some(rect) if !can_ignore_rect => {
                let bounds = IRect::from_size(entry.width, entry.height);
                if rect.contains(bounds) {
                    None
                } else {
                    match clamp_rect(rect, entry.width, entry.height) {
                        Some(clamped) => Some(clamped),
                        None => return,
                    }
                }
            }
            _ => None,
        };

        let Some((x, y, w, h)) = partial else {
            let mut encoder = self.encoder("marduk clear encoder");
            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("marduk clear pass"),
                color_attachments: &[Some(color_attachment(entry, wgpu::LoadOp::Clear(to_wgpu_color(color))))],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            self.submit(encoder);
            return;
        };

        // Partial clears replace the pixels with an unblended quad.
        let (x0, y0) = (x as f32, y as f32);
        let (x1, y1) = ((x + w) as f32, (y + h) as f32);
        let quad = [
            ClearVertex { pos: [x0, y0] },
            ClearVertex { pos: [x1, y0] },
            ClearVertex { pos: [x1, y1] },
            ClearVertex { pos: [x0, y0] },
            ClearVertex { pos: [x1, y1] },
            ClearVertex { pos: [x0, y1] },
        ];
        self.queue.write_buffer(&self.clear_quad, 0, bytemuck::cast_slice(&quad));
        self.pipelines.write_uniform(
            &self.queue,
            &SolidUniform {
                viewport: [entry.width as f32, entry.height as f32],
                _pad: [0.0; 2],
                color: color.to_array(),
            },
        );
        let key = PipelineKey {
            format: entry.format,
            samples: entry.samples,
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            stride: std::mem::size_of::<ClearVertex>() as u64,
            blend: false,
        };
        let pipeline = self.pipelines.get(&self.device, key).clone();

        let mut encoder = self.encoder("marduk clear encoder");
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("marduk partial clear pass"),
                color_attachments: &[Some(color_attachment(entry, wgpu::LoadOp::Load))],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            rpass.set_pipeline(&pipeline);
            rpass.set_bind_group(0, self.pipelines.bind_group(), &[]);
            rpass.set_vertex_buffer(0, self.clear_quad.slice(..));
            rpass.draw(0..quad.len() as u32, 0..1);
        }
        self.submit(encoder);
    }

    /// Clears the whole stencil attachment of `target` to `value`.
    pub(super) fn clear_stencil_value(&mut self, target: &RenderTarget, value: u32) {
        let Some(stencil) = self
            .targets
            .get(&target.id())
            .and_then(|entry| entry.stencil)
            .and_then(|id| self.stencils.get(&id))
        else {
            log::debug!("stencil clear on {} without a stencil attachment", target.id());
            return;
        };

        let mut encoder = self.encoder("marduk stencil clear encoder");
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("marduk stencil clear pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &stencil.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(value),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        self.submit(encoder);
    }

    pub(super) fn clear_stencil_clip_rect(&mut self, target: &RenderTarget, rect: IRect, inside_clip: bool) {
        if !rect.contains(IRect::from_size(target.width(), target.height())) {
            // TODO: clear only `rect` once draws carry a stencil-writing pipeline.
            log::debug!("stencil clip clear of {rect:?} widened to the whole target {}", target.id());
        }
        self.clear_stencil_value(target, if inside_clip { CLIP_BIT } else { 0 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_rect_clips_to_bounds() {
        assert_eq!(clamp_rect(IRect::new(-4, -4, 10, 10), 8, 8), Some((0, 0, 6, 6)));
        assert_eq!(clamp_rect(IRect::new(6, 6, 10, 10), 8, 8), Some((6, 6, 2, 2)));
        assert_eq!(clamp_rect(IRect::new(9, 0, 4, 4), 8, 8), None);
    }
}
