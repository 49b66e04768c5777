//! Solid-color pipelines used for draws and partial clears.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use crate::draw::PrimitiveType;

// ── blend ─────────────────────────────────────────────────────────────────

fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

// ── uniform ───────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct SolidUniform {
    pub viewport: [f32; 2],
    pub _pad: [f32; 2], // 16-byte alignment
    pub color: [f32; 4],
}

fn uniform_min_binding_size() -> Option<std::num::NonZeroU64> {
    std::num::NonZeroU64::new(std::mem::size_of::<SolidUniform>() as u64)
}

// ── topology ──────────────────────────────────────────────────────────────

/// wgpu topology for a primitive type. Fans have no wgpu equivalent.
pub(super) fn topology(primitive: PrimitiveType) -> Option<wgpu::PrimitiveTopology> {
    use wgpu::PrimitiveTopology as T;

    match primitive {
        PrimitiveType::Triangles => Some(T::TriangleList),
        PrimitiveType::TriangleStrip => Some(T::TriangleStrip),
        PrimitiveType::Points => Some(T::PointList),
        PrimitiveType::Lines => Some(T::LineList),
        PrimitiveType::LineStrip => Some(T::LineStrip),
        PrimitiveType::TriangleFan => None,
    }
}

// ── cache ─────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(super) struct PipelineKey {
    pub format: wgpu::TextureFormat,
    pub samples: u32,
    pub topology: wgpu::PrimitiveTopology,
    /// Set for indexed strip draws.
    pub strip_index_format: Option<wgpu::IndexFormat>,
    pub stride: u64,
    pub blend: bool,
}

/// Shader, layouts, and the uniform every solid pipeline reads.
pub(super) struct SolidPipelines {
    shader: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl SolidPipelines {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("marduk solid shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/solid.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("marduk solid bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: uniform_min_binding_size(),
                },
                count: None,
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("marduk solid pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("marduk solid ubo"),
            size: std::mem::size_of::<SolidUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("marduk solid bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            }],
        });

        Self {
            shader,
            layout,
            uniform,
            bind_group,
            pipelines: HashMap::new(),
        }
    }

    #[inline]
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn write_uniform(&self, queue: &wgpu::Queue, uniform: &SolidUniform) {
        queue.write_buffer(&self.uniform, 0, bytemuck::bytes_of(uniform));
    }

    pub fn get(&mut self, device: &wgpu::Device, key: PipelineKey) -> &wgpu::RenderPipeline {
        let shader = &self.shader;
        let layout = &self.layout;
        self.pipelines.entry(key).or_insert_with(|| {
            log::debug!("creating solid pipeline {key:?}");
            create_pipeline(device, shader, layout, key)
        })
    }

    #[inline]
    pub fn cached(&self) -> usize {
        self.pipelines.len()
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    key: PipelineKey,
) -> wgpu::RenderPipeline {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("marduk solid pipeline"),
        layout: Some(layout),

        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: key.stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &ATTRS,
            }],
        },

        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: key.format,
                blend: key.blend.then(premul_alpha_blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: key.topology,
            strip_index_format: key.strip_index_format,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: key.samples,
            ..Default::default()
        },

        multiview_mask: None,
        cache: None,
    })
}
