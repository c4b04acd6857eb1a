use std::borrow::Cow;

use wgpu::naga::ShaderStage;
use wgpu::util::DeviceExt;

use crate::error::RenderError;
use crate::program::LinkedProgram;

/// Corners of the full-screen quad, drawn as a 4-vertex triangle strip.
pub(crate) const QUAD_VERTICES: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

pub(crate) const QUAD_VERTEX_COUNT: u32 = 4;

/// GPU objects created from a linked program.
pub(crate) struct HeroPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub quad_buffer: Option<wgpu::Buffer>,
    pub uniform_buffer: wgpu::Buffer,
    pub uniform_bind_group: wgpu::BindGroup,
    pub uniform_group: u32,
}

impl HeroPipeline {
    /// Turns the linked program into a render pipeline. Validation errors
    /// raised by the device while doing so are reported as link failures.
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
        program: &LinkedProgram,
    ) -> Result<Self, RenderError> {
        let uniforms = program.uniforms();
        let (group, binding) = uniforms.binding();
        if group != 0 {
            return Err(RenderError::LinkFailure {
                log: format!("uniform block must live in group 0, found group {group}"),
            });
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("hero vertex"),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Owned(program.vertex().source().to_owned()),
                stage: ShaderStage::Vertex,
                defines: &[],
            },
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("hero fragment"),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Owned(program.fragment().source().to_owned()),
                stage: ShaderStage::Fragment,
                defines: &[],
            },
        });

        let uniform_size = uniforms.block_size().max(16).div_ceil(16) * 16;
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("hero uniforms"),
            size: uniform_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("hero uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("hero uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("hero pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let position_attribute = program.position_location().map(|location| {
            [wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 0,
                shader_location: location,
            }]
        });
        let vertex_buffers: Vec<wgpu::VertexBufferLayout<'_>> = position_attribute
            .as_ref()
            .map(|attributes| wgpu::VertexBufferLayout {
                array_stride: (2 * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .into_iter()
            .collect();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("hero pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &vertex_buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let quad_buffer = program.position_location().map(|_| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("hero quad"),
                contents: bytemuck::cast_slice(&QUAD_VERTICES),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            let log = err.to_string();
            tracing::error!("pipeline creation failed:\n{log}");
            return Err(RenderError::LinkFailure { log });
        }

        Ok(Self {
            pipeline,
            quad_buffer,
            uniform_buffer,
            uniform_bind_group,
            uniform_group: group,
        })
    }
}
