use std::borrow::Cow;

use crate::compile::validate_stage;
use crate::error::{ShaderCompileError, ShaderStage};

use super::context::GpuSurface;

/// Linked render pipeline for one fragment shader.
pub struct GpuProgram {
    pub(super) pipeline: wgpu::RenderPipeline,
}

impl GpuProgram {
    /// Validates both stages with naga, then builds the pipeline inside a
    /// validation error scope so driver-side link errors surface as
    /// [`ShaderCompileError`] instead of a device panic.
    pub(super) fn new(
        surface: &GpuSurface,
        vertex: &str,
        fragment: &str,
    ) -> Result<Self, ShaderCompileError> {
        validate_stage(vertex, ShaderStage::Vertex)?;
        validate_stage(fragment, ShaderStage::Fragment)?;

        let device = &surface.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = create_module(device, vertex, ShaderStage::Vertex);
        let fragment_module = create_module(device, fragment, ShaderStage::Fragment);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("backdrop pipeline layout"),
            bind_group_layouts: &[&surface.uniform_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("backdrop pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface.format(),
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            tracing::warn!(error = %err, "backdrop pipeline rejected by the driver");
            return Err(ShaderCompileError::new(ShaderStage::Fragment, err.to_string()));
        }

        Ok(Self { pipeline })
    }
}

fn create_module(device: &wgpu::Device, source: &str, stage: ShaderStage) -> wgpu::ShaderModule {
    let label = match stage {
        ShaderStage::Vertex => "backdrop vertex",
        ShaderStage::Fragment => "backdrop fragment",
    };
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_owned()),
            stage: stage.naga(),
            defines: &[],
        },
    })
}
