use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

use crate::backend::GpuBackend;
use crate::error::{DrawError, RenderError};
use crate::program::{LinkedProgram, UniformBlock};
use crate::types::Antialiasing;

use super::context::GpuContext;
use super::pipeline::{HeroPipeline, QUAD_VERTEX_COUNT};

/// `wgpu` implementation of [`GpuBackend`] drawing into a window surface.
pub struct WgpuBackend {
    context: GpuContext,
    pipeline: Option<HeroPipeline>,
    multisample_target: Option<MultisampleTarget>,
}

struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("hero msaa target"),
            size: extent,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }

    fn for_context(context: &GpuContext) -> Option<Self> {
        (context.sample_count > 1 && !context.is_empty()).then(|| {
            Self::new(
                &context.device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        })
    }
}

impl WgpuBackend {
    /// Acquires a GPU context for `target`. Any failure along the way
    /// (no adapter, no device, unsupported surface) is reported as
    /// [`RenderError::ContextUnavailable`].
    ///
    /// The caller must keep `target` alive for as long as the backend.
    pub fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        antialiasing: Antialiasing,
    ) -> Result<Self, RenderError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size, antialiasing)
            .map_err(|err| RenderError::ContextUnavailable(format!("{err:#}")))?;
        let multisample_target = MultisampleTarget::for_context(&context);
        Ok(Self {
            context,
            pipeline: None,
            multisample_target,
        })
    }

    pub fn sample_count(&self) -> u32 {
        self.context.sample_count
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.context.surface_format
    }
}

impl GpuBackend for WgpuBackend {
    fn configure(&mut self, size: PhysicalSize<u32>) {
        self.context.resize(size);
        self.multisample_target = MultisampleTarget::for_context(&self.context);
    }

    fn install_program(&mut self, program: &LinkedProgram) -> Result<(), RenderError> {
        let pipeline = HeroPipeline::new(
            &self.context.device,
            self.context.surface_format,
            self.context.sample_count,
            program,
        )?;
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn upload_uniforms(&mut self, block: &UniformBlock) {
        let Some(pipeline) = self.pipeline.as_ref() else {
            return;
        };
        let bytes = block.as_bytes();
        if bytes.is_empty() {
            return;
        }
        self.context
            .queue
            .write_buffer(&pipeline.uniform_buffer, 0, bytes);
    }

    fn draw(&mut self) -> Result<(), DrawError> {
        if self.context.is_empty() {
            return Ok(());
        }
        let Some(pipeline) = self.pipeline.as_ref() else {
            return Ok(());
        };

        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("hero encoder"),
                });

        {
            let (attachment_view, resolve_target) =
                if let Some(msaa) = self.multisample_target.as_ref() {
                    (&msaa.view, Some(&view))
                } else {
                    (&view, None)
                };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("hero pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_viewport(
                0.0,
                0.0,
                self.context.config.width as f32,
                self.context.config.height as f32,
                0.0,
                1.0,
            );
            render_pass.set_pipeline(&pipeline.pipeline);
            render_pass.set_bind_group(pipeline.uniform_group, &pipeline.uniform_bind_group, &[]);
            if let Some(quad) = pipeline.quad_buffer.as_ref() {
                render_pass.set_vertex_buffer(0, quad.slice(..));
            }
            render_pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
        }

        self.context.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}
