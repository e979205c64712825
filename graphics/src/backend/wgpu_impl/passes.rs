//! Clears, fills, resolves and blits encoded as small render passes.
//!
//! Fills and blits draw one fullscreen triangle. The blit shader box-filters
//! with `textureLoad`, so float targets that cannot be filtered by a sampler
//! are handled the same way as 8-bit ones.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::WgpuBackend;
use super::conversion::{convert_color, convert_texture_format};
use crate::backend::GpuTexture;
use crate::backend::dummy::MAX_TAPS;
use crate::error::{RenderError, RenderResult};
use crate::types::{Color, Rect, Region, TextureDescriptor};

const FULLSCREEN_VERTEX: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    return vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, 0.0, 1.0);
}
"#;

const BLIT_FRAGMENT: &str = r#"
struct BlitParams {
    origin: vec2<f32>,
    extent: vec2<f32>,
    target_size: vec2<f32>,
    max_taps: vec2<f32>,
};

@group(0) @binding(0) var source: texture_2d<f32>;
@group(0) @binding(1) var<uniform> params: BlitParams;

@fragment
fn fs_main(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32> {
    let scale = params.extent / params.target_size;
    let start = params.origin + floor(position.xy) * scale;
    let size = vec2<i32>(textureDimensions(source));
    let taps = vec2<i32>(params.max_taps);
    let first = min(vec2<i32>(max(floor(start), vec2<f32>(0.0))), size - vec2<i32>(1));
    let end = vec2<i32>(ceil(start + scale));
    let last = min(min(max(end, first + vec2<i32>(1)), size), first + taps);

    var sum = vec4<f32>(0.0);
    for (var y = first.y; y < last.y; y = y + 1) {
        for (var x = first.x; x < last.x; x = x + 1) {
            sum = sum + textureLoad(source, vec2<i32>(x, y), 0);
        }
    }
    return sum / f32((last.x - first.x) * (last.y - first.y));
}
"#;

const FILL_FRAGMENT: &str = r#"
@group(0) @binding(0) var<uniform> color: vec4<f32>;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return color;
}
"#;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct BlitParams {
    origin: [f32; 2],
    extent: [f32; 2],
    target_size: [f32; 2],
    max_taps: [f32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum PipelineKind {
    Blit,
    Fill,
}

pub(super) fn create_blit_resources(
    device: &wgpu::Device,
) -> (wgpu::ShaderModule, wgpu::BindGroupLayout) {
    let source = format!("{FULLSCREEN_VERTEX}{BLIT_FRAGMENT}");
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Blit Shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Blit Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            uniform_entry(1),
        ],
    });
    (shader, layout)
}

pub(super) fn create_fill_resources(
    device: &wgpu::Device,
) -> (wgpu::ShaderModule, wgpu::BindGroupLayout) {
    let source = format!("{FULLSCREEN_VERTEX}{FILL_FRAGMENT}");
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Fill Shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Fill Bind Group Layout"),
        entries: &[uniform_entry(0)],
    });
    (shader, layout)
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_view(texture: &GpuTexture) -> RenderResult<&Arc<wgpu::TextureView>> {
    match texture {
        GpuTexture::Wgpu { view, .. } => Ok(view),
        _ => Err(RenderError::Backend(
            "wgpu backend called with non-Wgpu texture".to_string(),
        )),
    }
}

fn color_attachment<'a>(
    view: &'a wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
    resolve_target: Option<&'a wgpu::TextureView>,
) -> Option<wgpu::RenderPassColorAttachment<'a>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target,
        ops: wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    })
}

impl WgpuBackend {
    /// Get or build the pipeline of `kind` drawing into `format`.
    fn pipeline(
        &self,
        kind: PipelineKind,
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Arc<wgpu::RenderPipeline> {
        let mut pipelines = self.pipelines.lock();
        pipelines
            .entry((kind, format, sample_count))
            .or_insert_with(|| {
                let (shader, layout, label) = match kind {
                    PipelineKind::Blit => (&self.blit_shader, &self.blit_layout, "Blit Pipeline"),
                    PipelineKind::Fill => (&self.fill_shader, &self.fill_layout, "Fill Pipeline"),
                };
                log::debug!("Creating {label} for {format:?} x{sample_count}");
                let pipeline_layout =
                    self.device
                        .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                            label: Some(label),
                            bind_group_layouts: &[layout],
                            immediate_size: 0,
                        });
                Arc::new(
                    self.device
                        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                            label: Some(label),
                            layout: Some(&pipeline_layout),
                            vertex: wgpu::VertexState {
                                module: shader,
                                entry_point: Some("vs_main"),
                                buffers: &[],
                                compilation_options: wgpu::PipelineCompilationOptions::default(),
                            },
                            fragment: Some(wgpu::FragmentState {
                                module: shader,
                                entry_point: Some("fs_main"),
                                targets: &[Some(wgpu::ColorTargetState {
                                    format,
                                    blend: None,
                                    write_mask: wgpu::ColorWrites::ALL,
                                })],
                                compilation_options: wgpu::PipelineCompilationOptions::default(),
                            }),
                            primitive: wgpu::PrimitiveState::default(),
                            depth_stencil: None,
                            multisample: wgpu::MultisampleState {
                                count: sample_count,
                                mask: !0,
                                alpha_to_coverage_enabled: false,
                            },
                            multiview_mask: None,
                            cache: None,
                        }),
                )
            })
            .clone()
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    pub fn clear_color(
        &self,
        target: &GpuTexture,
        _descriptor: &TextureDescriptor,
        color: Color,
    ) -> RenderResult<()> {
        let view = texture_view(target)?;
        let mut encoder = self.encoder("Clear Encoder");
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Clear Pass"),
            color_attachments: &[color_attachment(
                view,
                wgpu::LoadOp::Clear(convert_color(color)),
                None,
            )],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        self.submit(encoder);
        Ok(())
    }

    pub fn clear_depth(
        &self,
        target: &GpuTexture,
        _descriptor: &TextureDescriptor,
        depth: f32,
    ) -> RenderResult<()> {
        let view = texture_view(target)?;
        let mut encoder = self.encoder("Clear Depth Encoder");
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Clear Depth Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(depth),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        self.submit(encoder);
        Ok(())
    }

    /// `rect` must already be clipped to the target.
    pub fn fill_rect(
        &self,
        target: &GpuTexture,
        descriptor: &TextureDescriptor,
        rect: Rect,
        color: Color,
    ) -> RenderResult<()> {
        let view = texture_view(target)?;
        let pipeline = self.pipeline(
            PipelineKind::Fill,
            convert_texture_format(descriptor.format),
            descriptor.sample_count,
        );
        let uniform = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Fill Color"),
                contents: bytemuck::bytes_of(&color.to_array()),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Fill Bind Group"),
            layout: &self.fill_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            }],
        });

        let mut encoder = self.encoder("Fill Encoder");
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Fill Pass"),
                color_attachments: &[color_attachment(view, wgpu::LoadOp::Load, None)],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_scissor_rect(rect.x, rect.y, rect.width, rect.height);
            pass.draw(0..3, 0..1);
        }
        self.submit(encoder);
        Ok(())
    }

    pub fn resolve(
        &self,
        source: &GpuTexture,
        destination: &GpuTexture,
        _destination_desc: &TextureDescriptor,
    ) -> RenderResult<()> {
        let source = texture_view(source)?;
        let destination = texture_view(destination)?;
        let mut encoder = self.encoder("Resolve Encoder");
        self.encode_resolve(&mut encoder, source, destination);
        self.submit(encoder);
        Ok(())
    }

    pub(super) fn encode_resolve(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::TextureView,
        destination: &wgpu::TextureView,
    ) {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Resolve Pass"),
            color_attachments: &[color_attachment(
                source,
                wgpu::LoadOp::Load,
                Some(destination),
            )],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    pub fn blit(
        &self,
        source: &GpuTexture,
        _source_desc: &TextureDescriptor,
        region: Region,
        destination: &GpuTexture,
        destination_desc: &TextureDescriptor,
    ) -> RenderResult<()> {
        let source = texture_view(source)?;
        let destination = texture_view(destination)?;
        let mut encoder = self.encoder("Blit Encoder");
        self.encode_blit(
            &mut encoder,
            source,
            region,
            destination,
            convert_texture_format(destination_desc.format),
            (destination_desc.width, destination_desc.height),
        );
        self.submit(encoder);
        Ok(())
    }

    pub(super) fn encode_blit(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::TextureView,
        region: Region,
        destination: &wgpu::TextureView,
        format: wgpu::TextureFormat,
        (width, height): (u32, u32),
    ) {
        let pipeline = self.pipeline(PipelineKind::Blit, format, 1);
        let params = BlitParams {
            origin: [region.x, region.y],
            extent: [region.width, region.height],
            target_size: [width as f32, height as f32],
            max_taps: [MAX_TAPS as f32; 2],
        };
        let uniform = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Blit Params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blit Bind Group"),
            layout: &self.blit_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: uniform.as_entire_binding(),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Blit Pass"),
            color_attachments: &[color_attachment(
                destination,
                wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                None,
            )],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
