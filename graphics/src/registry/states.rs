//! Shared device state blocks.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::device::GraphicsDevice;
use crate::error::RenderResult;
use crate::resources::{Buffer, Sampler};
use crate::types::{AddressMode, BufferDescriptor, BufferUsage, SamplerDescriptor};

/// Samplers every effect ends up needing.
#[derive(Debug)]
pub struct CommonStates {
    pub linear_clamp: Arc<Sampler>,
    pub point_clamp: Arc<Sampler>,
    pub linear_wrap: Arc<Sampler>,
}

impl CommonStates {
    pub(crate) fn new(device: &Arc<GraphicsDevice>) -> RenderResult<Self> {
        Ok(Self {
            linear_clamp: device.create_sampler(&SamplerDescriptor::linear().with_label("linear clamp"))?,
            point_clamp: device.create_sampler(&SamplerDescriptor::nearest().with_label("point clamp"))?,
            linear_wrap: device.create_sampler(
                &SamplerDescriptor::linear()
                    .with_address_mode(AddressMode::Repeat)
                    .with_label("linear wrap"),
            )?,
        })
    }
}

/// Vertex of the full-screen quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub tex_coord: [f32; 2],
}

/// Full-screen quad vertices in clip space, top-left first.
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex {
        position: [-1.0, 1.0],
        tex_coord: [0.0, 0.0],
    },
    QuadVertex {
        position: [1.0, 1.0],
        tex_coord: [1.0, 0.0],
    },
    QuadVertex {
        position: [-1.0, -1.0],
        tex_coord: [0.0, 1.0],
    },
    QuadVertex {
        position: [1.0, -1.0],
        tex_coord: [1.0, 1.0],
    },
];

/// Two triangles covering the quad.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

/// Shared vertex and index buffers for full-screen passes.
#[derive(Debug)]
pub struct QuadBuffers {
    pub vertices: Arc<Buffer>,
    pub indices: Arc<Buffer>,
}

impl QuadBuffers {
    pub(crate) fn new(device: &Arc<GraphicsDevice>) -> RenderResult<Self> {
        let vertex_bytes: &[u8] = bytemuck::cast_slice(&QUAD_VERTICES);
        let index_bytes: &[u8] = bytemuck::cast_slice(&QUAD_INDICES);
        Ok(Self {
            vertices: device.create_buffer_init(
                &BufferDescriptor::for_contents(vertex_bytes, BufferUsage::VERTEX)
                    .with_label("quad vertices"),
                vertex_bytes,
            )?,
            indices: device.create_buffer_init(
                &BufferDescriptor::for_contents(index_bytes, BufferUsage::INDEX)
                    .with_label("quad indices"),
                index_bytes,
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceParameters;
    use crate::types::FilterMode;

    fn create_test_device() -> Arc<GraphicsDevice> {
        GraphicsDevice::new(&DeviceParameters::dummy()).unwrap()
    }

    #[test]
    fn test_common_states() {
        let states = CommonStates::new(&create_test_device()).unwrap();
        assert_eq!(states.point_clamp.filter(), FilterMode::Nearest);
        assert_eq!(states.linear_clamp.address_mode(), AddressMode::ClampToEdge);
        assert_eq!(states.linear_wrap.address_mode(), AddressMode::Repeat);
    }

    #[test]
    fn test_quad_buffers_sized_for_contents() {
        let quad = QuadBuffers::new(&create_test_device()).unwrap();
        assert_eq!(quad.vertices.size(), 64);
        assert_eq!(quad.indices.size(), 12);
        assert!(quad.indices.descriptor().usage.contains(BufferUsage::COPY_DST));
    }
}
