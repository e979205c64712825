//! GPU resources.
//!
//! This module contains the GPU resource types that are created by [`GraphicsDevice`]:
//! - [`Buffer`] - GPU memory buffer
//! - [`Texture`] - GPU texture used as render target, depth buffer or image
//! - [`Sampler`] - Texture sampler
//!
//! Resources are reference-counted with [`Arc`] and can be shared across threads.
//! Dropping the last reference releases the backend object.
//!
//! [`GraphicsDevice`]: crate::GraphicsDevice
//! [`Arc`]: std::sync::Arc

mod buffer;
mod sampler;
mod texture;

pub use buffer::Buffer;
pub use sampler::Sampler;
pub use texture::Texture;
