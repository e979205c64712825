//! # Showroom Demos
//!
//! Binaries driving the showroom renderer.
//!
//! ## Available Demos
//!
//! - `shot` - Render the demo scene off-screen and capture it to image files
//! - `preview` - Show the demo scene in a window with live setting toggles

pub mod args;
pub mod scene;

pub use args::{CliBackend, CliFormat};
pub use scene::ShowroomScene;

/// Demos library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with `info` as the default filter.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
