//! Renderer error types.

use std::fmt;

/// Errors that can occur in the renderer core.
#[derive(Debug)]
pub enum RenderError {
    /// Failed to create the GPU device.
    DeviceCreationFailed(String),
    /// The device does not reach the feature level a renderer requires.
    FeatureLevelUnsupported {
        required: crate::device::FeatureLevel,
        actual: crate::device::FeatureLevel,
    },
    /// Failed to create a resource.
    ResourceCreationFailed(String),
    /// An `initialize_*` method was called on an already initialized renderer.
    AlreadyInitialized,
    /// The renderer has not been initialized yet.
    NotInitialized,
    /// The renderer or registry was disposed.
    Disposed,
    /// An invalid parameter was provided.
    InvalidParameter(String),
    /// Nothing is stored in the registry for the requested type.
    MissingSlot(&'static str),
    /// Swap chain creation, resize or presentation failed.
    SwapChain(String),
    /// Reading texture contents back to the CPU failed.
    Readback(String),
    /// Encoding a captured frame failed.
    Encoding(image::ImageError),
    /// Writing to the output stream failed.
    Io(std::io::Error),
    /// A backend operation failed.
    Backend(String),
    /// The operation was cancelled by the caller.
    Cancelled,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceCreationFailed(msg) => write!(f, "device creation failed: {msg}"),
            Self::FeatureLevelUnsupported { required, actual } => write!(
                f,
                "feature level {required:?} required, device provides {actual:?}"
            ),
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::AlreadyInitialized => write!(f, "renderer is already initialized"),
            Self::NotInitialized => write!(f, "renderer is not initialized"),
            Self::Disposed => write!(f, "renderer is disposed"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::MissingSlot(name) => write!(f, "nothing registered for {name}"),
            Self::SwapChain(msg) => write!(f, "swap chain error: {msg}"),
            Self::Readback(msg) => write!(f, "readback failed: {msg}"),
            Self::Encoding(err) => write!(f, "encoding failed: {err}"),
            Self::Io(err) => write!(f, "i/o error: {err}"),
            Self::Backend(msg) => write!(f, "backend error: {msg}"),
            Self::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encoding(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        Self::Encoding(err)
    }
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Result alias used throughout the crate.
pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::FeatureLevel;

    #[test]
    fn test_error_display() {
        let err = RenderError::Cancelled;
        assert_eq!(err.to_string(), "operation cancelled");

        let err = RenderError::FeatureLevelUnsupported {
            required: FeatureLevel::Level11_0,
            actual: FeatureLevel::Level10_0,
        };
        assert_eq!(
            err.to_string(),
            "feature level Level11_0 required, device provides Level10_0"
        );
    }

    #[test]
    fn test_error_source() {
        use std::error::Error;

        let err = RenderError::from(std::io::Error::other("disk full"));
        assert!(err.source().is_some());
        assert!(RenderError::NotInitialized.source().is_none());
    }
}
