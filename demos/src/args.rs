//! Command line value types shared by the binaries.

use showroom_graphics::{BackendType, ShotFormat};

/// Graphics backend selection for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CliBackend {
    /// Automatically select the best available backend (wgpu preferred).
    #[default]
    Auto,
    /// Cross-platform backend via wgpu.
    Wgpu,
    /// CPU backend for testing and CI environments.
    Dummy,
}

impl From<CliBackend> for BackendType {
    fn from(cli: CliBackend) -> Self {
        match cli {
            CliBackend::Auto => BackendType::Auto,
            CliBackend::Wgpu => BackendType::Wgpu,
            CliBackend::Dummy => BackendType::Dummy,
        }
    }
}

/// Capture file format for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CliFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
    /// 32-bit float OpenEXR.
    Exr,
}

impl CliFormat {
    pub fn to_shot_format(self, quality: u8) -> ShotFormat {
        match self {
            CliFormat::Png => ShotFormat::Png,
            CliFormat::Jpeg => ShotFormat::Jpeg { quality },
            CliFormat::Bmp => ShotFormat::Bmp,
            CliFormat::Exr => ShotFormat::Exr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_mapping() {
        assert_eq!(BackendType::from(CliBackend::Dummy), BackendType::Dummy);
        assert_eq!(BackendType::from(CliBackend::default()), BackendType::Auto);
    }

    #[test]
    fn test_format_mapping() {
        assert_eq!(
            CliFormat::Jpeg.to_shot_format(75),
            ShotFormat::Jpeg { quality: 75 }
        );
        assert!(CliFormat::Exr.to_shot_format(0).is_hdr());
    }
}
