//! Collaborator adapters that shell out to wad2image, ImageMagick and a viewer.

mod command;
mod imagemagick;
mod viewer;
mod wad2image;

use std::ffi::OsString;
use std::time::Duration;

pub use command::{ExternalCommand, ProcessOutput};
pub use imagemagick::ImageMagick;
pub use viewer::CommandViewer;
pub use wad2image::Wad2Image;

use wadiff_tool_api::Toolchain;

/// Program overrides and limits for the default adapters.
#[derive(Debug, Clone, Default)]
pub struct ToolSettings {
    /// Renderer program; `WADIFF_WAD2IMAGE` or `wad2image.py` when unset.
    pub wad2image: Option<OsString>,
    /// ImageMagick program; `WADIFF_MAGICK` or `magick` when unset.
    pub magick: Option<OsString>,
    /// Limit applied to every render and diff invocation.
    pub timeout: Option<Duration>,
}

/// Build the toolchain of external programs used by the `wadiff` binary.
#[must_use]
pub fn default_toolchain(settings: &ToolSettings) -> Toolchain {
    let wad2image = settings
        .wad2image
        .clone()
        .map_or_else(Wad2Image::new, Wad2Image::with_program)
        .with_timeout(settings.timeout);
    let magick = settings
        .magick
        .clone()
        .map_or_else(ImageMagick::new, ImageMagick::with_program)
        .with_timeout(settings.timeout);

    Toolchain::new(wad2image.clone(), magick, wad2image, CommandViewer)
}
