use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;
use wadiff_api::{ColorMode, RenderOptions};
use wadiff_tool_api::{Differencer, ToolError, ToolResult};

use crate::command::ExternalCommand;

const PROGRAM_ENV: &str = "WADIFF_MAGICK";
const DEFAULT_PROGRAM: &str = "magick";
/// `compare` exits 1 when the images differ, which is the expected outcome here.
const COMPARE_ACCEPTED: &[i32] = &[0, 1];
/// Frame delay in hundredths of a second for animated artifacts.
const GIF_DELAY: &str = "50";

/// Differencer backed by ImageMagick's `compare` and animation support.
#[derive(Debug, Clone)]
pub struct ImageMagick {
    command: ExternalCommand,
}

impl ImageMagick {
    /// Use the program named by `WADIFF_MAGICK`, or `magick`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            command: ExternalCommand::from_env(PROGRAM_ENV, DEFAULT_PROGRAM),
        }
    }

    /// Use an explicit program.
    #[must_use]
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            command: ExternalCommand::new(program),
        }
    }

    /// Bound every invocation by `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command = self.command.with_timeout(timeout);
        self
    }
}

impl Default for ImageMagick {
    fn default() -> Self {
        Self::new()
    }
}

impl Differencer for ImageMagick {
    fn id(&self) -> &'static str {
        "imagemagick"
    }

    fn diff(
        &self,
        before: Option<&Path>,
        after: Option<&Path>,
        out: &Path,
        options: &RenderOptions,
    ) -> ToolResult<Option<PathBuf>> {
        match (before, after) {
            (None, None) => Ok(None),
            (Some(only), None) | (None, Some(only)) => copy_single_side(only, out).map(Some),
            (Some(before), Some(after)) => {
                let (args, written) = diff_args(before, after, out, options);
                let identical = if options.animated {
                    self.command.run(&args)?;
                    false
                } else {
                    let output = self.command.run_accepting(&args, COMPARE_ACCEPTED)?;
                    output.code == Some(0)
                };
                debug!(artifact = %written.display(), identical, "wrote diff artifact");
                Ok(Some(written))
            }
        }
    }
}

/// With one side blank the artifact is the other side's image unchanged.
fn copy_single_side(image: &Path, out: &Path) -> ToolResult<PathBuf> {
    let target = match image.extension() {
        Some(ext) => out.with_extension(ext),
        None => out.to_path_buf(),
    };
    fs::copy(image, &target).map_err(|source| ToolError::Io {
        path: target.display().to_string(),
        source,
    })?;
    Ok(target)
}

fn diff_args(
    before: &Path,
    after: &Path,
    out: &Path,
    options: &RenderOptions,
) -> (Vec<OsString>, PathBuf) {
    let mut args: Vec<OsString> = Vec::new();
    if options.animated {
        let written = out.with_extension("gif");
        args.extend(["-delay", GIF_DELAY, "-loop", "0"].map(OsString::from));
        args.push(before.into());
        args.push(after.into());
        args.push(written.clone().into());
        return (args, written);
    }

    args.push("compare".into());
    if options.color_mode == ColorMode::HighContrast {
        args.extend(
            ["-highlight-color", "white", "-lowlight-color", "black", "-compose", "src"]
                .map(OsString::from),
        );
    }
    args.push(before.into());
    args.push(after.into());
    args.push(out.into());
    (args, out.to_path_buf())
}
