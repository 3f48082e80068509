use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::debug;
use wadiff_api::{ColorMode, RenderOptions};
use wadiff_tool_api::{BatchRenderer, Renderer, ToolError, ToolResult};

use crate::command::{ExternalCommand, ProcessOutput};

const PROGRAM_ENV: &str = "WADIFF_WAD2IMAGE";
const DEFAULT_PROGRAM: &str = "wad2image.py";

/// Renderer backed by the `wad2image` program, which draws every map in a WAD.
#[derive(Debug, Clone)]
pub struct Wad2Image {
    command: ExternalCommand,
}

impl Wad2Image {
    /// Use the program named by `WADIFF_WAD2IMAGE`, or `wad2image.py`.
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

impl Default for Wad2Image {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for Wad2Image {
    fn id(&self) -> &'static str {
        "wad2image"
    }

    fn render(
        &self,
        input: Option<&Path>,
        out_dir: &Path,
        options: &RenderOptions,
    ) -> ToolResult<Vec<PathBuf>> {
        let Some(input) = input else {
            return Ok(Vec::new());
        };

        create_dir(out_dir)?;
        let before = snapshot(out_dir)?;

        let mut args: Vec<OsString> = Vec::new();
        if options.verbose {
            args.push("-v".into());
        }
        args.push("-o".into());
        args.push(out_dir.into());
        args.push(input.into());

        log_output(&self.command.run(&args)?);
        let images = written_since(out_dir, &before)?;
        debug!(input = %input.display(), count = images.len(), "rendered asset");
        Ok(images)
    }
}

impl BatchRenderer for Wad2Image {
    fn id(&self) -> &'static str {
        "wad2image"
    }

    fn render_diff(
        &self,
        from: &[PathBuf],
        to: &[PathBuf],
        out_dir: &Path,
        options: &RenderOptions,
    ) -> ToolResult<Vec<PathBuf>> {
        if from.is_empty() && to.is_empty() {
            return Ok(Vec::new());
        }

        create_dir(out_dir)?;
        let before = snapshot(out_dir)?;

        let args = batch_args(from, to, out_dir, options);
        log_output(&self.command.run(&args)?);
        written_since(out_dir, &before)
    }
}

/// Forward what the renderer printed, which is only chatty with `-v`.
fn log_output(output: &ProcessOutput) {
    for line in output.stdout.lines().filter(|line| !line.trim().is_empty()) {
        debug!(line, "wad2image");
    }
}

/// Arguments for one diff-only invocation. `from` assets precede `to` assets so
/// the first revision of each map is drawn first.
fn batch_args(
    from: &[PathBuf],
    to: &[PathBuf],
    out_dir: &Path,
    options: &RenderOptions,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    args.push("-d".into());
    args.push(if options.animated { "gif" } else { "colors" }.into());
    if options.color_mode == ColorMode::HighContrast {
        args.push("--colors-images".into());
        args.push("bw".into());
    }
    if options.verbose {
        args.push("-v".into());
    }
    if options.show {
        args.push("-s".into());
        args.push("--show-cmd".into());
        args.push(options.show_command.clone().into());
    }
    args.push("-o".into());
    args.push(out_dir.into());
    args.extend(from.iter().map(OsString::from));
    args.extend(to.iter().map(OsString::from));
    args
}

fn create_dir(dir: &Path) -> ToolResult<()> {
    fs::create_dir_all(dir).map_err(|source| ToolError::Io {
        path: dir.display().to_string(),
        source,
    })
}

fn snapshot(dir: &Path) -> ToolResult<HashMap<PathBuf, Option<SystemTime>>> {
    Ok(list_files(dir)?.into_iter().collect())
}

/// Files in `dir` that are new or were modified since `before` was taken.
fn written_since(
    dir: &Path,
    before: &HashMap<PathBuf, Option<SystemTime>>,
) -> ToolResult<Vec<PathBuf>> {
    let mut written: Vec<PathBuf> = list_files(dir)?
        .into_iter()
        .filter(|(path, modified)| before.get(path) != Some(modified))
        .map(|(path, _)| path)
        .collect();
    written.sort();
    Ok(written)
}

fn list_files(dir: &Path) -> ToolResult<Vec<(PathBuf, Option<SystemTime>)>> {
    let io_err = |source| ToolError::Io {
        path: dir.display().to_string(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let metadata = entry.metadata().map_err(io_err)?;
        if metadata.is_file() {
            files.push((entry.path(), metadata.modified().ok()));
        }
    }
    Ok(files)
}
