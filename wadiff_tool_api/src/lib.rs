//! Interfaces of the external collaborators driven by the diff pipeline.

mod types;

use std::fmt;
use std::path::{Path, PathBuf};

pub use types::{ToolError, ToolResult};
use wadiff_api::RenderOptions;

/// Converts a single asset into raster images.
pub trait Renderer: Send + Sync {
    /// Stable identifier used for logging.
    fn id(&self) -> &'static str;

    /// Render `input` into `out_dir` and return the images created.
    ///
    /// An absent input renders nothing and returns an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error when the rendering program cannot be run or fails.
    fn render(
        &self,
        input: Option<&Path>,
        out_dir: &Path,
        options: &RenderOptions,
    ) -> ToolResult<Vec<PathBuf>>;
}

/// Produces a diff artifact from two rendered images.
pub trait Differencer: Send + Sync {
    /// Stable identifier used for logging.
    fn id(&self) -> &'static str;

    /// Write the artifact for `before` and `after` to `out`.
    ///
    /// Either side may be absent. Returns the path actually written, which may
    /// differ from `out` in its extension, or `None` when both sides are absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the differencing program cannot be run or fails.
    fn diff(
        &self,
        before: Option<&Path>,
        after: Option<&Path>,
        out: &Path,
        options: &RenderOptions,
    ) -> ToolResult<Option<PathBuf>>;
}

/// A renderer able to diff a whole batch of assets in one invocation.
pub trait BatchRenderer: Send + Sync {
    /// Stable identifier used for logging.
    fn id(&self) -> &'static str;

    /// Render every `from` and `to` asset in diff-only mode into `out_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error when the invocation cannot be run or fails.
    fn render_diff(
        &self,
        from: &[PathBuf],
        to: &[PathBuf],
        out_dir: &Path,
        options: &RenderOptions,
    ) -> ToolResult<Vec<PathBuf>>;
}

/// Shows created images to the user.
pub trait Viewer: Send + Sync {
    /// Stable identifier used for logging.
    fn id(&self) -> &'static str;

    /// Show `images`, blocking until the viewer exits.
    ///
    /// # Errors
    ///
    /// Returns an error when the viewer cannot be run or exits unsuccessfully.
    fn show(&self, images: &[PathBuf], options: &RenderOptions) -> ToolResult<()>;
}

/// The set of collaborators used by one run.
pub struct Toolchain {
    /// Per-asset renderer.
    pub renderer: Box<dyn Renderer>,
    /// Per-asset differencer.
    pub differencer: Box<dyn Differencer>,
    /// Diff-only renderer used by the batch strategy.
    pub batch: Box<dyn BatchRenderer>,
    /// Viewer for `show` requests.
    pub viewer: Box<dyn Viewer>,
}

impl Toolchain {
    /// Bundle the given collaborators.
    pub fn new<R, D, B, V>(renderer: R, differencer: D, batch: B, viewer: V) -> Self
    where
        R: Renderer + 'static,
        D: Differencer + 'static,
        B: BatchRenderer + 'static,
        V: Viewer + 'static,
    {
        Self {
            renderer: Box::new(renderer),
            differencer: Box::new(differencer),
            batch: Box::new(batch),
            viewer: Box::new(viewer),
        }
    }
}

impl fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Toolchain")
            .field("renderer", &self.renderer.id())
            .field("differencer", &self.differencer.id())
            .field("batch", &self.batch.id())
            .field("viewer", &self.viewer.id())
            .finish()
    }
}
