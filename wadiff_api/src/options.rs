use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default program used to show created images.
pub const DEFAULT_SHOW_COMMAND: &str = "display";

/// How differences are colored in diff artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorMode {
    /// Desaturated image with differences drawn in color.
    #[default]
    Full,
    /// Black and white image, no grey.
    HighContrast,
}

/// Options passed through to the render and diff collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Ask collaborators for verbose output.
    #[serde(default)]
    pub verbose: bool,
    /// Coloring of the differences.
    #[serde(default)]
    pub color_mode: ColorMode,
    /// Produce animated (GIF) artifacts alternating between the two sides.
    #[serde(default)]
    pub animated: bool,
    /// Show artifacts once they exist.
    #[serde(default)]
    pub show: bool,
    /// Command used to show artifacts. Leading words after the program are arguments.
    #[serde(default = "default_show_command")]
    pub show_command: String,
}

fn default_show_command() -> String {
    DEFAULT_SHOW_COMMAND.to_owned()
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            color_mode: ColorMode::default(),
            animated: false,
            show: false,
            show_command: default_show_command(),
        }
    }
}

/// When the render/diff collaborators are invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffStrategy {
    /// Render and diff every asset as soon as it is materialized; abort on first failure.
    #[default]
    PerAsset,
    /// Collect every materialized path, then make one diff-only invocation.
    Batch,
}

/// What happens when historical content cannot be retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetrievalPolicy {
    /// Treat the side as empty and keep going.
    #[default]
    Lenient,
    /// Abort the whole run.
    Strict,
}

/// Error returned when parsing one of the option enums from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    /// Rejected input.
    pub input: String,
    /// Accepted spellings.
    pub expected: &'static [&'static str],
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid value '{}' (expected one of: {})",
            self.input,
            self.expected.join(", ")
        )
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! text_enum {
    ($ty:ty { $($text:literal => $variant:path),+ $(,)? }) => {
        impl $ty {
            /// Spellings accepted by `FromStr`.
            pub const VARIANTS: &'static [&'static str] = &[$($text),+];

            /// Canonical spelling.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($variant => $text),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(input: &str) -> Result<Self, Self::Err> {
                match input.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($variant),)+
                    _ => Err(UnknownVariant {
                        input: input.to_owned(),
                        expected: Self::VARIANTS,
                    }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(ColorMode {
    "full" => ColorMode::Full,
    "high-contrast" => ColorMode::HighContrast,
});

text_enum!(DiffStrategy {
    "per-asset" => DiffStrategy::PerAsset,
    "batch" => DiffStrategy::Batch,
});

text_enum!(RetrievalPolicy {
    "lenient" => RetrievalPolicy::Lenient,
    "strict" => RetrievalPolicy::Strict,
});
