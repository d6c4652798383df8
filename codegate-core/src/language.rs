use std::fmt;

use serde::{Deserialize, Serialize};

/// Source language of a submission.
///
/// Only affects how the artifact is stored: its file extension and the
/// comment token used for the provenance header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Language {
    /// The sandbox's native language.
    #[default]
    JavaScript,
    /// TypeScript.
    TypeScript,
    /// Python.
    Python,
}

impl Language {
    /// Resolve a client-supplied label. Unknown or missing labels fall back
    /// to [`Language::JavaScript`].
    #[must_use]
    pub fn from_label(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return Self::default();
        };
        match label.trim().to_ascii_lowercase().as_str() {
            "typescript" | "ts" => Self::TypeScript,
            "python" | "py" => Self::Python,
            _ => Self::JavaScript,
        }
    }

    /// File extension for archived artifacts, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::JavaScript => "js",
            Self::TypeScript => "ts",
            Self::Python => "py",
        }
    }

    /// Line-comment token used to prefix provenance header lines.
    #[must_use]
    pub const fn comment_prefix(self) -> &'static str {
        match self {
            Self::JavaScript | Self::TypeScript => "//",
            Self::Python => "#",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Python => "python",
        };
        f.write_str(label)
    }
}
