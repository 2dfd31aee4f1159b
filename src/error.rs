use std::path::PathBuf;

use crate::macros::ArgumentError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can stop a content unit from being expanded.
///
/// All variants are fatal for the unit they were raised in. Minifier
/// diagnostics only become an error when `strict_minify` is set.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{file}:{line}: failed to parse: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },

    #[error("in {file}: {line}, {source}")]
    Validation {
        file: String,
        line: usize,
        #[source]
        source: ArgumentError,
    },

    #[error("in {file}: {line}, target file {} for __INLINE__ not exists", path.display())]
    MissingInline {
        file: String,
        line: usize,
        path: PathBuf,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("minifying {} failed: {}", path.display(), errors.join("; "))]
    Minify { path: PathBuf, errors: Vec<String> },

    #[error("{file}: failed to generate code: {source}")]
    Codegen {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid transform config: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Line the failure points at, when it is tied to a macro site.
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Parse { line, .. }
            | Error::Validation { line, .. }
            | Error::MissingInline { line, .. } => Some(*line),
            _ => None,
        }
    }
}
