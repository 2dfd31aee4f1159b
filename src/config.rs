use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

/// Callee name that marks a call expression as a macro invocation.
pub const DEFAULT_MACRO_NAME: &str = "__C_EXTENSION";

// -----------------------------------------------------------------------------
// Build context
// -----------------------------------------------------------------------------

/// Host build configuration, read-only for the duration of a unit.
///
/// Deserializes from the plugin JSON config; missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BuildContext {
    /// Production build: `__DEBUG__` blocks are dropped.
    pub optimize: bool,
    /// Promote minifier errors from log entries to a fatal error.
    pub strict_minify: bool,
    pub macro_name: String,
}

impl Default for BuildContext {
    fn default() -> Self {
        Self {
            optimize: false,
            strict_minify: false,
            macro_name: DEFAULT_MACRO_NAME.to_string(),
        }
    }
}

impl BuildContext {
    pub fn optimized() -> Self {
        Self {
            optimize: true,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// -----------------------------------------------------------------------------
// File context
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Script,
    Other,
}

impl SourceKind {
    pub fn from_ext(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "js" | "mjs" | "cjs" => SourceKind::Script,
            _ => SourceKind::Other,
        }
    }
}

/// Metadata about the unit being processed, supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContext {
    /// Logical, project-relative identifier (what `__FILE__` expands to).
    pub id: String,
    /// Location of the unit on disk.
    pub realpath: PathBuf,
    /// Extension including the dot, e.g. `.js`.
    pub ext: String,
}

impl FileContext {
    pub fn new(id: impl Into<String>, realpath: impl Into<PathBuf>) -> Self {
        let realpath = realpath.into();
        let ext = realpath
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        Self {
            id: id.into(),
            realpath,
            ext,
        }
    }

    pub fn kind(&self) -> SourceKind {
        SourceKind::from_ext(&self.ext)
    }

    /// Directory inlined paths are resolved against: the project root the
    /// logical id is relative to, or the unit's own directory when the real
    /// path does not end with the id.
    pub fn base_dir(&self) -> PathBuf {
        let real = self.realpath.to_string_lossy().replace('\\', "/");
        let id = self.id.replace('\\', "/");
        let id = id.trim_start_matches("./");
        if !id.is_empty() {
            if let Some(root) = real.strip_suffix(id) {
                if id.starts_with('/') || root.ends_with('/') {
                    return PathBuf::from(root);
                }
            }
        }
        self.realpath
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Resolve a path literal from an `__INLINE__` site.
    pub fn resolve_inline(&self, target: &str) -> PathBuf {
        self.base_dir()
            .join(target.replace('\\', "/").trim_start_matches('/'))
    }
}
