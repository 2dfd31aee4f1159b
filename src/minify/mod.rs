//! Text transforms applied to `__INLINE__` content.
//!
//! Both minifiers are best effort: problems are collected as diagnostics
//! next to the output instead of aborting, and the caller decides what to
//! do with them.

use std::path::Path;

use tracing::{error, warn};

mod css;
mod html;

pub use css::minify as css;
pub use html::minify as html;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Minified {
    pub content: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Minified {
    fn new(content: String) -> Self {
        Self {
            content,
            ..Self::default()
        }
    }

    /// Forward diagnostics to the log.
    pub fn report(&self, path: &Path) {
        for message in &self.errors {
            error!("{}: {}", path.display(), message);
        }
        for message in &self.warnings {
            warn!("{}: {}", path.display(), message);
        }
    }

    fn absorb(&mut self, other: Minified) -> String {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        other.content
    }
}

// -----------------------------------------------------------------------------
// Protected spans
// -----------------------------------------------------------------------------

/// Swaps regions that must survive whitespace collapsing (strings, `<pre>`
/// bodies, ...) for opaque placeholders and puts them back afterwards.
struct Shelf {
    items: Vec<String>,
}

const MARK: char = '\u{1}';

impl Shelf {
    fn new() -> Self {
        Self { items: Vec::new() }
    }

    fn stash(&mut self, text: &str) -> String {
        self.items.push(text.to_string());
        format!("{MARK}{}{MARK}", self.items.len() - 1)
    }

    fn restore(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(MARK) {
            out.push_str(&rest[..start]);
            let after = &rest[start + MARK.len_utf8()..];
            let Some(end) = after.find(MARK) else {
                out.push_str(&rest[start..]);
                return out;
            };
            match after[..end].parse::<usize>().ok().and_then(|i| self.items.get(i)) {
                Some(item) => out.push_str(&self.restore(item)),
                None => out.push_str(&rest[start..start + MARK.len_utf8() + end + MARK.len_utf8()]),
            }
            rest = &after[end + MARK.len_utf8()..];
        }
        out.push_str(rest);
        out
    }
}
