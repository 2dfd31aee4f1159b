use std::{
    collections::HashSet,
    fs,
    path::{Component, Path, PathBuf},
};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{Minified, Shelf};

const STRING_PATTERN: &str = r#""(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'"#;

static COMMENT_OR_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?s)/\*.*?\*/|{STRING_PATTERN}")).unwrap());
static STRING: Lazy<Regex> = Lazy::new(|| Regex::new(STRING_PATTERN).unwrap());
// Strings are matched first so that `@import` and `url(` inside them are skipped.
static IMPORT_OR_STRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"{STRING_PATTERN}|(?i:@import\s+(?:url\(\s*)?(?:"([^"]*)"|'([^']*)'|([^\s;"')]+))\s*\)?\s*([^;]*);)"#
    ))
    .unwrap()
});
static URL_OR_STRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"{STRING_PATTERN}|url\(\s*(?:"([^"]*)"|'([^']*)'|([^\s"')]+))\s*\)"#
    ))
    .unwrap()
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*([{};,>])\s*").unwrap());
static DECLARATIONS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]*)\}").unwrap());
static COLON: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*:\s*").unwrap());
static EMPTY_RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|[{};])[^{};]+\{\}").unwrap());

/// Minify a stylesheet. Local `@import`s are resolved against `dir`, the
/// directory of the stylesheet itself, and inlined.
pub fn minify(source: &str, dir: &Path) -> Minified {
    let mut out = Minified::default();
    let mut seen = HashSet::new();
    let css = inline_imports(source, dir, &mut seen, &mut out);

    let mut shelf = Shelf::new();
    let css = STRING.replace_all(&css, |caps: &Captures| shelf.stash(&caps[0]));
    let css = WHITESPACE.replace_all(&css, " ");
    let css = PUNCTUATION.replace_all(&css, "$1").replace("*/ ", "*/");
    let css = DECLARATIONS.replace_all(&css, |caps: &Captures| {
        format!("{{{}}}", COLON.replace_all(&caps[1], ":"))
    });
    let mut css = css.replace(";}", "}");
    loop {
        let next = EMPTY_RULE.replace_all(&css, "$1").into_owned();
        if next == css {
            break;
        }
        css = next;
    }

    let css = match merge_adjacent_rules(css.trim()) {
        Ok(merged) => merged,
        Err(message) => {
            out.errors.push(message);
            css.trim().to_string()
        }
    };
    out.content = shelf.restore(&css);
    out
}

/// Drop comments other than `/*! ... */`, leaving strings alone.
fn strip_comments(source: &str) -> String {
    COMMENT_OR_STRING
        .replace_all(source, |caps: &Captures| {
            let m = &caps[0];
            if m.starts_with("/*") && !m.starts_with("/*!") {
                String::new()
            } else {
                m.to_string()
            }
        })
        .into_owned()
}

fn is_remote(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("//")
}

fn inline_imports(
    source: &str,
    dir: &Path,
    seen: &mut HashSet<PathBuf>,
    out: &mut Minified,
) -> String {
    let source = strip_comments(source);
    IMPORT_OR_STRING
        .replace_all(&source, |caps: &Captures| {
            let Some(media) = caps.get(4) else {
                return caps[0].to_string();
            };
            let media = media.as_str().trim();
            let target = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map_or("", |m| m.as_str());

            if is_remote(target) {
                out.warnings
                    .push(format!("Skipping remote @import of \"{target}\"."));
                return caps[0].to_string();
            }
            let path = dir.join(target.trim_start_matches('/'));
            if !path.is_file() {
                out.warnings.push(format!(
                    "Ignoring local @import of \"{target}\" as resource is missing."
                ));
                return String::new();
            }
            let key = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            if !seen.insert(key.clone()) {
                out.warnings
                    .push(format!("Ignoring circular @import of \"{target}\"."));
                return String::new();
            }
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(err) => {
                    out.warnings
                        .push(format!("Ignoring @import of \"{target}\": {err}."));
                    return String::new();
                }
            };

            let sub_dir = path.parent().unwrap_or(dir);
            let sub_rel = normalize(Path::new(target.trim_start_matches('/')))
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let nested = inline_imports(&content, sub_dir, seen, out);
            seen.remove(&key);

            let body = rebase_urls(&nested, &sub_rel);
            if media.is_empty() {
                body
            } else {
                format!("@media {media}{{{body}}}")
            }
        })
        .into_owned()
}

/// Rewrite relative `url()`s of an imported sheet so they stay valid from
/// the importing sheet's directory. Applied once per import level, so nested
/// imports compose.
fn rebase_urls(css: &str, rel: &Path) -> String {
    if rel.as_os_str().is_empty() {
        return css.to_string();
    }
    URL_OR_STRING.replace_all(css, |caps: &Captures| {
        let Some(url) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
            return caps[0].to_string();
        };
        let url = url.as_str();
        let absolute = url.starts_with('/')
            || url.starts_with('#')
            || url.contains(':')
            || is_remote(url);
        if url.is_empty() || absolute {
            return caps[0].to_string();
        }
        let rebased = normalize(&rel.join(url));
        format!("url({})", rebased.to_string_lossy().replace('\\', "/"))
    })
    .into_owned()
}

/// Lexically fold `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                _ => out.push(component),
            },
            _ => out.push(component),
        }
    }
    out.iter().collect()
}

/// Merge neighbouring top-level rules that share a selector, e.g.
/// `a{color:red}a{margin:0}` into `a{color:red;margin:0}`.
fn merge_adjacent_rules(css: &str) -> Result<String, String> {
    let mut blocks: Vec<(String, String)> = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut body_start = 0;

    for (i, c) in css.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    body_start = i;
                }
                depth += 1;
            }
            '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| format!("Unexpected '}}' at offset {i}."))?;
                if depth == 0 {
                    let selector = css[start..body_start].to_string();
                    let body = css[body_start + 1..i].to_string();
                    blocks.push((selector, body));
                    start = i + 1;
                }
            }
            ';' if depth == 0 => {
                blocks.push((css[start..=i].to_string(), String::new()));
                start = i + 1;
                body_start = start;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("Unclosed block: missing '}'.".to_string());
    }

    let mut merged: Vec<(String, String)> = Vec::new();
    for (selector, body) in blocks {
        let plain = !selector.starts_with('@') && !selector.ends_with(';') && !body.contains('{');
        match merged.last_mut() {
            Some((prev, prev_body))
                if plain && *prev == selector && !prev_body.contains('{') =>
            {
                prev_body.push(';');
                prev_body.push_str(&body);
            }
            _ => merged.push((selector, body)),
        }
    }

    let mut out = String::with_capacity(css.len());
    for (selector, body) in merged {
        out.push_str(&selector);
        if !selector.ends_with(';') {
            out.push('{');
            out.push_str(&body);
            out.push('}');
        }
    }
    out.push_str(&css[start..]);
    Ok(out)
}
