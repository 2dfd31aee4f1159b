use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{Minified, Shelf};
use crate::driver::compact_script;

/// Attribute text of a start tag; quoted values may contain `<` and `>`.
const ATTRS: &str = r#"(?:"[^"]*"|'[^']*'|[^<>"'])"#;

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--(.*?)-->").unwrap());
static START_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"<([A-Za-z][\w:.-]*)((?:\s{ATTRS}*?)?)\s*(/?)>")).unwrap()
});
static ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s"'=<>/`]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#).unwrap()
});
static UNQUOTED_OK: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^[^\s"'`=<>]+$"#).unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static BETWEEN_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r">\s+<").unwrap());

/// Elements whose content is kept away from comment stripping and
/// whitespace collapsing.
static RAW_BLOCKS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    ["script", "style", "pre", "textarea"]
        .into_iter()
        .map(|tag| {
            let re = Regex::new(&format!(
                r"(?is)<({tag})\b({ATTRS}*?)>(.*?)</({tag})\s*>"
            ))
            .unwrap();
            (tag, re)
        })
        .collect()
});

const BOOLEAN_ATTRS: &[&str] = &[
    "allowfullscreen", "async", "autofocus", "autoplay", "checked", "compact", "controls",
    "declare", "default", "defer", "disabled", "formnovalidate", "hidden", "inert", "ismap",
    "itemscope", "loop", "multiple", "muted", "nohref", "noresize", "noshade", "novalidate",
    "nowrap", "open", "readonly", "required", "reversed", "scoped", "seamless", "selected",
    "sortable", "truespeed", "typemustmatch",
];

const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "button", "cite", "code", "data", "dfn", "em", "i",
    "img", "input", "kbd", "label", "mark", "q", "s", "samp", "select", "small", "span",
    "strong", "sub", "sup", "time", "u", "var",
];

pub fn minify(source: &str) -> Minified {
    let mut out = Minified::default();
    let mut shelf = Shelf::new();

    let text = set_aside(source, &mut shelf, &mut out);
    let text = START_TAG.replace_all(&text, |caps: &Captures| {
        rewrite_start_tag(&caps[1], &caps[2], &caps[3])
    });
    let text = WHITESPACE.replace_all(&text, " ");
    let text = collapse_between_tags(&text);

    out.content = shelf.restore(text.trim());
    out
}

/// Strip comments and shelve raw block bodies in one left-to-right scan, so
/// that neither can reach into the other.
fn set_aside(source: &str, shelf: &mut Shelf, out: &mut Minified) -> String {
    let mut text = String::with_capacity(source.len());
    let mut rest = source;
    loop {
        let comment = COMMENT.captures(rest).map(|caps| (None, caps));
        let block = RAW_BLOCKS
            .iter()
            .filter_map(|(tag, re)| re.captures(rest).map(|caps| (Some(*tag), caps)))
            .min_by_key(|(_, caps)| start_of(caps));
        let next = match (comment, block) {
            (Some(c), Some(b)) => Some(if start_of(&b.1) < start_of(&c.1) { b } else { c }),
            (c, b) => c.or(b),
        };
        let Some((kind, caps)) = next else {
            text.push_str(rest);
            return text;
        };
        let Some(whole) = caps.get(0) else {
            text.push_str(rest);
            return text;
        };
        text.push_str(&rest[..whole.start()]);
        match kind {
            // Conditional comments carry markup for old browsers; everything else goes.
            None if caps[1].starts_with("[if") || caps[1].starts_with("<![endif") => {
                text.push_str(&shelf.stash(&caps[0]));
            }
            None => {}
            Some(tag) => text.push_str(&raw_block(tag, &caps, shelf, out)),
        }
        rest = &rest[whole.end()..];
    }
}

fn start_of(caps: &Captures) -> usize {
    caps.get(0).map_or(usize::MAX, |m| m.start())
}

fn raw_block(tag: &str, caps: &Captures, shelf: &mut Shelf, out: &mut Minified) -> String {
    let open = rewrite_start_tag(&caps[1], &caps[2], "");
    let body = match tag {
        "script" if is_javascript(&caps[2]) => compact_inline_script(&caps[3], out),
        "style" => {
            let css = super::css(&caps[3], Path::new(""));
            out.absorb(css)
        }
        _ => caps[3].to_string(),
    };
    format!("{open}{}</{}>", shelf.stash(&body), &caps[4])
}

fn is_javascript(attrs: &str) -> bool {
    ATTR.captures_iter(attrs)
        .find(|caps| caps[1].eq_ignore_ascii_case("type"))
        .and_then(|caps| attr_value(&caps).map(str::to_ascii_lowercase))
        .map_or(true, |ty| {
            ty.is_empty() || ty == "module" || ty.contains("javascript") || ty.contains("ecmascript")
        })
}

fn compact_inline_script(body: &str, out: &mut Minified) -> String {
    if body.trim().is_empty() {
        return String::new();
    }
    match compact_script(body) {
        Ok(js) => js.trim().to_string(),
        Err(err) => {
            out.warnings.push(format!("left inline script unminified: {err}"));
            body.trim().to_string()
        }
    }
}

fn attr_value<'c>(caps: &Captures<'c>) -> Option<&'c str> {
    caps.get(2)
        .or_else(|| caps.get(3))
        .or_else(|| caps.get(4))
        .map(|m| m.as_str())
}

fn is_redundant(tag: &str, name: &str, value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    match (tag, name) {
        ("script", "type") => value == "text/javascript" || value == "application/javascript",
        ("script", "language") => value == "javascript",
        ("form", "method") => value == "get",
        ("input", "type") => value == "text",
        ("area", "shape") => value == "rect",
        ("button", "type") => value == "submit",
        _ => false,
    }
}

fn is_droppable_when_empty(name: &str) -> bool {
    matches!(name, "class" | "id" | "style" | "title" | "lang" | "dir") || name.starts_with("on")
}

fn rewrite_start_tag(tag: &str, attrs: &str, slash: &str) -> String {
    let tag_lower = tag.to_ascii_lowercase();
    let mut out = format!("<{tag}");
    let mut last_unquoted = false;

    for caps in ATTR.captures_iter(attrs) {
        let name = &caps[1];
        let lower = name.to_ascii_lowercase();
        let value = attr_value(&caps);

        if let Some(value) = value {
            if value.trim().is_empty() && is_droppable_when_empty(&lower) {
                continue;
            }
            if is_redundant(&tag_lower, &lower, value) {
                continue;
            }
        }

        out.push(' ');
        out.push_str(name);
        last_unquoted = false;
        match value {
            _ if BOOLEAN_ATTRS.contains(&lower.as_str()) => {}
            None => {}
            Some(v) if UNQUOTED_OK.is_match(v) && !v.ends_with('/') => {
                out.push('=');
                out.push_str(v);
                last_unquoted = true;
            }
            Some(v) if v.contains('"') => {
                out.push_str(&format!("='{v}'"));
            }
            Some(v) => {
                out.push_str(&format!("=\"{v}\""));
            }
        }
    }

    if !slash.is_empty() {
        if last_unquoted {
            out.push(' ');
        }
        out.push('/');
    }
    out.push('>');
    out
}

fn tag_name_at(text: &str) -> &str {
    let text = text.trim_start_matches(['<', '/']);
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | ':' | '.' | '_')))
        .unwrap_or(text.len());
    &text[..end]
}

fn is_inline(name: &str) -> bool {
    INLINE_TAGS.contains(&name.to_ascii_lowercase().as_str())
}

/// Drop whitespace between two tags unless both sides are inline elements,
/// where a single space is visible.
fn collapse_between_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in BETWEEN_TAGS.find_iter(text) {
        out.push_str(&text[last..m.start() + 1]);
        let before = text[..m.start()].rfind('<').map_or("", |i| tag_name_at(&text[i..]));
        let after = tag_name_at(&text[m.end() - 1..]);
        if is_inline(before) && is_inline(after) {
            out.push(' ');
        }
        out.push('<');
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_and_collapses_whitespace() {
        let html = "<div class=\"box\">\n  <!-- note -->\n  <p>\n    Hello   world\n  </p>\n</div>\n";
        let out = minify(html);
        assert_eq!(out.content, "<div class=box><p> Hello world </p></div>");
        assert!(out.errors.is_empty());
    }

    #[test]
    fn keeps_conditional_comments() {
        let out = minify("<!--[if IE]><p>old</p><![endif]--><p>new</p>");
        assert!(out.content.starts_with("<!--[if IE]>"));
    }

    #[test]
    fn attribute_rewrites() {
        let out = minify(
            r#"<input type="text" disabled="disabled" class="" value="a b"><form method="GET"></form>"#,
        );
        assert_eq!(out.content, r#"<input disabled value="a b"><form></form>"#);
    }

    #[test]
    fn keeps_closing_slash_and_case() {
        let out = minify(r#"<myWidget data-x="1"/> <img src="a.png" />"#);
        assert_eq!(out.content, "<myWidget data-x=1 /><img src=a.png />");
    }

    #[test]
    fn inline_elements_keep_a_separating_space() {
        let out = minify("<b>a</b>   <i>b</i>");
        assert_eq!(out.content, "<b>a</b> <i>b</i>");
    }

    #[test]
    fn preformatted_content_survives() {
        let out = minify("<pre>\n  a   b\n</pre>   <textarea> x  y </textarea>");
        assert_eq!(out.content, "<pre>\n  a   b\n</pre><textarea> x  y </textarea>");
    }

    #[test]
    fn minifies_embedded_style_and_script() {
        let out = minify(
            "<style type=\"text/css\">\n  a { color : red; }\n</style>\n\
             <script type=\"text/javascript\">\n  var  answer = 42;\n</script>",
        );
        assert!(out.content.starts_with("<style type=text/css>a{color:red}</style>"));
        assert!(out.content.contains("<script>var answer=42"));
        assert!(!out.content.contains('\n'));
    }

    #[test]
    fn comment_markers_inside_raw_blocks_survive() {
        let out = minify(
            "<script>var s = \"<!-- keep -->\";</script>\n<!-- gone -->\n<pre><!-- shown --></pre>",
        );
        assert!(out.content.contains("<!-- keep -->"), "{}", out.content);
        assert!(out.content.ends_with("<pre><!-- shown --></pre>"), "{}", out.content);
        assert!(!out.content.contains("gone"));
    }

    #[test]
    fn raw_blocks_inside_comments_are_dropped() {
        let out = minify("<!-- <script>old()</script> --><p>x</p>");
        assert_eq!(out.content, "<p>x</p>");
    }

    #[test]
    fn quoted_attribute_values_may_contain_angle_brackets() {
        let out = minify(r#"<a title="a>b" href="x">link</a>"#);
        assert_eq!(out.content, r#"<a title="a>b" href=x>link</a>"#);
    }

    #[test]
    fn raw_block_tags_keep_their_case() {
        let out = minify("<SCRIPT>var  a = 1;</SCRIPT><Pre> x </Pre>");
        assert!(out.content.starts_with("<SCRIPT>var a=1"), "{}", out.content);
        assert!(out.content.ends_with("</SCRIPT><Pre> x </Pre>"), "{}", out.content);
    }

    #[test]
    fn broken_script_is_kept_with_warning() {
        let out = minify("<script>var = ;</script>");
        assert_eq!(out.content, "<script>var = ;</script>");
        assert_eq!(out.warnings.len(), 1);
    }
}
