//! Second pass for `__METHOD__`: name the function each collected site sits
//! in, using the ancestry recorded by the walk.

use std::collections::HashMap;

use swc_core::{
    common::Span,
    ecma::{
        ast::*,
        visit::{VisitMut, VisitMutWith},
    },
};
use tracing::debug;

use crate::{
    expand::str_lit,
    macros::{macro_site, MacroKind},
    walker::{AncestorId, Ancestry, Shape},
};

/// A `__METHOD__` site waiting for the walk to finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredSite {
    pub span: Span,
    pub line: usize,
    pub at: AncestorId,
}

/// Where a resolved name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// `function name() {}`
    Declaration,
    /// `var name = function () {}`
    Binding,
    /// `{ name: function () {} }` and method forms.
    Property,
    /// No nameable context; a generated id.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSite {
    pub span: Span,
    pub name: String,
    pub origin: Origin,
}

/// Fresh globally unique value for sites with no enclosing name.
pub fn unique_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Name every site in collection order. `fallback` is called once per site
/// that has no nameable enclosing function.
pub fn resolve(
    sites: &[DeferredSite],
    ancestry: &Ancestry,
    mut fallback: impl FnMut() -> String,
) -> Vec<ResolvedSite> {
    sites
        .iter()
        .map(|site| {
            let (name, origin) = enclosing_name(site.at, ancestry)
                .unwrap_or_else(|| (fallback(), Origin::Fallback));
            debug!(line = site.line, name = %name, ?origin, "resolved __METHOD__");
            ResolvedSite {
                span: site.span,
                name,
                origin,
            }
        })
        .collect()
}

fn enclosing_name(at: AncestorId, ancestry: &Ancestry) -> Option<(String, Origin)> {
    let mut node = at;
    while let Some(parent) = ancestry.parent(node) {
        match ancestry.shape(node) {
            Shape::FunctionDecl { name } => return Some((name.clone(), Origin::Declaration)),
            Shape::Function => match ancestry.shape(parent) {
                // Invoked on the spot: not a named method, and nothing above
                // it is either.
                Shape::Call => return None,
                Shape::Binding { name: Some(name) } => {
                    return Some((name.clone(), Origin::Binding))
                }
                Shape::Property { key: Some(key) } => {
                    return Some((key.clone(), Origin::Property))
                }
                _ => {}
            },
            _ => {}
        }
        node = parent;
    }
    None
}

// -----------------------------------------------------------------------------
// Rewriting
// -----------------------------------------------------------------------------

/// Replace each resolved site in `program` with its name. Sites are matched
/// by source span and rewritten at most once; returns how many were found.
pub fn apply(program: &mut Program, resolved: &[ResolvedSite], macro_name: &str) -> usize {
    let mut rewriter = SiteRewriter {
        names: resolved
            .iter()
            .map(|site| (site.span, site.name.as_str()))
            .collect(),
        macro_name,
        applied: 0,
    };
    program.visit_mut_with(&mut rewriter);
    rewriter.applied
}

struct SiteRewriter<'a> {
    names: HashMap<Span, &'a str>,
    macro_name: &'a str,
    applied: usize,
}

impl VisitMut for SiteRewriter<'_> {
    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        if let Some((call, MacroKind::Method)) = macro_site(expr, self.macro_name) {
            let span = call.span;
            if let Some(name) = self.names.remove(&span) {
                *expr = str_lit(span, name.to_string());
                self.applied += 1;
                return;
            }
        }
        expr.visit_mut_children_with(self);
    }
}
