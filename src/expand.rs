use std::{fs, path::Path};

use chrono::{DateTime, Local};
use swc_core::{
    common::{SourceMapper, Span, SyntaxContext, DUMMY_SP},
    ecma::ast::*,
};
use tracing::{debug, error};

use crate::{
    config::{BuildContext, FileContext},
    error::{Error, Result},
    macros::{function_literal, macro_site, string_literal, InlineFormat, MacroKind},
    minify,
    resolve::DeferredSite,
    walker::{AncestorId, Ancestry, SiteVisitor},
};

// -----------------------------------------------------------------------------
// Literal builders
// -----------------------------------------------------------------------------

pub(crate) fn str_lit(span: Span, value: String) -> Expr {
    Expr::Lit(Lit::Str(Str {
        span,
        value: value.into(),
        raw: None,
    }))
}

fn num_lit(span: Span, value: f64) -> Expr {
    Expr::Lit(Lit::Num(Number {
        span,
        value,
        raw: None,
    }))
}

/// `void 0`, the expression form of "nothing".
fn void_zero(span: Span) -> Expr {
    Expr::Unary(UnaryExpr {
        span,
        op: UnaryOp::Void,
        arg: Box::new(num_lit(DUMMY_SP, 0.0)),
    })
}

/// `(callback)()`
fn invoke_now(span: Span, callback: Expr) -> Expr {
    Expr::Call(CallExpr {
        span,
        ctxt: SyntaxContext::empty(),
        callee: Callee::Expr(Box::new(Expr::Paren(ParenExpr {
            span: DUMMY_SP,
            expr: Box::new(callback),
        }))),
        args: vec![],
        type_args: None,
    })
}

// -----------------------------------------------------------------------------
// Expander
// -----------------------------------------------------------------------------

/// Rewrites macro sites of one content unit in place.
///
/// Created fresh for every unit; `deferred` collects the `__METHOD__` sites
/// for the resolver that runs once the walk is over.
pub struct MacroExpander<'a> {
    file: &'a FileContext,
    build: &'a BuildContext,
    source_map: &'a dyn SourceMapper,
    now: DateTime<Local>,
    deferred: &'a mut Vec<DeferredSite>,
    expanded: usize,
}

impl<'a> MacroExpander<'a> {
    pub fn new(
        file: &'a FileContext,
        build: &'a BuildContext,
        source_map: &'a dyn SourceMapper,
        deferred: &'a mut Vec<DeferredSite>,
    ) -> Self {
        Self {
            file,
            build,
            source_map,
            now: Local::now(),
            deferred,
            expanded: 0,
        }
    }

    /// Pin the clock `__TIME__` and `__DATE__` read from.
    pub fn with_clock(mut self, now: DateTime<Local>) -> Self {
        self.now = now;
        self
    }

    /// Number of sites rewritten so far (deferred sites not included).
    pub fn expanded(&self) -> usize {
        self.expanded
    }

    fn line(&self, span: Span) -> usize {
        if span.is_dummy() {
            return 0;
        }
        self.source_map.lookup_char_pos(span.lo).line
    }

    fn validate(&self, kind: MacroKind, call: &CallExpr) -> Result<()> {
        kind.validate(&call.args).map_err(|source| {
            let err = Error::Validation {
                file: self.file.id.clone(),
                line: self.line(call.span),
                source,
            };
            error!("{}", err);
            err
        })
    }

    /// Compute the replacement for a validated site. `None` means the site
    /// stays as it is for now.
    fn expand(&mut self, kind: MacroKind, call: &CallExpr, at: AncestorId) -> Result<Option<Expr>> {
        let span = call.span;
        let replacement = match kind {
            MacroKind::Line => num_lit(span, self.line(span) as f64),
            MacroKind::File => str_lit(span, self.file.id.clone()),
            MacroKind::Time => str_lit(span, self.now.format("%H:%M:%S").to_string()),
            MacroKind::Date => str_lit(span, self.now.format("%Y-%m-%d").to_string()),
            MacroKind::Debug if self.build.optimize => void_zero(span),
            MacroKind::Debug => {
                let Some(callback) = call.args.get(1).and_then(function_literal) else {
                    return Ok(None);
                };
                invoke_now(span, callback.clone())
            }
            MacroKind::Method => {
                self.deferred.push(DeferredSite {
                    span,
                    line: self.line(span),
                    at,
                });
                return Ok(None);
            }
            MacroKind::Inline => str_lit(span, self.inline(call)?),
        };
        Ok(Some(replacement))
    }

    fn inline(&self, call: &CallExpr) -> Result<String> {
        let target = call.args.get(1).and_then(string_literal).unwrap_or_default();
        let path = self.file.resolve_inline(target);
        if !path.is_file() {
            let err = Error::MissingInline {
                file: self.file.id.clone(),
                line: self.line(call.span),
                path,
            };
            error!("{}", err);
            return Err(err);
        }
        let content = fs::read_to_string(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;

        let minified = match InlineFormat::from_args(&call.args) {
            InlineFormat::Verbatim => return Ok(content),
            InlineFormat::Html => minify::html(&content),
            InlineFormat::Css => {
                let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
                minify::css(&content, &dir)
            }
        };
        minified.report(&path);
        if self.build.strict_minify && !minified.errors.is_empty() {
            return Err(Error::Minify {
                path,
                errors: minified.errors,
            });
        }
        Ok(minified.content)
    }
}

impl SiteVisitor for MacroExpander<'_> {
    fn visit_stmt(&mut self, stmt: &mut Stmt, _: AncestorId, _: &Ancestry) -> Result<()> {
        let build = self.build;
        if !build.optimize {
            return Ok(());
        }
        let Stmt::Expr(ExprStmt { span, expr }) = &*stmt else {
            return Ok(());
        };
        let span = *span;
        let Some((call, MacroKind::Debug)) = macro_site(expr, &build.macro_name) else {
            return Ok(());
        };
        self.validate(MacroKind::Debug, call)?;
        debug!(file = %self.file.id, line = self.line(call.span), "dropping __DEBUG__ block");
        *stmt = Stmt::Empty(EmptyStmt { span });
        self.expanded += 1;
        Ok(())
    }

    fn visit_expr(&mut self, expr: &mut Expr, at: AncestorId, _: &Ancestry) -> Result<()> {
        let build = self.build;
        let Some((call, kind)) = macro_site(expr, &build.macro_name) else {
            return Ok(());
        };
        self.validate(kind, call)?;
        if let Some(replacement) = self.expand(kind, call, at)? {
            *expr = replacement;
            self.expanded += 1;
        }
        Ok(())
    }
}
