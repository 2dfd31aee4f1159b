//! Macro kinds, recognition of macro sites and argument validation.
//!
//! A macro site is a call such as `__C_EXTENSION("__LINE__")`: the callee is
//! the reserved identifier and the first argument is a string literal naming
//! the kind. Calls that use the reserved name for anything else are ignored.

use std::fmt;

use swc_core::ecma::ast::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroKind {
    /// Line of the call site.
    Line,
    /// Logical id of the unit.
    File,
    /// Compile time, `HH:MM:SS`.
    Time,
    /// Compile date, `YYYY-MM-DD`.
    Date,
    /// Callback that only runs in non-optimized builds.
    Debug,
    /// Name of the enclosing function, resolved after the walk.
    Method,
    /// Content of another file as a string literal.
    Inline,
}

impl MacroKind {
    pub const ALL: [MacroKind; 7] = [
        MacroKind::Line,
        MacroKind::File,
        MacroKind::Time,
        MacroKind::Date,
        MacroKind::Debug,
        MacroKind::Method,
        MacroKind::Inline,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            MacroKind::Line => "__LINE__",
            MacroKind::File => "__FILE__",
            MacroKind::Time => "__TIME__",
            MacroKind::Date => "__DATE__",
            MacroKind::Debug => "__DEBUG__",
            MacroKind::Method => "__METHOD__",
            MacroKind::Inline => "__INLINE__",
        }
    }

    /// Check the argument list of a site of this kind. `args[0]` is the kind
    /// literal itself.
    pub fn validate(self, args: &[ExprOrSpread]) -> Result<(), ArgumentError> {
        let ok = match self {
            MacroKind::Line
            | MacroKind::File
            | MacroKind::Time
            | MacroKind::Date
            | MacroKind::Method => args.len() == 1,
            MacroKind::Debug => args.len() == 2 && function_literal(&args[1]).is_some(),
            MacroKind::Inline => args.len() >= 2 && string_literal(&args[1]).is_some(),
        };
        if ok {
            Ok(())
        } else {
            Err(ArgumentError { kind: self })
        }
    }

    fn expectation(self) -> &'static str {
        match self {
            MacroKind::Debug => "must have 2 arguments, the second one is a function expression",
            MacroKind::Inline => {
                "requires at least 2 arguments, legal declarations are: \
                 __C_EXTENSION(\"__INLINE__\", filepath[, filetype])"
            }
            _ => "must only have 1 argument",
        }
    }
}

impl fmt::Display for MacroKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A recognized macro kind was invoked with the wrong arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} extension {}", kind.expectation())]
pub struct ArgumentError {
    pub kind: MacroKind,
}

// -----------------------------------------------------------------------------
// Inline formats
// -----------------------------------------------------------------------------

/// Post-processing applied to `__INLINE__` content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineFormat {
    Verbatim,
    Html,
    Css,
}

impl InlineFormat {
    /// Pick the format from the optional third argument of an inline site.
    pub fn from_args(args: &[ExprOrSpread]) -> Self {
        let Some(ty) = args.get(2).and_then(string_literal) else {
            return InlineFormat::Verbatim;
        };
        match ty.to_lowercase().as_str() {
            "html" | "htm" => InlineFormat::Html,
            "css" => InlineFormat::Css,
            _ => InlineFormat::Verbatim,
        }
    }
}

// -----------------------------------------------------------------------------
// Site recognition
// -----------------------------------------------------------------------------

/// Match `name("<kind>", ...)`. Unknown kinds yield `None`.
pub fn macro_site<'e>(expr: &'e Expr, name: &str) -> Option<(&'e CallExpr, MacroKind)> {
    let Expr::Call(call) = expr else {
        return None;
    };
    let kind = macro_call_kind(call, name)?;
    Some((call, kind))
}

pub fn macro_call_kind(call: &CallExpr, name: &str) -> Option<MacroKind> {
    let Callee::Expr(callee) = &call.callee else {
        return None;
    };
    let Expr::Ident(ident) = &**callee else {
        return None;
    };
    if ident.sym.as_ref() != name {
        return None;
    }
    let kind = call.args.first().and_then(string_literal)?;
    MacroKind::from_name(kind)
}

/// Value of a non-spread string literal argument.
pub fn string_literal(arg: &ExprOrSpread) -> Option<&str> {
    if arg.spread.is_some() {
        return None;
    }
    match &*arg.expr {
        Expr::Lit(Lit::Str(s)) => Some(s.value.as_ref()),
        _ => None,
    }
}

/// The function or arrow expression an argument holds, looking through
/// parentheses.
pub fn function_literal(arg: &ExprOrSpread) -> Option<&Expr> {
    if arg.spread.is_some() {
        return None;
    }
    let mut expr = &*arg.expr;
    while let Expr::Paren(p) = expr {
        expr = &p.expr;
    }
    matches!(expr, Expr::Fn(_) | Expr::Arrow(_)).then_some(expr)
}
