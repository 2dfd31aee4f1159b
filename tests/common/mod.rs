#![allow(dead_code)]

use std::path::{Path, PathBuf};

use c_extension_swc_plugin::FileContext;
use swc_core::{
    common::{sync::Lrc, FileName, SourceMap},
    ecma::{
        ast::*,
        parser::{EsSyntax, Parser, StringInput, Syntax},
        visit::{Visit, VisitWith},
    },
};

pub fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// A unit at `/src/app.js` inside the fixture project.
pub fn app_js() -> FileContext {
    FileContext::new("/src/app.js", fixtures().join("src/app.js"))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Num(f64),
    Other,
}

impl Value {
    pub fn str(&self) -> &str {
        match self {
            Value::Str(s) => s,
            other => panic!("expected a string literal, got {other:?}"),
        }
    }
}

/// Generated code, parsed back for inspection.
pub struct Output {
    pub program: Program,
}

impl Output {
    pub fn parse(js: &str) -> Self {
        let cm: Lrc<SourceMap> = Default::default();
        let fm = cm.new_source_file(FileName::Custom("out.js".into()).into(), js.to_owned());
        let mut parser = Parser::new(Syntax::Es(EsSyntax::default()), StringInput::from(&*fm), None);
        let program = parser
            .parse_program()
            .unwrap_or_else(|e| panic!("generated code does not parse: {e:?}\n{js}"));
        Self { program }
    }

    /// Initializers of `var name = <literal>` declarations, in source order.
    pub fn declared(&self) -> Vec<(String, Value)> {
        let mut c = Declared::default();
        self.program.visit_with(&mut c);
        c.0
    }

    pub fn value(&self, name: &str) -> Value {
        self.declared()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .unwrap_or_else(|| panic!("no declaration of {name}"))
    }

    /// Calls of the form `(function () {...})()` with no arguments.
    pub fn immediate_calls(&self) -> usize {
        let mut c = ImmediateCalls::default();
        self.program.visit_with(&mut c);
        c.0
    }
}

#[derive(Default)]
struct Declared(Vec<(String, Value)>);

impl Visit for Declared {
    fn visit_var_declarator(&mut self, d: &VarDeclarator) {
        if let (Some(name), Some(init)) = (d.name.as_ident(), &d.init) {
            let value = match &**init {
                Expr::Lit(Lit::Str(s)) => Value::Str(s.value.to_string()),
                Expr::Lit(Lit::Num(n)) => Value::Num(n.value),
                _ => Value::Other,
            };
            self.0.push((name.id.sym.to_string(), value));
        }
        d.visit_children_with(self);
    }
}

#[derive(Default)]
struct ImmediateCalls(usize);

impl Visit for ImmediateCalls {
    fn visit_call_expr(&mut self, call: &CallExpr) {
        if let Callee::Expr(callee) = &call.callee {
            let mut callee = &**callee;
            while let Expr::Paren(p) = callee {
                callee = &p.expr;
            }
            if matches!(callee, Expr::Fn(_) | Expr::Arrow(_)) && call.args.is_empty() {
                self.0 += 1;
            }
        }
        call.visit_children_with(self);
    }
}
