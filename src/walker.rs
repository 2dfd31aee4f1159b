//! Depth-first walk over a program that records, next to the tree, which
//! syntactic context every visited node sits in.
//!
//! Parent links never live inside the AST. The walker keeps them in an
//! [`Ancestry`] arena: one record per visited node, holding the node's
//! [`Shape`] and the index of its parent record. Cloning or printing the
//! program therefore never sees them, and the arena is dropped with the
//! unit that built it.

use swc_core::ecma::{
    ast::*,
    visit::{VisitMut, VisitMutWith},
};

use crate::error::{Error, Result};

// -----------------------------------------------------------------------------
// Ancestry arena
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AncestorId(u32);

impl AncestorId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The part of a node's shape the enclosing-name lookup cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Root,
    /// `function name() {}` as a declaration.
    FunctionDecl { name: String },
    /// Function or arrow expression, or the body of an object/class method.
    Function,
    Call,
    /// Variable declarator; `name` is set for plain identifier bindings.
    Binding { name: Option<String> },
    /// Object property or class member; `key` is set for static keys.
    Property { key: Option<String> },
    Other,
}

#[derive(Debug, Clone)]
struct Ancestor {
    shape: Shape,
    parent: Option<AncestorId>,
}

#[derive(Debug, Clone)]
pub struct Ancestry {
    nodes: Vec<Ancestor>,
}

impl Default for Ancestry {
    fn default() -> Self {
        Self::new()
    }
}

impl Ancestry {
    pub fn new() -> Self {
        Self {
            nodes: vec![Ancestor {
                shape: Shape::Root,
                parent: None,
            }],
        }
    }

    pub fn root(&self) -> AncestorId {
        AncestorId(0)
    }

    /// Add a record under `parent`. The link is fixed from here on.
    pub fn push(&mut self, shape: Shape, parent: AncestorId) -> AncestorId {
        let id = AncestorId(self.nodes.len() as u32);
        self.nodes.push(Ancestor {
            shape,
            parent: Some(parent),
        });
        id
    }

    pub fn shape(&self, id: AncestorId) -> &Shape {
        &self.nodes[id.index()].shape
    }

    pub fn parent(&self, id: AncestorId) -> Option<AncestorId> {
        self.nodes[id.index()].parent
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `id` followed by each of its ancestors up to the root.
    pub fn climb(&self, id: AncestorId) -> impl Iterator<Item = AncestorId> + '_ {
        std::iter::successors(Some(id), move |&id| self.parent(id))
    }
}

// -----------------------------------------------------------------------------
// Visitor seam
// -----------------------------------------------------------------------------

/// Callbacks the walker invokes once per node, before the node's children.
///
/// `at` is the node's own record in `ancestry`. A callback may rewrite the
/// node in place; the walker then continues into the children of whatever
/// the node has become. Returning an error aborts the whole walk.
pub trait SiteVisitor {
    fn visit_expr(&mut self, expr: &mut Expr, at: AncestorId, ancestry: &Ancestry) -> Result<()>;

    fn visit_stmt(&mut self, _stmt: &mut Stmt, _at: AncestorId, _ancestry: &Ancestry) -> Result<()> {
        Ok(())
    }
}

/// Walk `program`, calling `visitor` on every statement and expression.
pub fn walk<V: SiteVisitor>(program: &mut Program, visitor: &mut V) -> Result<Ancestry> {
    let ancestry = Ancestry::new();
    let mut walker = TreeWalker {
        cursor: ancestry.root(),
        ancestry,
        visitor,
        failure: None,
    };
    program.visit_mut_with(&mut walker);
    match walker.failure {
        Some(err) => Err(err),
        None => Ok(walker.ancestry),
    }
}

struct TreeWalker<'v, V> {
    visitor: &'v mut V,
    ancestry: Ancestry,
    cursor: AncestorId,
    failure: Option<Error>,
}

impl<V: SiteVisitor> TreeWalker<'_, V> {
    fn within<N: VisitMutWith<Self> + ?Sized>(&mut self, shape: Shape, node: &mut N) {
        let prev = self.cursor;
        self.cursor = self.ancestry.push(shape, prev);
        node.visit_mut_children_with(self);
        self.cursor = prev;
    }

    /// Walk a property or class member under a `Property` record. Method
    /// bodies also get a `Function` record.
    fn keyed<N: VisitMutWith<Self> + ?Sized>(
        &mut self,
        key: Option<String>,
        method: bool,
        node: &mut N,
    ) {
        let prev = self.cursor;
        self.cursor = self.ancestry.push(Shape::Property { key }, prev);
        if method {
            self.within(Shape::Function, node);
        } else {
            node.visit_mut_children_with(self);
        }
        self.cursor = prev;
    }

    fn fail(&mut self, err: Error) {
        self.failure.get_or_insert(err);
    }
}

fn prop_key(key: &PropName) -> Option<String> {
    match key {
        PropName::Ident(i) => Some(i.sym.to_string()),
        PropName::Str(s) => Some(s.value.to_string()),
        PropName::Num(n) => Some(n.value.to_string()),
        PropName::Computed(_) | PropName::BigInt(_) => None,
    }
}

impl<V: SiteVisitor> VisitMut for TreeWalker<'_, V> {
    fn visit_mut_stmt(&mut self, stmt: &mut Stmt) {
        if self.failure.is_some() {
            return;
        }
        let prev = self.cursor;
        self.cursor = self.ancestry.push(Shape::Other, prev);
        match self.visitor.visit_stmt(stmt, self.cursor, &self.ancestry) {
            Ok(()) => stmt.visit_mut_children_with(self),
            Err(err) => self.fail(err),
        }
        self.cursor = prev;
    }

    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        if self.failure.is_some() {
            return;
        }
        let shape = match expr {
            // Parentheses have no node of their own in the shape we track.
            Expr::Paren(_) => {
                expr.visit_mut_children_with(self);
                return;
            }
            Expr::Fn(_) | Expr::Arrow(_) => Shape::Function,
            Expr::Call(_) => Shape::Call,
            _ => Shape::Other,
        };
        let prev = self.cursor;
        self.cursor = self.ancestry.push(shape, prev);
        match self.visitor.visit_expr(expr, self.cursor, &self.ancestry) {
            Ok(()) => expr.visit_mut_children_with(self),
            Err(err) => self.fail(err),
        }
        self.cursor = prev;
    }

    fn visit_mut_fn_decl(&mut self, decl: &mut FnDecl) {
        if self.failure.is_some() {
            return;
        }
        let name = decl.ident.sym.to_string();
        self.within(Shape::FunctionDecl { name }, decl);
    }

    fn visit_mut_export_default_decl(&mut self, decl: &mut ExportDefaultDecl) {
        if self.failure.is_some() {
            return;
        }
        let shape = match &decl.decl {
            DefaultDecl::Fn(FnExpr {
                ident: Some(ident), ..
            }) => Shape::FunctionDecl {
                name: ident.sym.to_string(),
            },
            DefaultDecl::Fn(_) => Shape::Function,
            _ => return decl.visit_mut_children_with(self),
        };
        self.within(shape, decl);
    }

    fn visit_mut_var_declarator(&mut self, decl: &mut VarDeclarator) {
        if self.failure.is_some() {
            return;
        }
        let name = decl.name.as_ident().map(|b| b.id.sym.to_string());
        self.within(Shape::Binding { name }, decl);
    }

    fn visit_mut_prop(&mut self, prop: &mut Prop) {
        if self.failure.is_some() {
            return;
        }
        let (key, method) = match &*prop {
            Prop::KeyValue(p) => (prop_key(&p.key), false),
            Prop::Method(p) => (prop_key(&p.key), true),
            Prop::Getter(p) => (prop_key(&p.key), true),
            Prop::Setter(p) => (prop_key(&p.key), true),
            Prop::Shorthand(i) => (Some(i.sym.to_string()), false),
            Prop::Assign(p) => (Some(p.key.sym.to_string()), false),
        };
        self.keyed(key, method, prop);
    }

    fn visit_mut_class_method(&mut self, method: &mut ClassMethod) {
        if self.failure.is_some() {
            return;
        }
        let key = prop_key(&method.key);
        self.keyed(key, true, method);
    }

    fn visit_mut_private_method(&mut self, method: &mut PrivateMethod) {
        if self.failure.is_some() {
            return;
        }
        let key = Some(format!("#{}", method.key.name));
        self.keyed(key, true, method);
    }

    fn visit_mut_constructor(&mut self, ctor: &mut Constructor) {
        if self.failure.is_some() {
            return;
        }
        let key = prop_key(&ctor.key);
        self.keyed(key, true, ctor);
    }

    // Class fields: a function value is named after the field, like an
    // object property value.
    fn visit_mut_class_prop(&mut self, prop: &mut ClassProp) {
        if self.failure.is_some() {
            return;
        }
        let key = prop_key(&prop.key);
        self.keyed(key, false, prop);
    }

    fn visit_mut_private_prop(&mut self, prop: &mut PrivateProp) {
        if self.failure.is_some() {
            return;
        }
        let key = Some(format!("#{}", prop.key.name));
        self.keyed(key, false, prop);
    }
}
