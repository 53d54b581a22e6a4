// src/transform/mod.rs
//
// Per-file source rewriting. Nothing in here touches the filesystem: every
// function takes a descriptor (whose content was captured by the analyzer)
// and returns new source text plus warnings.

mod api;
mod layout;
mod page;
mod page_text;

use serde::{Deserialize, Serialize};
use swc_ecma_ast::*;

use crate::error::TransformError;
use crate::model::RouteDescriptor;

pub use page::StructuralPage;
pub use page_text::TextualPage;

/// Which root-route shape the layout is turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ShellVariant {
    /// `shellComponent: RootDocument` wrapping `{children}`, devtools panel plugin
    #[default]
    ShellComponent,
    /// `component: RootComponent` rendering `<Outlet />`
    Component,
}

/// How page files are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PageStrategy {
    /// Syntax-tree rewrite
    #[default]
    Structural,
    /// Regex rewrite, re-printed when the result still parses
    Textual,
}

/// New source text for one route plus anything the user has to finish by hand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rewrite {
    pub content: String,
    pub warnings: Vec<String>,
}

/// Where a page ends up.
#[derive(Debug, Clone)]
pub struct PageTarget {
    /// Identifier registered with `createFileRoute`, e.g. "/blog/$slug"
    pub route_id: String,
    /// Project-relative target file, e.g. "src/app/blog/$slug.tsx"
    pub target_path: String,
    /// Route tree root the target lives under, e.g. "src/app"
    pub route_root: String,
}

pub trait RouteTransformStrategy {
    fn name(&self) -> &'static str;

    fn transform_page(
        &self,
        route: &RouteDescriptor,
        target: &PageTarget,
    ) -> Result<Rewrite, TransformError>;
}

impl PageStrategy {
    pub fn build(self) -> Box<dyn RouteTransformStrategy> {
        match self {
            PageStrategy::Structural => Box::new(StructuralPage),
            PageStrategy::Textual => Box::new(TextualPage),
        }
    }
}

/// Role-specific rewrites with the run's configuration baked in.
pub struct CodeTransformer {
    variant: ShellVariant,
    pages: Box<dyn RouteTransformStrategy>,
}

impl CodeTransformer {
    pub fn new(variant: ShellVariant, strategy: PageStrategy) -> Self {
        Self {
            variant,
            pages: strategy.build(),
        }
    }

    pub fn variant(&self) -> ShellVariant {
        self.variant
    }

    pub fn page_strategy(&self) -> &'static str {
        self.pages.name()
    }

    /// Root `layout.tsx` → `__root.tsx`.
    pub fn root_layout(&self, route: &RouteDescriptor) -> Result<Rewrite, TransformError> {
        layout::transform_root_layout(route, self.variant)
    }

    pub fn page(
        &self,
        route: &RouteDescriptor,
        target: &PageTarget,
    ) -> Result<Rewrite, TransformError> {
        self.pages.transform_page(route, target)
    }

    /// `route.ts` → server-handler stub. Never fails.
    pub fn api(&self, route: &RouteDescriptor, route_id: &str) -> Rewrite {
        api::transform_api_route(route, route_id)
    }
}

// ---------------------------------------------------------------------------
// AST helpers shared by the rewrites

/// A default-exported function component lifted out of a module.
pub(crate) struct DefaultComponent {
    pub name: Option<String>,
    pub function: Box<Function>,
}

/// Remove the default-exported component from `body` and return it with the
/// index it occupied. Handles `export default function X() {}`,
/// `export default () => ...` and a `function X() {}` or `const X = () => ...`
/// exported later with `export default X`. Arrow functions come back as plain
/// functions.
pub(crate) fn take_default_component(
    body: &mut Vec<ModuleItem>,
) -> Option<(usize, DefaultComponent)> {
    let direct = body.iter().position(|item| match item {
        ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(ExportDefaultDecl {
            decl: DefaultDecl::Fn(_),
            ..
        })) => true,
        ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(ExportDefaultExpr { expr, .. })) => {
            is_function_expr(expr)
        }
        _ => false,
    });
    if let Some(idx) = direct {
        let (name, function) = match body.remove(idx) {
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(ExportDefaultDecl {
                decl: DefaultDecl::Fn(fn_expr),
                ..
            })) => (fn_expr.ident.map(|id| id.sym.to_string()), fn_expr.function),
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(ExportDefaultExpr {
                expr, ..
            })) => into_function(expr)?,
            _ => return None,
        };
        return Some((idx, DefaultComponent { name, function }));
    }

    let (export_idx, name) = body.iter().enumerate().find_map(|(i, item)| match item {
        ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(ExportDefaultExpr {
            expr, ..
        })) => match &**expr {
            Expr::Ident(id) => Some((i, id.sym.to_string())),
            _ => None,
        },
        _ => None,
    })?;
    let decl_idx = body.iter().position(|item| match item {
        ModuleItem::Stmt(Stmt::Decl(Decl::Fn(f))) => *f.ident.sym == *name,
        ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) => {
            var.decls.iter().any(|decl| binds_function(decl, &name))
        }
        _ => false,
    })?;

    body.remove(export_idx);
    let decl_idx = if export_idx < decl_idx { decl_idx - 1 } else { decl_idx };
    let function = if let ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) = &mut body[decl_idx] {
        let at = var.decls.iter().position(|decl| binds_function(decl, &name))?;
        let init = var.decls.remove(at).init?;
        if var.decls.is_empty() {
            body.remove(decl_idx);
        }
        into_function(init)?.1
    } else {
        match body.remove(decl_idx) {
            ModuleItem::Stmt(Stmt::Decl(Decl::Fn(fn_decl))) => fn_decl.function,
            _ => return None,
        }
    };
    Some((
        decl_idx,
        DefaultComponent {
            name: Some(name),
            function,
        },
    ))
}

fn is_function_expr(expr: &Expr) -> bool {
    matches!(unwrap_expr(expr), Expr::Arrow(_) | Expr::Fn(_))
}

/// `const <name> = () => ...` or `const <name> = function () {}`.
fn binds_function(decl: &VarDeclarator, name: &str) -> bool {
    matches!(&decl.name, Pat::Ident(BindingIdent { id, .. }) if &*id.sym == name)
        && decl.init.as_deref().is_some_and(is_function_expr)
}

/// Owned counterpart of [`unwrap_expr`] for function-valued expressions.
fn into_function(expr: Box<Expr>) -> Option<(Option<String>, Box<Function>)> {
    match *expr {
        Expr::Fn(FnExpr { ident, function }) => Some((ident.map(|id| id.sym.to_string()), function)),
        Expr::Arrow(arrow) => Some((None, Box::new(arrow_function(arrow)))),
        Expr::Paren(ParenExpr { expr, .. })
        | Expr::TsAs(TsAsExpr { expr, .. })
        | Expr::TsSatisfies(TsSatisfiesExpr { expr, .. })
        | Expr::TsConstAssertion(TsConstAssertion { expr, .. }) => into_function(expr),
        _ => None,
    }
}

/// `(a) => expr` as `function (a) { return expr; }`.
fn arrow_function(arrow: ArrowExpr) -> Function {
    let span = arrow.span;
    let body = match *arrow.body {
        BlockStmtOrExpr::BlockStmt(block) => block,
        BlockStmtOrExpr::Expr(expr) => BlockStmt {
            span,
            stmts: vec![Stmt::Return(ReturnStmt {
                span,
                arg: Some(expr),
            })],
        },
    };
    Function {
        params: arrow
            .params
            .into_iter()
            .map(|pat| Param {
                span,
                decorators: vec![],
                pat,
            })
            .collect(),
        decorators: vec![],
        span,
        body: Some(body),
        is_generator: arrow.is_generator,
        is_async: arrow.is_async,
        type_params: arrow.type_params,
        return_type: arrow.return_type,
    }
}

pub(crate) fn import_decl(item: &ModuleItem) -> Option<&ImportDecl> {
    match item {
        ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => Some(import),
        _ => None,
    }
}

pub(crate) fn import_source(import: &ImportDecl) -> &str {
    &import.src.value
}

/// Local name bound by a default import, e.g. `Image` in `import Image from "next/image"`.
pub(crate) fn default_import_local(import: &ImportDecl) -> Option<String> {
    import.specifiers.iter().find_map(|spec| match spec {
        ImportSpecifier::Default(default) => Some(default.local.sym.to_string()),
        _ => None,
    })
}

pub(crate) fn import_locals(import: &ImportDecl) -> Vec<String> {
    import
        .specifiers
        .iter()
        .map(|spec| match spec {
            ImportSpecifier::Named(named) => named.local.sym.to_string(),
            ImportSpecifier::Default(default) => default.local.sym.to_string(),
            ImportSpecifier::Namespace(ns) => ns.local.sym.to_string(),
        })
        .collect()
}

/// Index of the first item that is not an import.
pub(crate) fn after_imports(body: &[ModuleItem]) -> usize {
    body.iter()
        .position(|item| import_decl(item).is_none())
        .unwrap_or(body.len())
}

pub(crate) fn insert_after_imports(body: &mut Vec<ModuleItem>, items: Vec<ModuleItem>) {
    let at = after_imports(body);
    body.splice(at..at, items);
}

/// Drop top-level `"use client"`-style directives. Returns whether any was found.
pub(crate) fn strip_directive(body: &mut Vec<ModuleItem>, directive: &str) -> bool {
    let before = body.len();
    body.retain(|item| {
        !matches!(
            item,
            ModuleItem::Stmt(Stmt::Expr(ExprStmt { expr, .. }))
                if matches!(&**expr, Expr::Lit(Lit::Str(s)) if *s.value == *directive)
        )
    });
    before != body.len()
}

pub(crate) fn element_name(el: &JSXElement) -> Option<&str> {
    match &el.opening.name {
        JSXElementName::Ident(id) => Some(&*id.sym),
        _ => None,
    }
}

pub(crate) fn rename_element(el: &mut JSXElement, to: &str) {
    if let JSXElementName::Ident(id) = &mut el.opening.name {
        id.sym = to.into();
    }
    if let Some(JSXClosingElement {
        name: JSXElementName::Ident(id),
        ..
    }) = &mut el.closing
    {
        id.sym = to.into();
    }
}

pub(crate) fn attr_name(attr: &JSXAttrOrSpread) -> Option<&str> {
    match attr {
        JSXAttrOrSpread::JSXAttr(JSXAttr {
            name: JSXAttrName::Ident(id),
            ..
        }) => Some(&*id.sym),
        _ => None,
    }
}

/// Strip parentheses and TS-only wrappers (`as`, `satisfies`, `as const`).
pub(crate) fn unwrap_expr(mut expr: &Expr) -> &Expr {
    loop {
        expr = match expr {
            Expr::Paren(paren) => &*paren.expr,
            Expr::TsAs(as_expr) => &*as_expr.expr,
            Expr::TsSatisfies(sat) => &*sat.expr,
            Expr::TsConstAssertion(assertion) => &*assertion.expr,
            _ => return expr,
        };
    }
}

pub(crate) fn jsx_of_mut(expr: &mut Expr) -> Option<&mut JSXElement> {
    match expr {
        Expr::JSXElement(el) => Some(&mut **el),
        Expr::Paren(paren) => jsx_of_mut(&mut paren.expr),
        _ => None,
    }
}

/// JSX returned by the last top-level `return` of a function body.
pub(crate) fn returned_jsx_mut(body: &mut BlockStmt) -> Option<&mut JSXElement> {
    body.stmts.iter_mut().rev().find_map(|stmt| match stmt {
        Stmt::Return(ReturnStmt { arg: Some(arg), .. }) => jsx_of_mut(arg),
        _ => None,
    })
}

/// Double-quoted JS string literal.
pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// Parse-able file name for a route source, keeping its extension.
pub(crate) fn parse_name(route: &RouteDescriptor) -> &str {
    route
        .source_path
        .rsplit('/')
        .next()
        .unwrap_or(&route.source_path)
}
