// src/transform/layout.rs
//
// Root layout.tsx → __root.tsx.
//
//   export const metadata = {...}        -> head: () => ({ meta, links })
//   export default function RootLayout   -> RootDocument (shellComponent)
//                                           or RootComponent (component)
//   import "./globals.css"               -> import appCss from "./globals.css?url"

use std::collections::HashSet;

use swc_ecma_ast::*;
use tracing::debug;

use super::{
    Rewrite, ShellVariant, element_name, import_decl, import_locals, import_source,
    insert_after_imports, js_string, parse_name, returned_jsx_mut, take_default_component,
    unwrap_expr,
};
use crate::error::TransformError;
use crate::model::RouteDescriptor;
use crate::parser::SourceUnit;

const DEFAULT_TITLE: &str = "TanStack Start App";
const DEFAULT_STYLESHEET: &str = "./globals.css";

/// What the head accessor is built from.
#[derive(Debug, Default, PartialEq, Eq)]
struct HeadData {
    title: Option<String>,
    description: Option<String>,
    /// Metadata keys with no head() counterpart.
    ignored: Vec<String>,
}

pub(super) fn transform_root_layout(
    route: &RouteDescriptor,
    variant: ShellVariant,
) -> Result<Rewrite, TransformError> {
    let mut unit = SourceUnit::parse(parse_name(route), &route.content)?;
    let mut warnings = Vec::new();
    let body = &mut unit.module.body;

    // 1) metadata export
    let metadata = take_metadata(body);
    let head = metadata.as_deref().map(head_data).unwrap_or_default();
    if !head.ignored.is_empty() {
        warnings.push(format!(
            "metadata keys {} are not migrated; add them to head() by hand",
            head.ignored.join(", ")
        ));
    }

    // 2) next / next/font imports, stylesheet imports
    let font_loaders = take_next_imports(body);
    let stylesheets = take_stylesheet_imports(body);

    // 3) font loader declarations
    let font_vars = take_font_declarations(body, &font_loaders);
    debug!(
        source = %route.source_path,
        ?font_vars,
        stylesheets = stylesheets.len(),
        has_metadata = metadata.is_some(),
        "rewriting root layout"
    );

    // 4) default export + its returned JSX
    let (idx, component) = take_default_component(body).ok_or_else(|| {
        TransformError::UnexpectedShape("no default-exported layout component".into())
    })?;
    let mut function = component.function;
    let root = function
        .body
        .as_mut()
        .and_then(returned_jsx_mut)
        .ok_or_else(|| TransformError::UnexpectedShape("root layout does not return JSX".into()))?;

    // 5) document JSX
    let parts = JsxParts::new(&unit, variant)?;
    rewrite_document(root, &parts, variant, &font_vars, &mut warnings);

    // 6) replacement function
    let signature = match variant {
        ShellVariant::ShellComponent => {
            "function RootDocument({ children }: { children: React.ReactNode }) {}"
        }
        ShellVariant::Component => "function RootComponent() {}",
    };
    let Stmt::Decl(Decl::Fn(mut fn_decl)) = unit.parse_stmt(signature)? else {
        return Err(TransformError::UnexpectedShape("invalid component template".into()));
    };
    fn_decl.function.body = function.body.take();
    let body = &mut unit.module.body;
    body.insert(idx, ModuleItem::Stmt(Stmt::Decl(Decl::Fn(fn_decl))));

    // 7) imports, then the route registration right after them
    let css_sources = if stylesheets.is_empty() {
        vec![DEFAULT_STYLESHEET.to_string()]
    } else {
        stylesheets
    };
    let css_names: Vec<String> = (1..=css_sources.len())
        .map(|n| if n == 1 { "appCss".to_string() } else { format!("appCss{n}") })
        .collect();

    let imports = unit.parse_items(&import_block(variant, &css_sources, &css_names))?;
    let registration = unit.parse_items(&route_registration(variant, &head, &css_names))?;
    let body = &mut unit.module.body;
    body.splice(0..0, imports);
    insert_after_imports(body, registration);

    Ok(Rewrite {
        content: unit.print()?,
        warnings,
    })
}

/// Remove `export const metadata = ...` and return its initializer.
fn take_metadata(body: &mut Vec<ModuleItem>) -> Option<Box<Expr>> {
    let mut found = None;
    body.retain_mut(|item| {
        let ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl {
            decl: Decl::Var(var),
            ..
        })) = item
        else {
            return true;
        };
        var.decls.retain_mut(|decl| {
            let is_metadata =
                matches!(&decl.name, Pat::Ident(BindingIdent { id, .. }) if &*id.sym == "metadata");
            if is_metadata && found.is_none() {
                found = decl.init.take();
            }
            !is_metadata
        });
        !var.decls.is_empty()
    });
    found
}

fn head_data(metadata: &Expr) -> HeadData {
    let Expr::Object(object) = unwrap_expr(metadata) else {
        return HeadData::default();
    };
    let mut head = HeadData::default();
    for (key, value) in object_props(object) {
        match key.as_str() {
            "title" => {
                head.title = static_string(value).or_else(|| {
                    // { default: "...", template: "%s | Site" }
                    match unwrap_expr(value) {
                        Expr::Object(inner) => object_props(inner)
                            .find(|(k, _)| k == "default")
                            .and_then(|(_, v)| static_string(v)),
                        _ => None,
                    }
                })
            }
            "description" => head.description = static_string(value),
            _ => head.ignored.push(key),
        }
    }
    head
}

fn object_props(object: &ObjectLit) -> impl Iterator<Item = (String, &Expr)> {
    object.props.iter().filter_map(|prop| match prop {
        PropOrSpread::Prop(prop) => match &**prop {
            Prop::KeyValue(KeyValueProp { key, value }) => {
                let key = match key {
                    PropName::Ident(id) => id.sym.to_string(),
                    PropName::Str(s) => s.value.to_string(),
                    _ => return None,
                };
                Some((key, &**value))
            }
            _ => None,
        },
        PropOrSpread::Spread(_) => None,
    })
}

fn static_string(expr: &Expr) -> Option<String> {
    match unwrap_expr(expr) {
        Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
        Expr::Tpl(tpl) if tpl.exprs.is_empty() => tpl
            .quasis
            .first()
            .and_then(|q| q.cooked.as_ref())
            .map(|cooked| cooked.to_string()),
        _ => None,
    }
}

/// Drop imports from `next` and `next/font/*`; return the loader names that
/// `next/font/*` imports bound.
fn take_next_imports(body: &mut Vec<ModuleItem>) -> HashSet<String> {
    let mut loaders = HashSet::new();
    body.retain(|item| {
        let Some(import) = import_decl(item) else {
            return true;
        };
        let source = import_source(import);
        if source.starts_with("next/font/") {
            loaders.extend(import_locals(import));
            return false;
        }
        source != "next"
    });
    loaders
}

/// Drop side-effect `.css` imports and return their sources in order.
fn take_stylesheet_imports(body: &mut Vec<ModuleItem>) -> Vec<String> {
    let mut sources = Vec::new();
    body.retain(|item| {
        let Some(import) = import_decl(item) else {
            return true;
        };
        let source = import_source(import);
        if import.specifiers.is_empty() && source.ends_with(".css") {
            sources.push(source.to_string());
            return false;
        }
        true
    });
    sources
}

fn is_font_loader(callee: &str, loaders: &HashSet<String>) -> bool {
    let lower = callee.to_ascii_lowercase();
    loaders.contains(callee) || lower.contains("font") || lower.contains("geist")
}

/// Remove `const inter = Inter({...})` and friends; return the variable names.
fn take_font_declarations(body: &mut Vec<ModuleItem>, loaders: &HashSet<String>) -> HashSet<String> {
    let mut vars = HashSet::new();
    body.retain_mut(|item| {
        let ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) = item else {
            return true;
        };
        var.decls.retain(|decl| {
            let Pat::Ident(BindingIdent { id, .. }) = &decl.name else {
                return true;
            };
            let callee = decl.init.as_deref().and_then(|init| match unwrap_expr(init) {
                Expr::Call(CallExpr {
                    callee: Callee::Expr(callee),
                    ..
                }) => match &**callee {
                    Expr::Ident(callee) => Some(callee.sym.to_string()),
                    _ => None,
                },
                _ => None,
            });
            match callee {
                Some(callee) if is_font_loader(&callee, loaders) => {
                    vars.insert(id.sym.to_string());
                    false
                }
                _ => true,
            }
        });
        !var.decls.is_empty()
    });
    vars
}

/// Pre-parsed elements spliced into the document.
struct JsxParts {
    head_content: Box<JSXElement>,
    head: Box<JSXElement>,
    /// `<Outlet />` or `{children}`
    slot: JSXElementChild,
    /// Appended to `<body>` in order
    body_tail: Vec<Box<JSXElement>>,
}

impl JsxParts {
    fn new(unit: &SourceUnit, variant: ShellVariant) -> Result<Self, TransformError> {
        let scripts = unit.parse_jsx("<Scripts />")?;
        let (slot, body_tail) = match variant {
            ShellVariant::ShellComponent => {
                let mut holder = unit.parse_jsx("<body>{children}</body>")?;
                let slot = holder.children.pop().ok_or_else(|| {
                    TransformError::UnexpectedShape("empty children template".into())
                })?;
                let devtools = unit.parse_jsx(
                    r#"<TanStackDevtools
                        config={{ position: "bottom-right" }}
                        plugins={[{ name: "Tanstack Router", render: <TanStackRouterDevtoolsPanel /> }]}
                    />"#,
                )?;
                (slot, vec![devtools, scripts])
            }
            ShellVariant::Component => {
                let outlet = unit.parse_jsx("<Outlet />")?;
                let devtools = unit.parse_jsx("<TanStackRouterDevtools />")?;
                (JSXElementChild::JSXElement(outlet), vec![scripts, devtools])
            }
        };
        Ok(Self {
            head_content: unit.parse_jsx("<HeadContent />")?,
            head: unit.parse_jsx("<head><HeadContent /></head>")?,
            slot,
            body_tail,
        })
    }
}

fn rewrite_document(
    root: &mut JSXElement,
    parts: &JsxParts,
    variant: ShellVariant,
    font_vars: &HashSet<String>,
    warnings: &mut Vec<String>,
) {
    // 1) children slots
    let slots = match variant {
        ShellVariant::ShellComponent => count_children_slots(root),
        ShellVariant::Component => replace_children_slots(root, &parts.slot),
    };

    // 2) <html> and <body>
    if let Some(html) = find_element_mut(root, "html") {
        strip_font_class(html, font_vars);
    }
    match find_element_mut(root, "body") {
        Some(body) => {
            strip_font_class(body, font_vars);
            if slots == 0 {
                body.children.insert(0, parts.slot.clone());
            }
            body.children.extend(
                parts
                    .body_tail
                    .iter()
                    .map(|el| JSXElementChild::JSXElement(el.clone())),
            );
        }
        None => warnings.push(
            "root layout has no <body>; add <Scripts /> and the devtools manually".to_string(),
        ),
    }

    // 3) <head>
    if let Some(head) = find_element_mut(root, "head") {
        head.children
            .push(JSXElementChild::JSXElement(parts.head_content.clone()));
        return;
    }
    match find_element_mut(root, "html") {
        Some(html) => {
            let at = html
                .children
                .iter()
                .position(|child| {
                    matches!(child, JSXElementChild::JSXElement(el) if element_name(el) == Some("body"))
                })
                .unwrap_or(0);
            html.children
                .insert(at, JSXElementChild::JSXElement(parts.head.clone()));
        }
        None => warnings.push(
            "root layout has no <html>; add <HeadContent /> manually".to_string(),
        ),
    }
}

fn find_element_mut<'a>(el: &'a mut JSXElement, name: &str) -> Option<&'a mut JSXElement> {
    if element_name(el) == Some(name) {
        return Some(el);
    }
    for child in el.children.iter_mut() {
        if let JSXElementChild::JSXElement(inner) = child {
            if let Some(found) = find_element_mut(inner, name) {
                return Some(found);
            }
        }
    }
    None
}

fn is_children_slot(child: &JSXElementChild) -> bool {
    matches!(
        child,
        JSXElementChild::JSXExprContainer(JSXExprContainer {
            expr: JSXExpr::Expr(expr),
            ..
        }) if matches!(&**expr, Expr::Ident(id) if &*id.sym == "children")
    )
}

fn count_children_slots(el: &JSXElement) -> usize {
    el.children
        .iter()
        .map(|child| match child {
            JSXElementChild::JSXElement(inner) => count_children_slots(inner),
            other => usize::from(is_children_slot(other)),
        })
        .sum()
}

fn replace_children_slots(el: &mut JSXElement, with: &JSXElementChild) -> usize {
    let mut replaced = 0;
    for child in el.children.iter_mut() {
        if is_children_slot(child) {
            *child = with.clone();
            replaced += 1;
        } else if let JSXElementChild::JSXElement(inner) = child {
            replaced += replace_children_slots(inner, with);
        }
    }
    replaced
}

/// Whether `expr` reads a font loader result (`inter.variable`, `geistSans.className`).
fn is_font_expr(expr: &Expr, font_vars: &HashSet<String>) -> bool {
    let object = match unwrap_expr(expr) {
        Expr::Member(MemberExpr { obj, .. }) => match &**obj {
            Expr::Ident(id) => id.sym.to_string(),
            _ => return false,
        },
        Expr::Ident(id) => id.sym.to_string(),
        _ => return false,
    };
    let lower = object.to_ascii_lowercase();
    font_vars.contains(&object) || lower.contains("font") || lower.contains("geist")
}

/// Remove font references from an element's `className`. The attribute goes
/// away when nothing but whitespace is left.
fn strip_font_class(el: &mut JSXElement, font_vars: &HashSet<String>) {
    el.opening.attrs.retain_mut(|attr| {
        let JSXAttrOrSpread::JSXAttr(JSXAttr {
            name: JSXAttrName::Ident(name),
            value: Some(JSXAttrValue::JSXExprContainer(JSXExprContainer {
                expr: JSXExpr::Expr(expr),
                ..
            })),
            ..
        }) = attr
        else {
            return true;
        };
        if &*name.sym != "className" {
            return true;
        }

        match &mut **expr {
            Expr::Tpl(tpl) => {
                strip_font_quasis(tpl, font_vars);
                let only_whitespace = tpl.exprs.is_empty()
                    && tpl.quasis.iter().all(|q| q.raw.trim().is_empty());
                !only_whitespace
            }
            other => !is_font_expr(other, font_vars),
        }
    });
}

/// Drop font expressions from a template literal, merging the text around
/// each removed expression.
fn strip_font_quasis(tpl: &mut Tpl, font_vars: &HashSet<String>) {
    let mut i = 0;
    while i < tpl.exprs.len() {
        if !is_font_expr(&tpl.exprs[i], font_vars) || i + 1 >= tpl.quasis.len() {
            i += 1;
            continue;
        }
        tpl.exprs.remove(i);
        let next = tpl.quasis.remove(i + 1);
        let quasi = &mut tpl.quasis[i];
        quasi.raw = format!("{}{}", quasi.raw, next.raw).into();
        quasi.cooked = match (quasi.cooked.take(), next.cooked) {
            (Some(a), Some(b)) => Some(format!("{a}{b}").into()),
            _ => None,
        };
        quasi.tail = next.tail;
    }

    if tpl.exprs.is_empty() {
        if let Some(quasi) = tpl.quasis.first_mut() {
            let collapsed = quasi.raw.split_whitespace().collect::<Vec<_>>().join(" ");
            quasi.raw = collapsed.clone().into();
            quasi.cooked = Some(collapsed.into());
        }
    }
}

fn import_block(variant: ShellVariant, css_sources: &[String], css_names: &[String]) -> String {
    let mut out = String::new();
    match variant {
        ShellVariant::ShellComponent => {
            out.push_str(
                "import { HeadContent, Scripts, createRootRoute } from \"@tanstack/react-router\";\n",
            );
            out.push_str(
                "import { TanStackRouterDevtoolsPanel } from \"@tanstack/react-router-devtools\";\n",
            );
            out.push_str("import { TanStackDevtools } from \"@tanstack/react-devtools\";\n");
        }
        ShellVariant::Component => {
            out.push_str(
                "import { HeadContent, Outlet, Scripts, createRootRoute } from \"@tanstack/react-router\";\n",
            );
            out.push_str(
                "import { TanStackRouterDevtools } from \"@tanstack/react-router-devtools\";\n",
            );
        }
    }
    for (source, name) in css_sources.iter().zip(css_names) {
        out.push_str(&format!("import {name} from {};\n", js_string(&format!("{source}?url"))));
    }
    out
}

fn route_registration(variant: ShellVariant, head: &HeadData, css_names: &[String]) -> String {
    let mut meta = vec![
        r#"{ charSet: "utf-8" }"#.to_string(),
        r#"{ name: "viewport", content: "width=device-width, initial-scale=1" }"#.to_string(),
        format!(
            "{{ title: {} }}",
            js_string(head.title.as_deref().unwrap_or(DEFAULT_TITLE))
        ),
    ];
    if let Some(description) = &head.description {
        meta.push(format!(
            "{{ name: \"description\", content: {} }}",
            js_string(description)
        ));
    }
    let links: Vec<String> = css_names
        .iter()
        .map(|name| format!("{{ rel: \"stylesheet\", href: {name} }}"))
        .collect();
    let component = match variant {
        ShellVariant::ShellComponent => "shellComponent: RootDocument",
        ShellVariant::Component => "component: RootComponent",
    };

    format!(
        "export const Route = createRootRoute({{\n  head: () => ({{\n    meta: [{}],\n    links: [{}],\n  }}),\n  {component},\n}});\n",
        meta.join(", "),
        links.join(", ")
    )
}
