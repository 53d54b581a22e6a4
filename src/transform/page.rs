// src/transform/page.rs
//
// page.tsx → file route, on the syntax tree.

use swc_ecma_ast::*;
use swc_ecma_visit::{VisitMut, VisitMutWith};
use tracing::debug;

use super::{
    PageTarget, Rewrite, RouteTransformStrategy, attr_name, default_import_local, element_name,
    import_decl, import_source, insert_after_imports, js_string, parse_name, rename_element,
    strip_directive, take_default_component,
};
use crate::error::TransformError;
use crate::model::RouteDescriptor;
use crate::parser::SourceUnit;

/// Props `next/image` understands and a plain `<img>` does not.
const IMAGE_ONLY_PROPS: [&str; 6] = [
    "priority",
    "fill",
    "quality",
    "placeholder",
    "blurDataURL",
    "loading",
];

const ACCESSORS: [&str; 2] = ["params", "searchParams"];

pub struct StructuralPage;

impl RouteTransformStrategy for StructuralPage {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn transform_page(
        &self,
        route: &RouteDescriptor,
        target: &PageTarget,
    ) -> Result<Rewrite, TransformError> {
        transform_page(route, &target.route_id)
    }
}

/// Imports from `next` that were removed, with the local names they bound.
#[derive(Default)]
struct NextImports {
    image: Option<String>,
    link: Option<String>,
}

fn transform_page(route: &RouteDescriptor, route_id: &str) -> Result<Rewrite, TransformError> {
    let mut unit = SourceUnit::parse(parse_name(route), &route.content)?;
    let mut warnings = Vec::new();

    // 1) directives and next imports
    strip_directive(&mut unit.module.body, "use client");
    let next = take_next_imports(&mut unit.module.body);

    // 2) default export
    let (idx, component) = take_default_component(&mut unit.module.body).ok_or_else(|| {
        TransformError::UnexpectedShape("no default-exported component".into())
    })?;
    let name = component.name.unwrap_or_else(|| "Page".to_string());
    let mut function = component.function;

    let was_async = function.is_async;
    let accessors = accessor_props(function.params.first());
    debug!(
        source = %route.source_path,
        component = %name,
        was_async,
        has_params = accessors.params,
        has_search = accessors.search,
        "rewriting page"
    );

    // 3) plain, parameterless, synchronous
    function.params.clear();
    function.is_async = false;
    if was_async {
        function.return_type = None;
    }

    // 4) accessor prologue + re-bound awaited props
    let mut prologue = Vec::new();
    if accessors.params {
        prologue.push(unit.parse_stmt("const params = Route.useParams();")?);
    }
    if accessors.search {
        prologue.push(unit.parse_stmt("const searchParams = Route.useSearch();")?);
    }
    if was_async {
        prologue.push(unit.parse_stmt("const data = Route.useLoaderData();")?);
    }
    for (pat, accessor) in accessors.bindings {
        let mut stmt = unit.parse_stmt(&format!("const binding = {accessor};"))?;
        if let Stmt::Decl(Decl::Var(var)) = &mut stmt {
            if let Some(decl) = var.decls.first_mut() {
                decl.name = pat;
            }
        }
        prologue.push(stmt);
    }
    if let Some(body) = function.body.as_mut() {
        let rebound = take_awaited_accessors(&mut body.stmts);
        prologue.extend(rebound);
        body.stmts.splice(0..0, prologue);
    }

    // 5) re-insert as `function Name() {}`
    let Stmt::Decl(Decl::Fn(mut fn_decl)) = unit.parse_stmt(&format!("function {name}() {{}}"))?
    else {
        return Err(TransformError::UnexpectedShape(format!(
            "invalid component name {name}"
        )));
    };
    fn_decl.function = function;
    unit.module
        .body
        .insert(idx, ModuleItem::Stmt(Stmt::Decl(Decl::Fn(fn_decl))));

    // 6) JSX: next/image → img, next/link href → to
    let image = next.image.clone().unwrap_or_else(|| "Image".to_string());
    unit.module.visit_mut_with(&mut PageJsx {
        image: &image,
        link: next.link.as_deref(),
    });

    // 7) router import + route registration
    let mut specifiers = vec!["createFileRoute".to_string()];
    if let Some(link) = &next.link {
        specifiers.push(if link == "Link" {
            "Link".to_string()
        } else {
            format!("Link as {link}")
        });
    }
    let imports = unit.parse_items(&format!(
        "import {{ {} }} from \"@tanstack/react-router\";",
        specifiers.join(", ")
    ))?;
    unit.module.body.splice(0..0, imports);

    let registration = unit.parse_items(&format!(
        "export const Route = createFileRoute({})({{ component: {name} }});",
        js_string(route_id)
    ))?;
    insert_after_imports(&mut unit.module.body, registration);

    if was_async {
        warnings.push(format!(
            "{}: async component `{name}` is now synchronous; move its data fetching into a route loader",
            route.source_path
        ));
    }

    Ok(Rewrite {
        content: unit.print()?,
        warnings,
    })
}

/// Remove imports from `next` and `next/*`, remembering the Image/Link locals.
fn take_next_imports(body: &mut Vec<ModuleItem>) -> NextImports {
    let mut found = NextImports::default();
    body.retain(|item| {
        let Some(import) = import_decl(item) else {
            return true;
        };
        let source = import_source(import);
        if source != "next" && !source.starts_with("next/") {
            return true;
        }
        match source {
            "next/image" => found.image = default_import_local(import),
            "next/link" => found.link = default_import_local(import),
            _ => {}
        }
        false
    });
    found
}

/// Whether the first parameter destructures `params` / `searchParams`.
/// Which route accessors the page's props pattern reads.
#[derive(Default)]
struct Accessors {
    params: bool,
    search: bool,
    /// Props destructured further, e.g. `{ params: { slug } }`, with the
    /// accessor they read.
    bindings: Vec<(Pat, &'static str)>,
}

fn accessor_props(first: Option<&Param>) -> Accessors {
    let mut found = Accessors::default();
    let Some(Param {
        pat: Pat::Object(pattern),
        ..
    }) = first
    else {
        return found;
    };

    for prop in &pattern.props {
        let (key, value) = match prop {
            ObjectPatProp::KeyValue(KeyValuePatProp {
                key: PropName::Ident(id),
                value,
            }) => (&*id.sym, Some(&**value)),
            ObjectPatProp::Assign(assign) => (&*assign.key.sym, None),
            _ => continue,
        };
        let Some(accessor) = ACCESSORS.into_iter().find(|a| *a == key) else {
            continue;
        };
        match accessor {
            "params" => found.params = true,
            _ => found.search = true,
        }
        let rebound = value.filter(
            |pat| !matches!(pat, Pat::Ident(BindingIdent { id, .. }) if &*id.sym == accessor),
        );
        if let Some(pat) = rebound {
            found.bindings.push((pat.clone(), accessor));
        }
    }
    found
}

/// Pull `const { slug } = await params;` out of the top level of the body and
/// return it as `const { slug } = params;`.
fn take_awaited_accessors(stmts: &mut Vec<Stmt>) -> Vec<Stmt> {
    let mut rebound = Vec::new();
    stmts.retain_mut(|stmt| {
        let Stmt::Decl(Decl::Var(var)) = stmt else {
            return true;
        };
        let (awaited, rest): (Vec<VarDeclarator>, Vec<VarDeclarator>) = var
            .decls
            .drain(..)
            .partition(|decl| decl.init.as_deref().is_some_and(is_awaited_accessor));
        var.decls = rest;
        if !awaited.is_empty() {
            let mut plain = (**var).clone();
            plain.decls = awaited
                .into_iter()
                .map(|mut decl| {
                    if let Some(init) = decl.init.take() {
                        decl.init = Some(match *init {
                            Expr::Await(await_expr) => await_expr.arg,
                            other => Box::new(other),
                        });
                    }
                    decl
                })
                .collect();
            rebound.push(Stmt::Decl(Decl::Var(Box::new(plain))));
        }
        !var.decls.is_empty()
    });
    rebound
}

fn is_awaited_accessor(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Await(AwaitExpr { arg, .. })
            if matches!(&**arg, Expr::Ident(id) if ACCESSORS.contains(&&*id.sym))
    )
}

struct PageJsx<'a> {
    image: &'a str,
    link: Option<&'a str>,
}

impl VisitMut for PageJsx<'_> {
    fn visit_mut_jsx_element(&mut self, el: &mut JSXElement) {
        let is_image = element_name(el) == Some(self.image);
        let is_link = self.link.is_some() && element_name(el) == self.link;

        if is_image {
            rename_element(el, "img");
            el.opening
                .attrs
                .retain(|attr| !attr_name(attr).is_some_and(|n| IMAGE_ONLY_PROPS.contains(&n)));
        } else if is_link {
            for attr in &mut el.opening.attrs {
                if let JSXAttrOrSpread::JSXAttr(JSXAttr {
                    name: JSXAttrName::Ident(id),
                    ..
                }) = attr
                {
                    if &*id.sym == "href" {
                        id.sym = "to".into();
                    }
                }
            }
        }

        el.visit_mut_children_with(self);
    }
}
