// src/transform/page_text.rs
//
// Regex rewrite of page files. Best-effort: it handles the common shapes and
// leaves everything else untouched.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::{PageTarget, Rewrite, RouteTransformStrategy, js_string, parse_name};
use crate::error::TransformError;
use crate::model::RouteDescriptor;
use crate::parser::SourceUnit;
use crate::resolver::route_path_from_file_in;

static DEFAULT_EXPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"export\s+default\s+function\s+(\w+)").unwrap());
static LINK_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"import\s+Link\s+from\s+["']next/link["']"#).unwrap());
static IMAGE_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"import\s+Image\s+from\s+["']next/image["'];?"#).unwrap());
/// `href=` inside a `<Link ...>` opening tag, up to the first `>`.
static LINK_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(<Link\b[^>]*?)\shref=").unwrap());

pub struct TextualPage;

impl RouteTransformStrategy for TextualPage {
    fn name(&self) -> &'static str {
        "textual"
    }

    fn transform_page(
        &self,
        route: &RouteDescriptor,
        target: &PageTarget,
    ) -> Result<Rewrite, TransformError> {
        let route_id = route_path_from_file_in(&target.target_path, &target.route_root);
        Ok(rewrite_page_text(route, &route_id))
    }
}

fn rewrite_page_text(route: &RouteDescriptor, route_id: &str) -> Rewrite {
    let mut text = route.content.clone();
    let mut warnings = Vec::new();

    // 1) router import
    if !text.contains("@tanstack/react-router") {
        text = format!("import {{ createFileRoute }} from \"@tanstack/react-router\";\n\n{text}");
    }

    // 2) default export → registration + plain function
    let replacement = format!(
        "export const Route = createFileRoute({})({{\n  component: $1,\n}});\n\nfunction $1",
        js_string(route_id).replace('$', "$$")
    );
    if DEFAULT_EXPORT_RE.is_match(&text) {
        text = DEFAULT_EXPORT_RE
            .replacen(&text, 1, replacement.as_str())
            .into_owned();
    } else {
        warnings.push(format!(
            "{}: no `export default function` found; register the route manually",
            route.source_path
        ));
    }

    // 3) next/link, href, next/image
    text = LINK_IMPORT_RE
        .replace_all(&text, r#"import { Link } from "@tanstack/react-router""#)
        .into_owned();
    text = LINK_HREF_RE.replace_all(&text, "$1 to=").into_owned();
    if IMAGE_IMPORT_RE.is_match(&text) {
        text = IMAGE_IMPORT_RE
            .replace_all(&text, "// import Image from \"next/image\"")
            .into_owned();
        warnings.push(format!(
            "{}: next/image import commented out; replace <Image> with <img>",
            route.source_path
        ));
    }

    // 4) normalize through the printer when it still parses
    let content = match SourceUnit::parse(parse_name(route), &text).and_then(|unit| unit.print()) {
        Ok(printed) => printed,
        Err(e) => {
            debug!(source = %route.source_path, error = %e, "textual rewrite left unformatted");
            text
        }
    };

    Rewrite { content, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RouteRole;
    use crate::transform::test_support::{descriptor, squash};

    fn target(path: &str) -> PageTarget {
        PageTarget {
            route_id: String::new(),
            target_path: path.to_string(),
            route_root: "src/app".to_string(),
        }
    }

    #[test]
    fn rewrites_default_export_and_link() {
        let route = descriptor(
            "src/app/posts/[id]/page.tsx",
            "/posts/[id]",
            RouteRole::Page,
            r#"import Link from "next/link";

export default function PostPage() {
  return <Link href="/">Home</Link>;
}
"#,
        );
        let out = TextualPage
            .transform_page(&route, &target("src/app/posts/$id.tsx"))
            .unwrap();
        let code = squash(&out.content);

        assert!(code.contains(r#"import { createFileRoute } from "@tanstack/react-router";"#));
        assert!(code.contains(r#"import { Link } from "@tanstack/react-router";"#));
        assert!(code.contains(r#"createFileRoute("/posts/$id")({ component: PostPage"#));
        assert!(code.contains("function PostPage()"));
        assert!(code.contains(r#"<Link to="/">"#));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn only_link_hrefs_become_to() {
        let route = descriptor(
            "src/app/page.tsx",
            "/",
            RouteRole::Page,
            r#"import Link from "next/link";
export default function Home() {
  return <nav><Link className="nav" href="/docs">Docs</Link><a href="https://example.com">Out</a><link rel="icon" href="/favicon.ico" /></nav>;
}
"#,
        );
        let out = TextualPage
            .transform_page(&route, &target("src/app/index.tsx"))
            .unwrap();
        let code = squash(&out.content);

        assert!(code.contains(r#"<Link className="nav" to="/docs">"#));
        assert!(code.contains(r#"<a href="https://example.com">"#));
        assert!(code.contains(r#"<link rel="icon" href="/favicon.ico"/>"#) || code.contains(r#"<link rel="icon" href="/favicon.ico" />"#));
    }

    #[test]
    fn comments_out_image_and_warns() {
        let route = descriptor(
            "src/app/page.tsx",
            "/",
            RouteRole::Page,
            "import Image from 'next/image';\nexport default function Home() { return <Image src=\"/a.png\" />; }\n",
        );
        let out = TextualPage
            .transform_page(&route, &target("src/app/index.tsx"))
            .unwrap();

        assert!(out.content.contains(r#"createFileRoute("/")"#));
        assert!(!out.content.contains("import Image from 'next/image'"));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn unparsable_result_is_returned_as_is() {
        let route = descriptor(
            "src/app/page.tsx",
            "/",
            RouteRole::Page,
            "export default function Broken( {",
        );
        let out = TextualPage
            .transform_page(&route, &target("src/app/index.tsx"))
            .unwrap();
        assert!(out.content.contains("function Broken( {"));
        assert!(out.content.starts_with("import { createFileRoute }"));
    }
}
