// src/transform/api.rs
use regex::Regex;
use std::sync::LazyLock;

use super::{Rewrite, js_string};
use crate::model::RouteDescriptor;

static HTTP_EXPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"export\s+(?:async\s+)?(?:function\s+|const\s+|let\s+)(GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\b",
    )
    .unwrap()
});

/// HTTP methods a route handler exports, in source order, deduplicated.
pub(super) fn exported_methods(source: &str) -> Vec<String> {
    let mut methods: Vec<String> = Vec::new();
    for caps in HTTP_EXPORT_RE.captures_iter(source) {
        let method = caps[1].to_string();
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    methods
}

/// Fixed-shape server handler stub; the original handler logic is not ported.
pub(super) fn transform_api_route(route: &RouteDescriptor, route_id: &str) -> Rewrite {
    let content = format!(
        r#"import {{ createFileRoute }} from "@tanstack/react-router";

export const Route = createFileRoute({})({{
  server: {{
    handlers: {{
      GET: async () => {{
        return Response.json({{ message: "Hello" }});
      }},
    }},
  }},
}});
"#,
        js_string(route_id)
    );

    let methods = exported_methods(&route.content);
    let exported = if methods.is_empty() {
        "no exported HTTP methods found".to_string()
    } else {
        format!("exported methods: {}", methods.join(", "))
    };
    let warning = format!(
        "{}: API route replaced by a GET stub; port the handler logic manually ({exported})",
        route.source_path
    );

    Rewrite {
        content,
        warnings: vec![warning],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RouteRole;
    use crate::transform::test_support::descriptor;

    #[test]
    fn scans_exported_methods() {
        let src = r#"
export async function GET(req: Request) {}
export const POST = async () => {};
export function GET_helper() {}
function DELETE() {}
export async function GET() {}
"#;
        assert_eq!(exported_methods(src), vec!["GET", "POST"]);
    }

    #[test]
    fn stub_uses_route_id_and_warns() {
        let route = descriptor(
            "src/app/api/users/route.ts",
            "/api/users",
            RouteRole::Api,
            "export async function GET() {}\nexport async function POST() {}",
        );
        let out = transform_api_route(&route, "/api/users");

        assert!(out.content.contains(r#"createFileRoute("/api/users")"#));
        assert!(out.content.contains(r#"Response.json({ message: "Hello" })"#));
        assert_eq!(
            out.warnings,
            vec![
                "src/app/api/users/route.ts: API route replaced by a GET stub; port the handler logic manually (exported methods: GET, POST)"
                    .to_string()
            ]
        );
    }
}
