// src/generator.rs
//
// ProjectStructure → TransformedOutput. Pure: the descriptors already carry
// their content, and nothing is written here.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crate::model::{
    Framework, GeneratedFile, MigrationReport, PathMove, ProjectStructure, RouteDescriptor,
    RouteRole, SkippedRoute, TransformedOutput, TransformedRoute,
};
use crate::resolver::{route_id, target_file_path};
use crate::transform::{CodeTransformer, PageTarget, Rewrite, ShellVariant};

/// Next.js artefacts removed after the migration.
const NEXT_ARTEFACTS: [&str; 8] = [
    "next.config.js",
    "next.config.mjs",
    "next.config.ts",
    "next-env.d.ts",
    "postcss.config.js",
    "postcss.config.mjs",
    "postcss.config.cjs",
    ".next",
];

const REMOVED_DEPENDENCIES: [&str; 2] = ["next", "@tailwindcss/postcss"];

const SOURCE_EXTENSIONS: [&str; 4] = ["ts", "tsx", "js", "jsx"];

/// Where the migrated route tree lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RoutesDirectory {
    /// Keep routes in the existing `app` directory
    #[default]
    App,
    /// Move them to a sibling `routes` directory
    Routes,
}

impl RoutesDirectory {
    pub fn name(self) -> &'static str {
        match self {
            RoutesDirectory::App => "app",
            RoutesDirectory::Routes => "routes",
        }
    }
}

/// Project-relative route root for `structure`.
pub fn route_root(structure: &ProjectStructure, routes_dir: RoutesDirectory) -> String {
    match routes_dir {
        RoutesDirectory::App => structure.app_dir.clone(),
        RoutesDirectory::Routes if structure.use_src => "src/routes".to_string(),
        RoutesDirectory::Routes => "routes".to_string(),
    }
}

pub fn transform_to_tanstack_start(
    structure: &ProjectStructure,
    transformer: &CodeTransformer,
    routes_dir: RoutesDirectory,
) -> TransformedOutput {
    let root = route_root(structure, routes_dir);
    let mut report = MigrationReport {
        total_routes: structure.routes.len() + structure.unreadable.len(),
        ..MigrationReport::default()
    };
    let mut routes: Vec<TransformedRoute> = Vec::new();
    let mut claimed: HashMap<String, String> = HashMap::new();

    info!(
        routes = structure.routes.len(),
        route_root = %root,
        variant = ?transformer.variant(),
        pages = transformer.page_strategy(),
        "transforming routes"
    );

    // 1) routes, in discovery order
    for route in &structure.routes {
        let (target_path, result) = match plan_route(route, transformer, &root) {
            Planned::Skip(reason) => {
                debug!(source = %route.source_path, %reason, "route skipped");
                report.skipped.push(SkippedRoute {
                    source_path: route.source_path.clone(),
                    reason,
                });
                continue;
            }
            Planned::Rewrite(target_path, result) => (target_path, result),
        };

        let rewrite = match result {
            Ok(rewrite) => rewrite,
            Err(e) => {
                warn!(source = %route.source_path, error = %e, "route transform failed");
                report
                    .errors
                    .push(format!("Failed to transform {}: {e}", route.source_path));
                continue;
            }
        };

        if let Some(first) = claimed.get(&target_path) {
            report.errors.push(format!(
                "Failed to transform {}: target {target_path} is already produced by {first}",
                route.source_path
            ));
            continue;
        }
        claimed.insert(target_path.clone(), route.source_path.clone());

        report.warnings.extend(rewrite.warnings);
        routes.push(TransformedRoute {
            target_path,
            content: rewrite.content,
            source_index: route.discovery_index,
            source_path: route.source_path.clone(),
        });
    }
    report
        .skipped
        .extend(structure.unreadable.iter().map(|source| SkippedRoute {
            source_path: source.clone(),
            reason: "could not be read as UTF-8; left in place, migrate it by hand".into(),
        }));
    report.transformed_routes = routes.len();
    report.skipped_routes = report.total_routes - report.transformed_routes;

    // 2) moves for a relocated route tree
    let (files_to_move, directories_to_move) = if root == structure.app_dir {
        (Vec::new(), Vec::new())
    } else {
        plan_moves(structure, &root)
    };

    // 3) colocated sources the router would pick up as routes
    for file in colocated_sources(structure, &root, &files_to_move, &directories_to_move) {
        report.warnings.push(format!(
            "{file}: non-route source file inside the route directory; TanStack Router treats it as a route (prefix it with '-' or move it out)"
        ));
    }
    if structure.metadata.has_middleware {
        report.warnings.push(
            "middleware has no automatic equivalent; port it to TanStack Start request middleware"
                .to_string(),
        );
    }

    // 4) deletions: superseded sources first, then Next.js artefacts
    let targets: BTreeSet<&str> = routes.iter().map(|r| r.target_path.as_str()).collect();
    let mut files_to_delete: Vec<String> = routes
        .iter()
        .map(|r| r.source_path.clone())
        .filter(|source| !targets.contains(source.as_str()))
        .collect();
    files_to_delete.extend(NEXT_ARTEFACTS.iter().map(|s| s.to_string()));

    let variant = transformer.variant();
    TransformedOutput {
        framework: Framework::TanstackStart,
        configs: generate_configs(structure, variant, &root),
        dependencies: dependencies(structure, variant),
        dev_dependencies: dev_dependencies(structure, variant),
        remove_dependencies: REMOVED_DEPENDENCIES.iter().map(|s| s.to_string()).collect(),
        files_to_delete,
        files_to_move,
        directories_to_move,
        routes,
        report,
    }
}

enum Planned {
    Skip(String),
    Rewrite(String, Result<Rewrite, crate::error::TransformError>),
}

fn plan_route(route: &RouteDescriptor, transformer: &CodeTransformer, root: &str) -> Planned {
    match route.role {
        RouteRole::Layout if route.pattern == "/" => Planned::Rewrite(
            format!("{root}/__root.tsx"),
            transformer.root_layout(route),
        ),
        RouteRole::Layout => Planned::Skip(
            "nested layouts have no automatic equivalent; recreate it as a layout route".into(),
        ),
        RouteRole::Page => {
            let target = PageTarget {
                route_id: route_id(&route.pattern),
                target_path: target_file_path(&route.pattern, root, "tsx"),
                route_root: root.to_string(),
            };
            let result = transformer.page(route, &target);
            Planned::Rewrite(target.target_path, result)
        }
        RouteRole::Api => Planned::Rewrite(
            target_file_path(&route.pattern, root, "ts"),
            Ok(transformer.api(route, &route_id(&route.pattern))),
        ),
        RouteRole::Error => Planned::Skip(
            "error boundaries are not migrated; use the route's errorComponent".into(),
        ),
        RouteRole::Loading => Planned::Skip(
            "loading states are not migrated; use the route's pendingComponent".into(),
        ),
        RouteRole::NotFound => Planned::Skip(
            "not-found pages are not migrated; use the root route's notFoundComponent".into(),
        ),
    }
}

/// Non-route files under `app_dir` relocated to `root`. A subdirectory with no
/// route file anywhere below it moves as a whole.
fn plan_moves(structure: &ProjectStructure, root: &str) -> (Vec<PathMove>, Vec<PathMove>) {
    let prefix = format!("{}/", structure.app_dir);

    // every directory (relative to app_dir) that holds a route somewhere below
    let mut route_dirs: BTreeSet<String> = BTreeSet::new();
    for route in &structure.routes {
        let Some(rel) = route.source_path.strip_prefix(&prefix) else {
            continue;
        };
        let components: Vec<&str> = rel.split('/').collect();
        for depth in 1..components.len() {
            route_dirs.insert(components[..depth].join("/"));
        }
    }

    let mut files = Vec::new();
    let mut dirs: Vec<PathMove> = Vec::new();
    for file in &structure.other_files {
        let Some(rel) = file.strip_prefix(&prefix) else {
            continue;
        };
        let components: Vec<&str> = rel.split('/').collect();
        let mut moved_dir = None;
        for depth in 1..components.len() {
            let dir = components[..depth].join("/");
            if !route_dirs.contains(&dir) {
                moved_dir = Some(dir);
                break;
            }
        }
        match moved_dir {
            Some(dir) => {
                let from = format!("{prefix}{dir}");
                if !dirs.iter().any(|m| m.from == from) {
                    dirs.push(PathMove {
                        from,
                        to: format!("{root}/{dir}"),
                    });
                }
            }
            None => files.push(PathMove {
                from: file.clone(),
                to: format!("{root}/{rel}"),
            }),
        }
    }
    (files, dirs)
}

/// Non-route source files that end up inside the route tree.
fn colocated_sources(
    structure: &ProjectStructure,
    root: &str,
    file_moves: &[PathMove],
    dir_moves: &[PathMove],
) -> Vec<String> {
    let is_source = |path: &str| {
        path.rsplit_once('.')
            .is_some_and(|(_, ext)| SOURCE_EXTENSIONS.contains(&ext))
    };
    let relocated = |path: &str| -> Option<String> {
        if let Some(m) = file_moves.iter().find(|m| m.from == path) {
            return Some(m.to.clone());
        }
        dir_moves.iter().find_map(|m| {
            path.strip_prefix(&format!("{}/", m.from))
                .map(|rest| format!("{}/{rest}", m.to))
        })
    };

    structure
        .other_files
        .iter()
        .filter(|file| is_source(file.as_str()))
        .filter_map(|file| {
            if root == structure.app_dir {
                Some(file.clone())
            } else {
                relocated(file.as_str())
            }
        })
        .collect()
}

fn generate_configs(
    structure: &ProjectStructure,
    variant: ShellVariant,
    root: &str,
) -> Vec<GeneratedFile> {
    let src_directory = if structure.use_src { "src" } else { "." };
    let routes_directory = root
        .strip_prefix("src/")
        .unwrap_or(root)
        .to_string();
    let router_path = if structure.use_src {
        "src/router.tsx"
    } else {
        "router.tsx"
    };

    vec![
        GeneratedFile {
            path: "vite.config.ts".to_string(),
            content: vite_config(
                variant,
                structure.metadata.has_tailwind,
                src_directory,
                &routes_directory,
            ),
        },
        GeneratedFile {
            path: router_path.to_string(),
            content: ROUTER_TEMPLATE.to_string(),
        },
    ]
}

fn vite_config(variant: ShellVariant, tailwind: bool, src_dir: &str, routes_dir: &str) -> String {
    let tailwind_import = if tailwind {
        "import tailwindcss from \"@tailwindcss/vite\";\n"
    } else {
        ""
    };
    let tailwind_plugin = if tailwind { "    tailwindcss(),\n" } else { "" };
    let start_plugin = format!(
        "    tanstackStart({{\n      srcDirectory: \"{src_dir}\",\n      router: {{\n        routesDirectory: \"{routes_dir}\",\n      }},\n    }}),\n"
    );

    match variant {
        ShellVariant::ShellComponent => format!(
            r#"import {{ defineConfig }} from "vite";
import {{ tanstackStart }} from "@tanstack/react-start/plugin/vite";
import viteReact from "@vitejs/plugin-react";
import viteTsConfigPaths from "vite-tsconfig-paths";
{tailwind_import}import {{ nitroV2Plugin }} from "@tanstack/nitro-v2-vite-plugin";

export default defineConfig({{
  plugins: [
    nitroV2Plugin(),
    viteTsConfigPaths({{
      projects: ["./tsconfig.json"],
    }}),
{tailwind_plugin}{start_plugin}    viteReact(),
  ],
}});
"#
        ),
        ShellVariant::Component => format!(
            r#"import {{ defineConfig }} from "vite";
import {{ tanstackStart }} from "@tanstack/react-start/plugin/vite";
import viteReact from "@vitejs/plugin-react";
import tsconfigPaths from "vite-tsconfig-paths";
{tailwind_import}
export default defineConfig({{
  server: {{
    port: 3000,
  }},
  plugins: [
{tailwind_plugin}    tsconfigPaths(),
{start_plugin}    viteReact(),
  ],
}});
"#
        ),
    }
}

const ROUTER_TEMPLATE: &str = r#"import { createRouter } from "@tanstack/react-router";
import { routeTree } from "./routeTree.gen";

export const getRouter = () => {
  const router = createRouter({
    routeTree,
    scrollRestoration: true,
    defaultPreloadStaleTime: 0,
  });

  return router;
};
"#;

fn dependencies(structure: &ProjectStructure, variant: ShellVariant) -> BTreeMap<String, String> {
    let set: &[(&str, &str)] = match variant {
        ShellVariant::ShellComponent => &[
            ("@tanstack/react-router", "^1.132.0"),
            ("@tanstack/react-start", "^1.132.0"),
            ("@tanstack/nitro-v2-vite-plugin", "^1.132.31"),
            ("@tanstack/react-router-devtools", "^1.132.0"),
            ("@tanstack/react-devtools", "^0.7.0"),
            ("@tanstack/react-router-ssr-query", "^1.131.7"),
            ("@tanstack/router-plugin", "^1.132.0"),
        ],
        ShellVariant::Component => &[
            ("@tanstack/react-router", "latest"),
            ("@tanstack/react-start", "latest"),
            ("@tanstack/react-router-devtools", "latest"),
        ],
    };
    let mut deps = to_map(set);
    for react in ["react", "react-dom"] {
        let version = structure
            .dependencies
            .get(react)
            .cloned()
            .unwrap_or_else(|| "^19.0.0".to_string());
        deps.insert(react.to_string(), version);
    }
    deps
}

fn dev_dependencies(structure: &ProjectStructure, variant: ShellVariant) -> BTreeMap<String, String> {
    let (set, tailwind): (&[(&str, &str)], &[(&str, &str)]) = match variant {
        ShellVariant::ShellComponent => (
            &[
                ("vite", "^7.1.7"),
                ("@vitejs/plugin-react", "^5.0.4"),
                ("vite-tsconfig-paths", "^5.1.4"),
            ],
            &[("@tailwindcss/vite", "^4.0.6"), ("tailwindcss", "^4.0.6")],
        ),
        ShellVariant::Component => (
            &[
                ("@tanstack/router-plugin", "latest"),
                ("@vitejs/plugin-react", "latest"),
                ("vite", "latest"),
                ("vite-tsconfig-paths", "latest"),
            ],
            &[("@tailwindcss/vite", "latest"), ("tailwindcss", "latest")],
        ),
    };
    let mut deps = to_map(set);
    if structure.metadata.has_tailwind {
        deps.extend(to_map(tailwind));
    }
    let declared_ts = structure
        .dev_dependencies
        .get("typescript")
        .or_else(|| structure.dependencies.get("typescript"));
    if let Some(version) = declared_ts {
        deps.insert("typescript".to_string(), version.clone());
    } else if structure.metadata.has_typescript {
        deps.insert("typescript".to_string(), "^5.0.0".to_string());
    }
    deps
}

fn to_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(name, version)| (name.to_string(), version.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PackageManager, ProjectMetadata};
    use crate::transform::PageStrategy;
    use crate::transform::test_support::descriptor;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    const PAGE: &str = "export default function Home() { return <main />; }";
    const LAYOUT: &str = r#"import "./globals.css";
export default function RootLayout({ children }) {
  return <html lang="en"><body>{children}</body></html>;
}"#;

    fn structure(routes: Vec<RouteDescriptor>, other_files: Vec<&str>) -> ProjectStructure {
        let routes = routes
            .into_iter()
            .enumerate()
            .map(|(i, mut r)| {
                r.discovery_index = i;
                r
            })
            .collect();
        ProjectStructure {
            root_dir: PathBuf::from("/tmp/site"),
            framework: Framework::NextJs,
            use_src: true,
            app_dir: "src/app".to_string(),
            public_dir: None,
            routes,
            unreadable: Vec::new(),
            other_files: other_files.into_iter().map(String::from).collect(),
            dependencies: BTreeMap::from([
                ("next".to_string(), "15.0.0".to_string()),
                ("react".to_string(), "19.1.0".to_string()),
            ]),
            dev_dependencies: BTreeMap::new(),
            package_manager: PackageManager::Npm,
            metadata: ProjectMetadata {
                has_tailwind: true,
                has_typescript: true,
                has_middleware: false,
            },
        }
    }

    fn run(structure: &ProjectStructure, routes_dir: RoutesDirectory) -> TransformedOutput {
        let transformer = CodeTransformer::new(ShellVariant::ShellComponent, PageStrategy::Structural);
        transform_to_tanstack_start(structure, &transformer, routes_dir)
    }

    #[test]
    fn zero_routes_is_a_valid_output() {
        let out = run(&structure(Vec::new(), Vec::new()), RoutesDirectory::App);
        assert_eq!(out.report.total_routes, 0);
        assert!(out.routes.is_empty());
        assert!(out.report.errors.is_empty());
        assert_eq!(out.configs.len(), 2);
    }

    #[test]
    fn unreadable_routes_are_counted_as_skipped() {
        let mut s = structure(
            vec![descriptor("src/app/page.tsx", "/", RouteRole::Page, PAGE)],
            Vec::new(),
        );
        s.unreadable = vec!["src/app/legacy/page.tsx".to_string()];
        let out = run(&s, RoutesDirectory::App);

        assert_eq!(out.report.total_routes, 2);
        assert_eq!(out.report.transformed_routes, 1);
        assert_eq!(out.report.skipped_routes, 1);
        assert_eq!(out.report.skipped.len(), 1);
        assert_eq!(out.report.skipped[0].source_path, "src/app/legacy/page.tsx");
        assert!(out.report.skipped[0].reason.contains("UTF-8"));
        assert!(!out.files_to_delete.contains(&"src/app/legacy/page.tsx".to_string()));
    }

    #[test]
    fn maps_routes_and_counts_skips() {
        let s = structure(
            vec![
                descriptor("src/app/page.tsx", "/", RouteRole::Page, PAGE),
                descriptor("src/app/blog/[slug]/page.tsx", "/blog/[slug]", RouteRole::Page, PAGE),
                descriptor("src/app/layout.tsx", "/", RouteRole::Layout, LAYOUT),
                descriptor("src/app/blog/layout.tsx", "/blog", RouteRole::Layout, LAYOUT),
                descriptor("src/app/error.tsx", "/", RouteRole::Error, PAGE),
                descriptor("src/app/loading.tsx", "/", RouteRole::Loading, PAGE),
                descriptor("src/app/not-found.tsx", "/", RouteRole::NotFound, PAGE),
                descriptor("src/app/api/users/route.ts", "/api/users", RouteRole::Api, "export async function GET() {}"),
            ],
            Vec::new(),
        );
        let out = run(&s, RoutesDirectory::App);

        let targets: Vec<(&str, usize)> = out
            .routes
            .iter()
            .map(|r| (r.target_path.as_str(), r.source_index))
            .collect();
        assert_eq!(
            targets,
            vec![
                ("src/app/index.tsx", 0),
                ("src/app/blog/$slug.tsx", 1),
                ("src/app/__root.tsx", 2),
                ("src/app/api/users.ts", 7),
            ]
        );
        assert_eq!(out.report.total_routes, 8);
        assert_eq!(out.report.transformed_routes, 4);
        assert_eq!(out.report.skipped_routes, 4);
        assert_eq!(out.report.skipped.len(), 4);
        assert!(out.report.errors.is_empty());
        // the API stub always warns
        assert_eq!(out.report.warnings.len(), 1);
        assert!(out.routes[3].content.contains(r#"createFileRoute("/api/users")"#));
    }

    #[test]
    fn failures_are_reported_and_processing_continues() {
        let s = structure(
            vec![
                descriptor("src/app/broken/page.tsx", "/broken", RouteRole::Page, "export default function ("),
                descriptor("src/app/about/page.tsx", "/about", RouteRole::Page, PAGE),
            ],
            Vec::new(),
        );
        let out = run(&s, RoutesDirectory::App);
        assert_eq!(out.routes.len(), 1);
        assert_eq!(out.report.errors.len(), 1);
        assert!(out.report.errors[0].starts_with("Failed to transform src/app/broken/page.tsx: "));
        // the failed source is kept
        assert!(!out.files_to_delete.contains(&"src/app/broken/page.tsx".to_string()));
        assert!(out.files_to_delete.contains(&"src/app/about/page.tsx".to_string()));
    }

    #[test]
    fn colliding_targets_are_errors() {
        let s = structure(
            vec![
                descriptor("src/app/docs/[...a]/page.tsx", "/docs/[...a]", RouteRole::Page, PAGE),
                descriptor("src/app/docs/[...b]/page.tsx", "/docs/[...b]", RouteRole::Page, PAGE),
            ],
            Vec::new(),
        );
        let out = run(&s, RoutesDirectory::App);
        assert_eq!(out.routes.len(), 1);
        assert_eq!(
            out.report.errors,
            vec![
                "Failed to transform src/app/docs/[...b]/page.tsx: target src/app/docs/$.tsx is already produced by src/app/docs/[...a]/page.tsx"
                    .to_string()
            ]
        );
    }

    #[test]
    fn relocated_route_tree_moves_other_files() {
        let s = structure(
            vec![
                descriptor("src/app/page.tsx", "/", RouteRole::Page, PAGE),
                descriptor("src/app/blog/page.tsx", "/blog", RouteRole::Page, PAGE),
            ],
            vec![
                "src/app/blog/Card.tsx",
                "src/app/components/Button.tsx",
                "src/app/components/icons/Logo.tsx",
                "src/app/globals.css",
            ],
        );
        let out = run(&s, RoutesDirectory::Routes);

        assert_eq!(out.routes[0].target_path, "src/routes/index.tsx");
        assert_eq!(
            out.files_to_move,
            vec![
                PathMove { from: "src/app/blog/Card.tsx".into(), to: "src/routes/blog/Card.tsx".into() },
                PathMove { from: "src/app/globals.css".into(), to: "src/routes/globals.css".into() },
            ]
        );
        assert_eq!(
            out.directories_to_move,
            vec![PathMove { from: "src/app/components".into(), to: "src/routes/components".into() }]
        );
        // three relocated sources land in the route tree
        assert_eq!(
            out.report.warnings.iter().filter(|w| w.contains("non-route source file")).count(),
            3
        );

        let vite = &out.configs[0].content;
        assert!(vite.contains("srcDirectory: \"src\""));
        assert!(vite.contains("routesDirectory: \"routes\""));
        assert!(vite.contains("tailwindcss(),"));
        assert_eq!(out.configs[1].path, "src/router.tsx");
    }

    #[test]
    fn dependency_sets_follow_variant() {
        let s = structure(Vec::new(), Vec::new());

        let shell = run(&s, RoutesDirectory::App);
        assert_eq!(shell.dependencies["@tanstack/react-router"], "^1.132.0");
        assert_eq!(shell.dependencies["react"], "19.1.0");
        assert_eq!(shell.dependencies["react-dom"], "^19.0.0");
        assert_eq!(shell.dev_dependencies["vite"], "^7.1.7");
        assert_eq!(shell.dev_dependencies["tailwindcss"], "^4.0.6");
        assert_eq!(shell.dev_dependencies["typescript"], "^5.0.0");
        assert_eq!(shell.remove_dependencies, vec!["next", "@tailwindcss/postcss"]);
        assert!(shell.files_to_delete.contains(&"next.config.mjs".to_string()));
        assert!(shell.configs[0].content.contains("nitroV2Plugin()"));

        let transformer = CodeTransformer::new(ShellVariant::Component, PageStrategy::Structural);
        let component = transform_to_tanstack_start(&s, &transformer, RoutesDirectory::App);
        assert_eq!(component.dependencies["@tanstack/react-start"], "latest");
        assert!(component.configs[0].content.contains("port: 3000"));
        assert!(!component.configs[0].content.contains("nitroV2Plugin"));
    }
}
