// src/model.rs
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Frameworks the detector can recognise. Only `NextJs → TanStackStart` migrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framework {
    #[serde(rename = "nextjs")]
    NextJs,
    TanstackStart,
    Remix,
    Sveltekit,
    Astro,
    Nuxt,
    Unknown,
}

impl Framework {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::NextJs => "nextjs",
            Framework::TanstackStart => "tanstack-start",
            Framework::Remix => "remix",
            Framework::Sveltekit => "sveltekit",
            Framework::Astro => "astro",
            Framework::Nuxt => "nuxt",
            Framework::Unknown => "unknown",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let fw = match name.trim().to_ascii_lowercase().as_str() {
            "nextjs" | "next" | "next.js" => Framework::NextJs,
            "tanstack-start" | "tanstack" => Framework::TanstackStart,
            "remix" => Framework::Remix,
            "sveltekit" => Framework::Sveltekit,
            "astro" => Framework::Astro,
            "nuxt" => Framework::Nuxt,
            _ => return None,
        };
        Some(fw)
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl PackageManager {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Bun => "bun",
        }
    }

    pub fn install_command(&self) -> String {
        format!("{} install", self.as_str())
    }

    pub fn run_command(&self, script: &str) -> String {
        format!("{} run {script}", self.as_str())
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Functional category of a route file, decided by its filename stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteRole {
    Page,
    Layout,
    Error,
    Loading,
    NotFound,
    Api,
}

impl RouteRole {
    /// Discovery order used by the analyzer.
    pub const ALL: [RouteRole; 6] = [
        RouteRole::Page,
        RouteRole::Layout,
        RouteRole::Error,
        RouteRole::Loading,
        RouteRole::NotFound,
        RouteRole::Api,
    ];

    pub fn stem(&self) -> &'static str {
        match self {
            RouteRole::Page => "page",
            RouteRole::Layout => "layout",
            RouteRole::Error => "error",
            RouteRole::Loading => "loading",
            RouteRole::NotFound => "not-found",
            RouteRole::Api => "route",
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            RouteRole::Api => &["ts", "js"],
            _ => &["ts", "tsx", "js", "jsx"],
        }
    }

    /// `page.tsx` → `Some(Page)`, `route.ts` → `Some(Api)`, `button.tsx` → `None`.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (stem, ext) = file_name.rsplit_once('.')?;
        Self::ALL
            .into_iter()
            .find(|role| role.stem() == stem && role.extensions().contains(&ext))
    }
}

impl fmt::Display for RouteRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RouteRole::Api => "api",
            other => other.stem(),
        })
    }
}

/// One discovered route source file.
#[derive(Debug, Clone, Serialize)]
pub struct RouteDescriptor {
    /// Position in discovery order (role outer loop, traversal inner loop)
    pub discovery_index: usize,
    /// Project-relative path of the original file, forward slashes
    pub source_path: String,
    /// Route pattern, e.g. "/" or "/posts/[slug]"
    pub pattern: String,
    pub role: RouteRole,
    /// Dynamic parameter names, left to right
    pub params: Vec<String>,
    pub is_catch_all: bool,
    /// Source text captured at analysis time
    #[serde(skip)]
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub has_tailwind: bool,
    pub has_typescript: bool,
    pub has_middleware: bool,
}

/// The analyzed project as a whole.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStructure {
    pub root_dir: PathBuf,
    pub framework: Framework,
    pub use_src: bool,
    /// Route tree, relative to `root_dir` ("app" or "src/app")
    pub app_dir: String,
    pub public_dir: Option<String>,
    pub routes: Vec<RouteDescriptor>,
    /// Route files that could not be read as UTF-8, relative to `root_dir`
    pub unreadable: Vec<String>,
    /// Non-route files found under `app_dir`, relative to `root_dir`
    pub other_files: Vec<String>,
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
    pub package_manager: PackageManager,
    pub metadata: ProjectMetadata,
}

/// Rewritten output for one route.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformedRoute {
    pub target_path: String,
    #[serde(skip)]
    pub content: String,
    /// Discovery index of the originating descriptor
    pub source_index: usize,
    pub source_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    pub path: String,
    #[serde(skip)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathMove {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRoute {
    pub source_path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub total_routes: usize,
    pub transformed_routes: usize,
    pub skipped_routes: usize,
    pub skipped: Vec<SkippedRoute>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Everything the write phase needs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformedOutput {
    pub framework: Framework,
    pub routes: Vec<TransformedRoute>,
    pub configs: Vec<GeneratedFile>,
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
    pub remove_dependencies: Vec<String>,
    pub files_to_delete: Vec<String>,
    pub files_to_move: Vec<PathMove>,
    pub directories_to_move: Vec<PathMove>,
    pub report: MigrationReport,
}
