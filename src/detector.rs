// src/detector.rs
use path_absolutize::Absolutize;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::MigrateError;
use crate::manifest::PackageJson;
use crate::model::{Framework, PackageManager};

const NEXT_CONFIG_FILES: [&str; 3] = ["next.config.js", "next.config.mjs", "next.config.ts"];
const VITE_CONFIG_FILES: [&str; 3] = ["vite.config.js", "vite.config.mjs", "vite.config.ts"];

/// How a project lays out its routes on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingConvention {
    /// One folder per segment, role given by file name (`app/blog/[slug]/page.tsx`)
    HierarchicalFolders,
    /// One file per route (`pages/blog/[slug].tsx`, `routes/blog/$slug.tsx`)
    FlatFiles,
    Unknown,
}

/// Existence checks gathered once per run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureSignals {
    pub has_src_folder: bool,
    pub has_app_folder: bool,
    pub has_app_folder_in_src: bool,
    pub has_pages_folder: bool,
    pub has_next_config: bool,
    pub has_vite_config: bool,
    pub package_json_path: PathBuf,
}

impl StructureSignals {
    pub fn collect(root: &Path) -> Self {
        Self {
            has_src_folder: root.join("src").is_dir(),
            has_app_folder: root.join("app").is_dir(),
            has_app_folder_in_src: root.join("src").join("app").is_dir(),
            has_pages_folder: root.join("pages").is_dir() || root.join("src").join("pages").is_dir(),
            has_next_config: any_exists(root, &NEXT_CONFIG_FILES),
            has_vite_config: any_exists(root, &VITE_CONFIG_FILES),
            package_json_path: root.join("package.json"),
        }
    }

    pub fn uses_app_router(&self) -> bool {
        self.has_app_folder || self.has_app_folder_in_src
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub framework: Framework,
    pub routing: RoutingConvention,
    pub package_manager: PackageManager,
    pub structure: StructureSignals,
    pub root_path: PathBuf,
}

/// Full detection for the project at `project_root`.
pub fn detect(project_root: &Path) -> Result<DetectionResult, MigrateError> {
    // 1) absolutize and make sure it is a directory
    let root = project_root
        .absolutize()
        .map_err(|e| MigrateError::io(project_root, e))?
        .to_path_buf();
    if !root.is_dir() {
        return Err(MigrateError::io(
            &root,
            io::Error::new(io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    // 2) framework, lockfile, folder signals
    let structure = StructureSignals::collect(&root);
    let framework = detect_framework(&root);
    let package_manager = detect_package_manager(&root);
    let routing = routing_convention(framework, &structure, &root);
    debug!(?framework, ?routing, %package_manager, root = %root.display(), "detection finished");

    Ok(DetectionResult {
        framework,
        routing,
        package_manager,
        structure,
        root_path: root,
    })
}

pub fn detect_framework(root: &Path) -> Framework {
    if is_next_project(root) {
        return Framework::NextJs;
    }

    let Ok(manifest) = PackageJson::read(&root.join("package.json")) else {
        return Framework::Unknown;
    };
    let candidates = [
        ("@tanstack/react-start", Framework::TanstackStart),
        ("@remix-run/react", Framework::Remix),
        ("@sveltejs/kit", Framework::Sveltekit),
        ("astro", Framework::Astro),
        ("nuxt", Framework::Nuxt),
    ];
    candidates
        .into_iter()
        .find(|(dep, _)| manifest.has_dependency(dep))
        .map_or(Framework::Unknown, |(_, fw)| fw)
}

/// A Next.js project declares `next` and has a config file or a router folder.
/// Without a package.json the config file alone decides.
pub fn is_next_project(root: &Path) -> bool {
    let manifest_path = root.join("package.json");
    if manifest_path.is_file() {
        match PackageJson::read(&manifest_path) {
            Ok(manifest) if manifest.has_dependency("next") => {}
            _ => return false,
        }
    }

    if any_exists(root, &NEXT_CONFIG_FILES) {
        return true;
    }
    let signals = StructureSignals::collect(root);
    manifest_path.is_file() && (signals.uses_app_router() || signals.has_pages_folder)
}

pub fn detect_package_manager(root: &Path) -> PackageManager {
    let lockfiles = [
        ("bun.lockb", PackageManager::Bun),
        ("bun.lock", PackageManager::Bun),
        ("pnpm-lock.yaml", PackageManager::Pnpm),
        ("yarn.lock", PackageManager::Yarn),
        ("package-lock.json", PackageManager::Npm),
    ];
    lockfiles
        .into_iter()
        .find(|(file, _)| root.join(file).is_file())
        .map_or(PackageManager::Npm, |(_, pm)| pm)
}

/// Routes live under `src/app` rather than `app`.
pub fn uses_src_directory(root: &Path) -> bool {
    root.join("src").join("app").is_dir()
}

fn routing_convention(
    framework: Framework,
    signals: &StructureSignals,
    root: &Path,
) -> RoutingConvention {
    match framework {
        Framework::NextJs if signals.uses_app_router() => RoutingConvention::HierarchicalFolders,
        Framework::NextJs if signals.has_pages_folder => RoutingConvention::FlatFiles,
        Framework::TanstackStart => RoutingConvention::FlatFiles,
        _ if root.join("src").join("routes").is_dir() => RoutingConvention::FlatFiles,
        _ => RoutingConvention::Unknown,
    }
}

fn any_exists(root: &Path, names: &[&str]) -> bool {
    names.iter().any(|name| root.join(name).exists())
}
