// src/analyzer.rs
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::detector::uses_src_directory;
use crate::error::MigrateError;
use crate::manifest::PackageJson;
use crate::model::{Framework, ProjectMetadata, ProjectStructure, RouteDescriptor, RouteRole};
use crate::resolver::{extract_params, normalize_separators};

/// Build the structural model of the project at `root`.
///
/// `ignore` holds gitignore-style patterns relative to the route directory.
pub fn analyze(
    root: &Path,
    framework: Framework,
    ignore: &[String],
) -> Result<ProjectStructure, MigrateError> {
    let use_src = uses_src_directory(root);
    let app_dir = if use_src { "src/app" } else { "app" }.to_string();
    let app_path = root.join(&app_dir);
    info!(app_dir = %app_dir, "analyzing project structure");

    // 1) one sorted walk, shared by every role
    let matcher = build_ignore(&app_path, ignore)?;
    let files = collect_files(&app_path, &matcher);

    // 2) role outer loop, traversal order inner loop
    let mut routes: Vec<RouteDescriptor> = Vec::new();
    let mut unreadable: Vec<String> = Vec::new();
    for role in RouteRole::ALL {
        for file in &files {
            let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if RouteRole::from_file_name(name) != Some(role) {
                continue;
            }
            let content = match fs::read_to_string(file) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "could not read route file, skipping");
                    unreadable.push(relative_to(root, file));
                    continue;
                }
            };
            routes.push(describe(root, &app_path, file, role, routes.len(), content));
        }
    }

    // 3) everything else under the route tree
    let other_files: Vec<String> = files
        .iter()
        .filter(|file| {
            file.file_name()
                .and_then(|n| n.to_str())
                .and_then(RouteRole::from_file_name)
                .is_none()
        })
        .map(|file| relative_to(root, file))
        .collect();

    // 4) manifest + metadata
    let manifest = PackageJson::read(&root.join("package.json"))?;
    let metadata = ProjectMetadata {
        has_tailwind: manifest.has_dependency("tailwindcss")
            || manifest.has_dependency("@tailwindcss/postcss"),
        has_typescript: root.join("tsconfig.json").is_file(),
        has_middleware: ["middleware.ts", "middleware.js"].iter().any(|name| {
            root.join(name).is_file() || root.join("src").join(name).is_file()
        }),
    };
    let public_dir = root.join("public").is_dir().then(|| "public".to_string());

    info!(
        routes = routes.len(),
        unreadable = unreadable.len(),
        other_files = other_files.len(),
        "analysis finished"
    );

    Ok(ProjectStructure {
        root_dir: root.to_path_buf(),
        framework,
        use_src,
        app_dir,
        public_dir,
        routes,
        unreadable,
        other_files,
        dependencies: manifest.dependencies,
        dev_dependencies: manifest.dev_dependencies,
        package_manager: crate::detector::detect_package_manager(root),
        metadata,
    })
}

fn build_ignore(app_path: &Path, patterns: &[String]) -> Result<Gitignore, MigrateError> {
    let mut builder = GitignoreBuilder::new(app_path);
    for pattern in patterns {
        builder
            .add_line(None, pattern)
            .map_err(|e| MigrateError::Config(format!("invalid ignore pattern {pattern:?}: {e}")))?;
    }
    builder
        .build()
        .map_err(|e| MigrateError::Config(format!("invalid ignore patterns: {e}")))
}

/// All files under `app_path`, sorted by name at every level. Dot-directories
/// and `node_modules` are never entered.
fn collect_files(app_path: &Path, matcher: &Gitignore) -> Vec<PathBuf> {
    if !app_path.is_dir() {
        return Vec::new();
    }
    WalkDir::new(app_path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e))
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let ignored = matcher
                .matched_path_or_any_parents(e.path(), false)
                .is_ignore();
            if ignored {
                debug!(path = %e.path().display(), "ignored by pattern");
            }
            !ignored
        })
        .map(DirEntry::into_path)
        .collect()
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || name == "node_modules")
}

fn describe(
    root: &Path,
    app_path: &Path,
    file: &Path,
    role: RouteRole,
    discovery_index: usize,
    content: String,
) -> RouteDescriptor {
    let dir = file
        .parent()
        .and_then(|parent| parent.strip_prefix(app_path).ok())
        .map(|rel| normalize_separators(&rel.to_string_lossy()))
        .unwrap_or_default();
    let pattern = if dir.is_empty() {
        "/".to_string()
    } else {
        format!("/{dir}")
    };
    let (params, is_catch_all) = extract_params(&pattern);

    let descriptor = RouteDescriptor {
        discovery_index,
        source_path: relative_to(root, file),
        pattern,
        role,
        params,
        is_catch_all,
        content,
    };
    debug!(
        source = %descriptor.source_path,
        pattern = %descriptor.pattern,
        role = %descriptor.role,
        "route discovered"
    );
    descriptor
}

fn relative_to(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    normalize_separators(&rel.to_string_lossy())
}
