// src/materializer.rs
//
// Write phase. Every step is best-effort: a failing file is logged and
// collected, and the run keeps going.

use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::MigrateError;
use crate::manifest;
use crate::model::{PathMove, TransformedOutput};

/// What the write phase did.
#[derive(Debug, Clone, Default)]
pub struct WriteSummary {
    pub moved: Vec<String>,
    pub deleted: Vec<String>,
    pub written: Vec<String>,
    pub manifests: Vec<String>,
    /// Operations that failed; the rest of the phase still ran
    pub failures: Vec<String>,
    pub warnings: Vec<String>,
}

impl WriteSummary {
    fn fail(&mut self, what: String) {
        warn!("{what}");
        self.failures.push(what);
    }
}

/// Apply `output` to the project at `root`. `route_tree` is the
/// project-relative directory whose empty subdirectories get pruned after
/// deletion.
pub fn materialize(root: &Path, output: &TransformedOutput, route_tree: &str) -> WriteSummary {
    let mut summary = WriteSummary::default();

    // 1) file moves, then directory moves
    for m in output.files_to_move.iter().chain(&output.directories_to_move) {
        match move_path(root, m) {
            Ok(true) => summary.moved.push(format!("{} -> {}", m.from, m.to)),
            Ok(false) => debug!(from = %m.from, "nothing to move"),
            Err(e) => summary.fail(format!("Failed to move {} to {}: {e}", m.from, m.to)),
        }
    }

    // 2) deletions, then prune what they left empty
    for rel in &output.files_to_delete {
        match remove_path(&root.join(rel)) {
            Ok(true) => summary.deleted.push(rel.clone()),
            Ok(false) => {}
            Err(e) => summary.fail(format!("Failed to delete {rel}: {e}")),
        }
    }
    let pruned = prune_empty_dirs(&root.join(route_tree));
    if pruned > 0 {
        debug!(pruned, tree = route_tree, "removed empty directories");
    }

    // 3) routes, then configs
    let files = output
        .routes
        .iter()
        .map(|r| (&r.target_path, &r.content))
        .chain(output.configs.iter().map(|c| (&c.path, &c.content)));
    for (rel, content) in files {
        match write_file(&root.join(rel), content) {
            Ok(()) => summary.written.push(rel.clone()),
            Err(e) => summary.fail(format!("Failed to write {rel}: {e}")),
        }
    }

    // 4) manifests
    match manifest::update_package_json(root, output) {
        Ok(()) => summary.manifests.push("package.json".to_string()),
        Err(e) => summary.fail(format!("Failed to update package.json: {e}")),
    }
    match manifest::update_tsconfig(root) {
        Ok(true) => summary.manifests.push("tsconfig.json".to_string()),
        Ok(false) => debug!("no tsconfig.json"),
        Err(e @ MigrateError::Json { .. }) => {
            let message = format!("tsconfig.json left unchanged: {e}");
            warn!("{message}");
            summary.warnings.push(message);
        }
        Err(e) => summary.fail(format!("Failed to update tsconfig.json: {e}")),
    }
    match manifest::update_gitignore(root) {
        Ok(true) => summary.manifests.push(".gitignore".to_string()),
        Ok(false) => debug!("no .gitignore"),
        Err(e) => summary.fail(format!("Failed to update .gitignore: {e}")),
    }

    info!(
        moved = summary.moved.len(),
        deleted = summary.deleted.len(),
        written = summary.written.len(),
        failures = summary.failures.len(),
        "write phase finished"
    );
    summary
}

/// `Ok(false)` when the source no longer exists.
fn move_path(root: &Path, m: &PathMove) -> io::Result<bool> {
    let from = root.join(&m.from);
    if !from.exists() {
        return Ok(false);
    }
    let to = root.join(&m.to);
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(&from, &to)?;
    Ok(true)
}

fn remove_path(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).map(|()| true),
        Ok(_) => fs::remove_file(path).map(|()| true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove empty directories below and including `dir`, deepest first.
fn prune_empty_dirs(dir: &Path) -> usize {
    if !dir.is_dir() {
        return 0;
    }
    let mut removed = 0;
    for entry in WalkDir::new(dir).contents_first(true).into_iter().flatten() {
        if !entry.file_type().is_dir() {
            continue;
        }
        let empty = fs::read_dir(entry.path()).is_ok_and(|mut it| it.next().is_none());
        if empty && fs::remove_dir(entry.path()).is_ok() {
            removed += 1;
        }
    }
    removed
}

fn write_file(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Framework, GeneratedFile, MigrationReport, TransformedRoute,
    };
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn output() -> TransformedOutput {
        TransformedOutput {
            framework: Framework::TanstackStart,
            routes: vec![TransformedRoute {
                target_path: "app/blog/$slug.tsx".into(),
                content: "route".into(),
                source_index: 0,
                source_path: "app/blog/[slug]/page.tsx".into(),
            }],
            configs: vec![GeneratedFile {
                path: "vite.config.ts".into(),
                content: "vite".into(),
            }],
            dependencies: BTreeMap::from([("@tanstack/react-router".into(), "^1.132.0".into())]),
            dev_dependencies: BTreeMap::new(),
            remove_dependencies: vec!["next".into()],
            files_to_delete: vec![
                "app/blog/[slug]/page.tsx".into(),
                "next.config.mjs".into(),
                ".next".into(),
            ],
            files_to_move: Vec::new(),
            directories_to_move: Vec::new(),
            report: MigrationReport::default(),
        }
    }

    #[test]
    fn applies_output_in_order() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "package.json", r#"{"dependencies":{"next":"15.0.0"}}"#);
        write(root, "app/blog/[slug]/page.tsx", "old");
        write(root, "next.config.mjs", "export default {}");
        write(root, ".next/cache/x", "x");
        write(root, ".gitignore", "/.next/\nnode_modules\n");

        let summary = materialize(root, &output(), "app");

        assert!(summary.failures.is_empty(), "{:?}", summary.failures);
        assert_eq!(fs::read_to_string(root.join("app/blog/$slug.tsx")).unwrap(), "route");
        assert_eq!(fs::read_to_string(root.join("vite.config.ts")).unwrap(), "vite");
        // the emptied [slug] folder is pruned, blog is still there for the new route
        assert!(!root.join("app/blog/[slug]").exists());
        assert!(!root.join("next.config.mjs").exists());
        assert!(!root.join(".next").exists());
        assert_eq!(summary.manifests, vec!["package.json", ".gitignore"]);
        let manifest = fs::read_to_string(root.join("package.json")).unwrap();
        assert!(!manifest.contains("\"next\""));
        assert!(manifest.contains("@tanstack/react-router"));
    }

    #[test]
    fn failures_are_collected_not_fatal() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        // no package.json: the manifest step fails, the writes still happen
        let summary = materialize(root, &output(), "app");
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].starts_with("Failed to update package.json"));
        assert!(root.join("app/blog/$slug.tsx").is_file());
    }

    #[test]
    fn moves_files_and_directories() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "package.json", "{}");
        write(root, "app/globals.css", "body{}");
        write(root, "app/components/Button.tsx", "b");

        let mut out = output();
        out.files_to_move = vec![PathMove {
            from: "app/globals.css".into(),
            to: "routes/globals.css".into(),
        }];
        out.directories_to_move = vec![PathMove {
            from: "app/components".into(),
            to: "routes/components".into(),
        }];
        let summary = materialize(root, &out, "app");

        assert_eq!(summary.moved.len(), 2);
        assert!(root.join("routes/globals.css").is_file());
        assert!(root.join("routes/components/Button.tsx").is_file());
        assert!(!root.join("app/components").exists());
    }

    #[test]
    fn unparsable_tsconfig_is_a_warning() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "package.json", "{}");
        write(root, "tsconfig.json", "{ // comment\n }");
        let summary = materialize(root, &output(), "app");
        assert!(summary.failures.is_empty());
        assert_eq!(summary.warnings.len(), 1);
        assert_eq!(fs::read_to_string(root.join("tsconfig.json")).unwrap(), "{ // comment\n }");
    }
}
