// src/backup.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::error::MigrateError;

pub const BACKUP_DIR: &str = ".hopr-backup";

/// Top-level entries never copied into a backup.
const SKIPPED: [&str; 5] = ["node_modules", ".next", ".git", "dist", BACKUP_DIR];

/// Copy the project into `.hopr-backup/<unix-secs>-<nanos>/` and return that
/// path. An existing directory is never reused.
pub fn create_backup(root: &Path) -> Result<PathBuf, MigrateError> {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| format!("{}-{:09}", d.as_secs(), d.subsec_nanos()))
        .unwrap_or_else(|_| "0-000000000".to_string());
    let target = unused_dir(&root.join(BACKUP_DIR), &stamp);
    copy_tree(root, &target)?;
    info!(path = %target.display(), "backup created");
    Ok(target)
}

/// `parent/stamp`, or `parent/stamp-N` for the first N not already taken.
fn unused_dir(parent: &Path, stamp: &str) -> PathBuf {
    let mut candidate = parent.join(stamp);
    let mut n = 1;
    while candidate.exists() {
        candidate = parent.join(format!("{stamp}-{n}"));
        n += 1;
    }
    candidate
}

fn copy_tree(root: &Path, target: &Path) -> Result<(), MigrateError> {
    fs::create_dir_all(target).map_err(|e| MigrateError::io(target, e))?;

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped(e));
    let mut copied = 0usize;
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            MigrateError::io(path, e.into())
        })?;
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        if rel.as_os_str().is_empty() {
            continue;
        }
        let dest = target.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(|e| MigrateError::io(&dest, e))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &dest).map_err(|e| MigrateError::io(&dest, e))?;
            copied += 1;
        }
    }
    debug!(files = copied, "backup copy finished");
    Ok(())
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() == 1
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED.contains(&name))
}

/// Shown in the report after a backed-up run.
pub fn rollback_instructions(backup: &Path) -> Vec<String> {
    vec![
        "To roll back the migration:".to_string(),
        "  1. Delete the migrated project files".to_string(),
        format!("  2. Restore them from {}", backup.display()),
        "  3. Reinstall dependencies with your package manager".to_string(),
        "Or revert the changes with git if the project is under version control.".to_string(),
    ]
}
