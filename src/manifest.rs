// src/manifest.rs
//
// package.json / tsconfig.json / .gitignore patches. The patch functions are
// pure (text or JSON in, JSON or text out); `update_*` wrap them with I/O.

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::error::MigrateError;
use crate::model::TransformedOutput;

static DEV_PORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:--port|-p)(?:=|\s+)(\d+)").unwrap());

const DEFAULT_DEV_PORT: &str = "3000";
const DEFAULT_LINT: &str = "eslint --max-warnings 0";
const GITIGNORE_ENTRIES: [&str; 3] = [".output", ".vinxi", "routeTree.gen.ts"];

/// The slice of package.json the analyzer and detector care about.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
}

impl PackageJson {
    pub fn read(path: &Path) -> Result<Self, MigrateError> {
        let raw = fs::read_to_string(path).map_err(|e| MigrateError::io(path, e))?;
        serde_json::from_str(&raw).map_err(|e| MigrateError::json(path, e))
    }

    /// Declared in either dependency table.
    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.contains_key(name) || self.dev_dependencies.contains_key(name)
    }
}

/// Port passed to the existing `dev` script (`--port N`, `--port=N`, `-p N`).
pub fn dev_port(dev_script: Option<&str>) -> String {
    dev_script
        .and_then(|script| DEV_PORT_RE.captures(script))
        .map_or_else(|| DEFAULT_DEV_PORT.to_string(), |caps| caps[1].to_string())
}

/// Apply dependency and script changes to a parsed package.json object.
/// Existing keys keep their position; new keys are appended.
pub fn patch_package_json(manifest: &mut Map<String, Value>, output: &TransformedOutput) {
    // 1) removals from both tables
    for table in ["dependencies", "devDependencies"] {
        if let Some(Value::Object(deps)) = manifest.get_mut(table) {
            for name in &output.remove_dependencies {
                if deps.shift_remove(name).is_some() {
                    debug!(dependency = %name, table, "removed dependency");
                }
            }
        }
    }

    // 2) additions (override existing ranges)
    merge_table(manifest, "dependencies", &output.dependencies);
    merge_table(manifest, "devDependencies", &output.dev_dependencies);

    // 3) scripts
    if let Some(scripts) = object_entry(manifest, "scripts") {
        patch_scripts(scripts);
    }

    // 4) ESM
    manifest.insert("type".into(), "module".into());
}

fn patch_scripts(scripts: &mut Map<String, Value>) {
    let port = dev_port(scripts.get("dev").and_then(Value::as_str));
    scripts.insert("dev".into(), format!("vite dev --port {port}").into());
    scripts.insert("build".into(), "vite build".into());
    scripts.insert("serve".into(), "vite preview".into());
    scripts.insert("start".into(), "node .output/server/index.mjs".into());

    let lint_is_next = scripts
        .get("lint")
        .and_then(Value::as_str)
        .is_some_and(|lint| lint.trim_start().starts_with("next lint"));
    if lint_is_next || !scripts.contains_key("lint") {
        scripts.insert("lint".into(), DEFAULT_LINT.into());
    }
    if !scripts.contains_key("check-types") {
        scripts.insert("check-types".into(), "tsc --noEmit".into());
    }
}

/// Read, patch and rewrite `<root>/package.json`.
pub fn update_package_json(root: &Path, output: &TransformedOutput) -> Result<(), MigrateError> {
    let path = root.join("package.json");
    let raw = fs::read_to_string(&path).map_err(|e| MigrateError::io(&path, e))?;
    let mut value: Value = serde_json::from_str(&raw).map_err(|e| MigrateError::json(&path, e))?;
    let Value::Object(manifest) = &mut value else {
        return Err(MigrateError::Config(format!(
            "{} is not a JSON object",
            path.display()
        )));
    };

    patch_package_json(manifest, output);
    write_json(&path, &value)?;
    info!("package.json updated");
    Ok(())
}

/// TanStack Start adjustments to tsconfig.json.
pub fn patch_tsconfig(tsconfig: &mut Map<String, Value>) {
    let Some(options) = object_entry(tsconfig, "compilerOptions") else {
        return;
    };

    // 1) the Next.js language service plugin
    let mut drop_plugins = false;
    if let Some(Value::Array(plugins)) = options.get_mut("plugins") {
        plugins.retain(|p| p.get("name").and_then(Value::as_str) != Some("next"));
        drop_plugins = plugins.is_empty();
    }
    if drop_plugins {
        options.shift_remove("plugins");
    }

    // 2) vite client types
    let types = options
        .entry("types")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(types) = types {
        if !types.iter().any(|t| t.as_str() == Some("vite/client")) {
            types.push("vite/client".into());
        }
    }

    // 3) module resolution
    if options.get("moduleResolution").and_then(Value::as_str) == Some("node") {
        options.insert("moduleResolution".into(), "bundler".into());
    }

    // 4) next-env.d.ts is deleted with the other Next.js artefacts
    if let Some(Value::Array(include)) = tsconfig.get_mut("include") {
        include.retain(|entry| entry.as_str() != Some("next-env.d.ts"));
    }
}

/// Returns `Ok(false)` when there is no tsconfig.json. A tsconfig that is not
/// strict JSON (comments, trailing commas) surfaces as a `Json` error.
pub fn update_tsconfig(root: &Path) -> Result<bool, MigrateError> {
    let path = root.join("tsconfig.json");
    if !path.is_file() {
        return Ok(false);
    }
    let raw = fs::read_to_string(&path).map_err(|e| MigrateError::io(&path, e))?;
    let mut value: Value = serde_json::from_str(&raw).map_err(|e| MigrateError::json(&path, e))?;
    let Value::Object(tsconfig) = &mut value else {
        return Err(MigrateError::Config(format!(
            "{} is not a JSON object",
            path.display()
        )));
    };

    patch_tsconfig(tsconfig);
    write_json(&path, &value)?;
    info!("tsconfig.json updated");
    Ok(true)
}

/// Drop `.next` entries, append the TanStack build outputs.
pub fn patch_gitignore(content: &str) -> String {
    let mut lines: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().trim_start_matches('/').starts_with(".next"))
        .collect();

    for entry in GITIGNORE_ENTRIES {
        if !lines.iter().any(|line| line.trim() == entry) {
            lines.push(entry);
        }
    }

    // collapse runs of blank lines
    let mut out = String::with_capacity(content.len() + 32);
    let mut blank_run = 0;
    for line in lines {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    format!("{}\n", out.trim())
}

/// Returns `Ok(false)` when the project has no .gitignore.
pub fn update_gitignore(root: &Path) -> Result<bool, MigrateError> {
    let path = root.join(".gitignore");
    if !path.is_file() {
        return Ok(false);
    }
    let content = fs::read_to_string(&path).map_err(|e| MigrateError::io(&path, e))?;
    fs::write(&path, patch_gitignore(&content)).map_err(|e| MigrateError::io(&path, e))?;
    info!(".gitignore updated");
    Ok(true)
}

fn merge_table(manifest: &mut Map<String, Value>, key: &str, entries: &BTreeMap<String, String>) {
    if entries.is_empty() {
        return;
    }
    let Some(table) = object_entry(manifest, key) else {
        return;
    };
    for (name, range) in entries {
        table.insert(name.clone(), Value::String(range.clone()));
    }
}

/// `map[key]` as an object, replacing a missing or non-object value.
fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> Option<&'a mut Map<String, Value>> {
    let slot = map
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        debug!(key, "replacing non-object value");
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut()
}

fn write_json(path: &Path, value: &Value) -> Result<(), MigrateError> {
    let mut text = serde_json::to_string_pretty(value).map_err(|e| MigrateError::json(path, e))?;
    text.push('\n');
    fs::write(path, text).map_err(|e| MigrateError::io(path, e))
}
