// src/config.rs
//
// Run options: defaults < hopr.config.json < command line.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::MigrateError;
use crate::generator::RoutesDirectory;
use crate::model::Framework;
use crate::transform::{PageStrategy, ShellVariant};

pub const CONFIG_FILE: &str = "hopr.config.json";
pub const DEFAULT_TARGET: &str = "tanstack-start";

/// Optional project-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileConfig {
    pub source_framework: Option<String>,
    pub target_framework: Option<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
    pub variant: Option<ShellVariant>,
    pub strategy: Option<PageStrategy>,
    pub routes_directory: Option<RoutesDirectory>,
}

impl FileConfig {
    /// `Ok(None)` when the project has no config file.
    pub fn load(root: &Path) -> Result<Option<Self>, MigrateError> {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).map_err(|e| MigrateError::io(&path, e))?;
        let config: FileConfig =
            serde_json::from_str(&raw).map_err(|e| MigrateError::json(&path, e))?;
        debug!(path = %path.display(), "loaded project config");
        Ok(Some(config))
    }
}

/// Values given on the command line. `None` defers to the lower layers.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub from: Option<String>,
    pub to: Option<String>,
    pub variant: Option<ShellVariant>,
    pub strategy: Option<PageStrategy>,
    pub routes_directory: Option<RoutesDirectory>,
    pub dry_run: bool,
    pub yes: bool,
    pub backup: bool,
    pub strict: bool,
}

/// Fully resolved options for one migration run.
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    /// Overrides detection when set
    pub source_framework: Option<Framework>,
    pub target_framework: String,
    pub ignore: Vec<String>,
    pub variant: ShellVariant,
    pub strategy: PageStrategy,
    pub routes_directory: RoutesDirectory,
    pub dry_run: bool,
    pub yes: bool,
    pub backup: bool,
    /// Zero discovered routes is fatal
    pub strict: bool,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            source_framework: None,
            target_framework: DEFAULT_TARGET.to_string(),
            ignore: Vec::new(),
            variant: ShellVariant::default(),
            strategy: PageStrategy::default(),
            routes_directory: RoutesDirectory::default(),
            dry_run: false,
            yes: false,
            backup: false,
            strict: false,
        }
    }
}

impl MigrateOptions {
    /// Layer the project's config file and the command line over the defaults.
    pub fn resolve(root: &Path, cli: CliOverrides) -> Result<Self, MigrateError> {
        let file = FileConfig::load(root)?.unwrap_or_default();
        Self::layered(file, cli)
    }

    pub fn layered(file: FileConfig, cli: CliOverrides) -> Result<Self, MigrateError> {
        let defaults = Self::default();

        let source_framework = match cli.from.or(file.source_framework) {
            Some(name) => Some(
                Framework::parse(&name)
                    .ok_or_else(|| MigrateError::Config(format!("unknown framework `{name}`")))?,
            ),
            None => None,
        };

        Ok(Self {
            source_framework,
            target_framework: cli
                .to
                .or(file.target_framework)
                .unwrap_or(defaults.target_framework),
            ignore: file.ignore,
            variant: cli.variant.or(file.variant).unwrap_or(defaults.variant),
            strategy: cli.strategy.or(file.strategy).unwrap_or(defaults.strategy),
            routes_directory: cli
                .routes_directory
                .or(file.routes_directory)
                .unwrap_or(defaults.routes_directory),
            dry_run: cli.dry_run,
            yes: cli.yes,
            backup: cli.backup,
            strict: cli.strict,
        })
    }
}
