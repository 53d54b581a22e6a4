// src/migrator.rs
//
// detect → validate → analyze → confirm → backup → transform → write → report

use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::backup;
use crate::config::MigrateOptions;
use crate::detector::{self, DetectionResult};
use crate::error::MigrateError;
use crate::generator::{self, route_root};
use crate::manifest::{self, PackageJson};
use crate::materializer::{self, WriteSummary};
use crate::model::{Framework, ProjectStructure, TransformedOutput};
use crate::report;
use crate::transform::CodeTransformer;

/// Asked once, after analysis, before anything is written.
pub trait Confirm {
    fn confirm(&mut self, structure: &ProjectStructure, options: &MigrateOptions) -> bool;
}

/// Shows the plan on stderr and reads a y/N answer from stdin.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, structure: &ProjectStructure, options: &MigrateOptions) -> bool {
        let mut err = io::stderr().lock();
        let shown = report::write_plan(&mut err, structure, options)
            .and_then(|()| write!(err, "Proceed with the migration? [y/N] "))
            .and_then(|()| err.flush());
        if shown.is_err() {
            return false;
        }
        drop(err);
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MigrationStatus {
    Completed,
    DryRun,
    /// The user declined; nothing was touched
    Cancelled,
}

#[derive(Debug)]
pub struct MigrationOutcome {
    pub status: MigrationStatus,
    pub detection: DetectionResult,
    pub structure: ProjectStructure,
    /// `None` when cancelled
    pub output: Option<TransformedOutput>,
    pub writes: Option<WriteSummary>,
    pub backup: Option<PathBuf>,
    /// Port of the migrated dev server
    pub dev_port: String,
}

pub struct Migrator {
    root: PathBuf,
    options: MigrateOptions,
}

impl Migrator {
    pub fn new(root: impl Into<PathBuf>, options: MigrateOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    pub fn run(&self, confirm: &mut dyn Confirm) -> Result<MigrationOutcome, MigrateError> {
        let opts = &self.options;

        // 1) detect
        let detection = detector::detect(&self.root)?;
        let root = detection.root_path.clone();
        let framework = self.source_framework(&detection)?;

        // 2) validate
        let reasons = validation_errors(&root);
        if !reasons.is_empty() {
            return Err(MigrateError::Validation(reasons));
        }

        // 3) analyze
        let structure = crate::analyzer::analyze(&root, framework, &opts.ignore)?;
        if opts.strict && structure.routes.is_empty() {
            return Err(MigrateError::NoRoutes {
                app_dir: structure.app_dir.clone(),
            });
        }
        let dev_port = PackageJson::read(&root.join("package.json"))
            .map(|pkg| manifest::dev_port(pkg.scripts.get("dev").map(String::as_str)))
            .unwrap_or_else(|_| manifest::dev_port(None));

        // 4) confirm
        if !opts.yes && !opts.dry_run && !confirm.confirm(&structure, opts) {
            warn!("migration cancelled");
            return Ok(MigrationOutcome {
                status: MigrationStatus::Cancelled,
                detection,
                structure,
                output: None,
                writes: None,
                backup: None,
                dev_port,
            });
        }

        // 5) backup
        let backup = if opts.backup && !opts.dry_run {
            Some(backup::create_backup(&root)?)
        } else {
            None
        };

        // 6) transform
        let transformer = CodeTransformer::new(opts.variant, opts.strategy);
        let mut output =
            generator::transform_to_tanstack_start(&structure, &transformer, opts.routes_directory);
        info!(
            transformed = output.report.transformed_routes,
            skipped = output.report.skipped_routes,
            errors = output.report.errors.len(),
            "transform finished"
        );

        if opts.dry_run {
            info!("dry run, nothing written");
            return Ok(MigrationOutcome {
                status: MigrationStatus::DryRun,
                detection,
                structure,
                output: Some(output),
                writes: None,
                backup,
                dev_port,
            });
        }

        // 7) write
        let writes = materializer::materialize(&root, &output, &structure.app_dir);
        output.report.warnings.extend(writes.warnings.iter().cloned());
        output.report.errors.extend(writes.failures.iter().cloned());
        info!(
            routes = %route_root(&structure, opts.routes_directory),
            "migration finished"
        );

        Ok(MigrationOutcome {
            status: MigrationStatus::Completed,
            detection,
            structure,
            output: Some(output),
            writes: Some(writes),
            backup,
            dev_port,
        })
    }

    fn source_framework(&self, detection: &DetectionResult) -> Result<Framework, MigrateError> {
        let framework = self.options.source_framework.unwrap_or(detection.framework);
        match framework {
            Framework::NextJs => {}
            Framework::Unknown => {
                return Err(MigrateError::FrameworkNotDetected {
                    path: detection.root_path.clone(),
                });
            }
            other => return Err(MigrateError::UnsupportedSource(other)),
        }

        let target = &self.options.target_framework;
        if Framework::parse(target) != Some(Framework::TanstackStart) {
            return Err(MigrateError::UnsupportedTarget(target.clone()));
        }
        Ok(framework)
    }
}

/// Every unmet prerequisite, not just the first.
pub fn validation_errors(root: &Path) -> Vec<String> {
    let mut reasons = Vec::new();
    if !detector::StructureSignals::collect(root).uses_app_router() {
        reasons.push("no app/ or src/app/ directory (only the App Router is supported)".to_string());
    }
    if !root.join("package.json").is_file() {
        reasons.push("no package.json found".to_string());
    }
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliOverrides;
    use crate::generator::RoutesDirectory;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    struct Answer {
        yes: bool,
        asked: usize,
    }

    impl Confirm for Answer {
        fn confirm(&mut self, _: &ProjectStructure, _: &MigrateOptions) -> bool {
            self.asked += 1;
            self.yes
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn next_project(dev_script: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            root,
            "package.json",
            &format!(
                r#"{{
  "name": "site",
  "scripts": {{ "dev": "{dev_script}", "build": "next build", "lint": "next lint" }},
  "dependencies": {{ "next": "15.1.0", "react": "19.0.0", "react-dom": "19.0.0" }}
}}"#
            ),
        );
        write(root, "next.config.mjs", "export default {};\n");
        write(root, "next-env.d.ts", "/// <reference types=\"next\" />\n");
        write(
            root,
            "app/layout.tsx",
            r#"import "./globals.css";
export const metadata = { title: "Site" };
export default function RootLayout({ children }: { children: React.ReactNode }) {
  return <html lang="en"><body>{children}</body></html>;
}
"#,
        );
        write(root, "app/globals.css", "body { margin: 0; }\n");
        write(
            root,
            "app/page.tsx",
            "export default function Home() { return <main>Home</main>; }\n",
        );
        write(
            root,
            "app/blog/[slug]/page.tsx",
            r#"export default async function Post({ params }: { params: Promise<{ slug: string }> }) {
  const { slug } = await params;
  return <h1>{slug}</h1>;
}
"#,
        );
        write(root, "app/loading.tsx", "export default function Loading() { return null; }\n");
        dir
    }

    fn options(cli: CliOverrides) -> MigrateOptions {
        MigrateOptions::layered(Default::default(), cli).unwrap()
    }

    fn approve() -> Answer {
        Answer { yes: true, asked: 0 }
    }

    #[test]
    fn migrates_a_next_project_end_to_end() {
        let dir = next_project("next dev -p 3001");
        let root = dir.path();
        let mut confirm = approve();

        let outcome = Migrator::new(root, options(CliOverrides::default()))
            .run(&mut confirm)
            .unwrap();

        assert_eq!(outcome.status, MigrationStatus::Completed);
        assert_eq!(confirm.asked, 1);
        assert_eq!(outcome.dev_port, "3001");
        let report = &outcome.output.as_ref().unwrap().report;
        assert_eq!(report.total_routes, 4);
        assert_eq!(report.transformed_routes, 3);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.errors.is_empty(), "{:?}", report.errors);

        assert!(root.join("app/__root.tsx").is_file());
        assert!(root.join("app/index.tsx").is_file());
        let post = fs::read_to_string(root.join("app/blog/$slug.tsx")).unwrap();
        assert!(post.contains("Route.useParams()"));
        assert!(!root.join("app/page.tsx").exists());
        assert!(!root.join("app/blog/[slug]").exists());
        assert!(root.join("app/loading.tsx").exists());
        assert!(!root.join("next.config.mjs").exists());
        assert!(!root.join("next-env.d.ts").exists());
        assert!(root.join("vite.config.ts").is_file());
        assert!(root.join("router.tsx").is_file());

        let pkg: Value =
            serde_json::from_str(&fs::read_to_string(root.join("package.json")).unwrap()).unwrap();
        assert!(pkg["dependencies"].get("next").is_none());
        assert_eq!(pkg["dependencies"]["@tanstack/react-router"], "^1.132.0");
        assert_eq!(pkg["dependencies"]["react"], "19.0.0");
        assert_eq!(pkg["scripts"]["dev"], "vite dev --port 3001");
        assert_eq!(pkg["scripts"]["lint"], "eslint --max-warnings 0");
        assert_eq!(pkg["type"], "module");
    }

    #[test]
    fn default_dev_port_is_3000() {
        let dir = next_project("next dev");
        let outcome = Migrator::new(dir.path(), options(CliOverrides::default()))
            .run(&mut approve())
            .unwrap();
        assert_eq!(outcome.dev_port, "3000");
        let pkg = fs::read_to_string(dir.path().join("package.json")).unwrap();
        assert!(pkg.contains(r#""dev": "vite dev --port 3000""#));
    }

    #[test]
    fn dry_run_writes_nothing_and_never_asks() {
        let dir = next_project("next dev");
        let before = fs::read_to_string(dir.path().join("package.json")).unwrap();
        let mut confirm = approve();

        let outcome = Migrator::new(
            dir.path(),
            options(CliOverrides {
                dry_run: true,
                backup: true,
                ..CliOverrides::default()
            }),
        )
        .run(&mut confirm)
        .unwrap();

        assert_eq!(outcome.status, MigrationStatus::DryRun);
        assert_eq!(confirm.asked, 0);
        assert!(outcome.backup.is_none());
        assert_eq!(outcome.output.unwrap().routes.len(), 3);
        assert!(dir.path().join("app/page.tsx").is_file());
        assert!(!dir.path().join("vite.config.ts").exists());
        assert!(!dir.path().join(backup::BACKUP_DIR).exists());
        assert_eq!(fs::read_to_string(dir.path().join("package.json")).unwrap(), before);
    }

    #[test]
    fn declining_cancels_without_changes() {
        let dir = next_project("next dev");
        let outcome = Migrator::new(dir.path(), options(CliOverrides::default()))
            .run(&mut Answer { yes: false, asked: 0 })
            .unwrap();
        assert_eq!(outcome.status, MigrationStatus::Cancelled);
        assert!(outcome.output.is_none());
        assert!(dir.path().join("app/page.tsx").is_file());
    }

    #[test]
    fn yes_skips_confirmation_and_backup_is_taken() {
        let dir = next_project("next dev");
        let mut confirm = approve();
        let outcome = Migrator::new(
            dir.path(),
            options(CliOverrides {
                yes: true,
                backup: true,
                routes_directory: Some(RoutesDirectory::Routes),
                ..CliOverrides::default()
            }),
        )
        .run(&mut confirm)
        .unwrap();

        assert_eq!(confirm.asked, 0);
        let backup = outcome.backup.unwrap();
        assert!(backup.join("app/page.tsx").is_file());
        assert!(dir.path().join("routes/index.tsx").is_file());
        assert!(dir.path().join("routes/globals.css").is_file());
        assert!(!dir.path().join("app/page.tsx").exists());
    }

    #[test]
    fn validation_lists_every_reason() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "next.config.js", "module.exports = {};\n");

        let err = Migrator::new(dir.path(), options(CliOverrides::default()))
            .run(&mut approve())
            .unwrap_err();
        let reasons = match err {
            MigrateError::Validation(reasons) => reasons,
            other => panic!("expected a validation error, got {other}"),
        };
        assert_eq!(reasons.len(), 2);
    }

    #[test]
    fn unknown_and_unsupported_frameworks_are_fatal() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "package.json", r#"{ "dependencies": { "react": "19.0.0" } }"#);
        assert!(matches!(
            Migrator::new(dir.path(), options(CliOverrides::default())).run(&mut approve()),
            Err(MigrateError::FrameworkNotDetected { .. })
        ));

        write(dir.path(), "package.json", r#"{ "dependencies": { "astro": "5.0.0" } }"#);
        assert!(matches!(
            Migrator::new(dir.path(), options(CliOverrides::default())).run(&mut approve()),
            Err(MigrateError::UnsupportedSource(Framework::Astro))
        ));

        let project = next_project("next dev");
        let cli = CliOverrides {
            to: Some("remix".into()),
            ..CliOverrides::default()
        };
        assert!(matches!(
            Migrator::new(project.path(), options(cli)).run(&mut approve()),
            Err(MigrateError::UnsupportedTarget(t)) if t == "remix"
        ));
    }

    #[test]
    fn strict_mode_requires_routes() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "package.json", r#"{ "dependencies": { "next": "15.0.0" } }"#);
        fs::create_dir_all(dir.path().join("app")).unwrap();

        let lenient = Migrator::new(dir.path(), options(CliOverrides { dry_run: true, ..Default::default() }))
            .run(&mut approve())
            .unwrap();
        assert_eq!(lenient.output.unwrap().report.total_routes, 0);

        let strict = Migrator::new(
            dir.path(),
            options(CliOverrides {
                dry_run: true,
                strict: true,
                ..Default::default()
            }),
        )
        .run(&mut approve());
        assert!(matches!(strict, Err(MigrateError::NoRoutes { .. })));
    }
}
