// src/report.rs
//
// Everything the user reads on stdout. Diagnostics go through tracing. The
// confirmation plan goes to stderr so `--json` output stays clean.

use serde_json::{Value, json};
use std::io::{self, Write};

use crate::backup;
use crate::config::MigrateOptions;
use crate::detector::DetectionResult;
use crate::generator::route_root;
use crate::migrator::{MigrationOutcome, MigrationStatus};
use crate::model::{PackageManager, ProjectStructure, TransformedOutput};

pub fn print_detection(d: &DetectionResult) {
    println!("Project:          {}", d.root_path.display());
    println!("Framework:        {}", d.framework);
    println!("Routing:          {}", routing_label(d));
    println!("Package manager:  {}", d.package_manager);
    if d.structure.has_vite_config {
        println!("Vite config:      present");
    }
}

fn routing_label(d: &DetectionResult) -> String {
    serde_json::to_value(d.routing)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// What a migration is about to do, shown before asking for confirmation.
pub fn write_plan(
    out: &mut impl Write,
    structure: &ProjectStructure,
    options: &MigrateOptions,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Migration plan: {} → tanstack-start", structure.framework)?;
    writeln!(out, "  routes found:     {}", structure.routes.len())?;
    if !structure.unreadable.is_empty() {
        writeln!(out, "  unreadable:       {}", structure.unreadable.len())?;
    }
    writeln!(
        out,
        "  route directory:  {} → {}",
        structure.app_dir,
        route_root(structure, options.routes_directory)
    )?;
    writeln!(out, "  root shell:       {:?}", options.variant)?;
    writeln!(out, "  page rewrite:     {:?}", options.strategy)?;
    writeln!(out, "  backup:           {}", if options.backup { "yes" } else { "no" })?;
    writeln!(out)
}

pub fn print_outcome(outcome: &MigrationOutcome) {
    let Some(output) = &outcome.output else {
        println!("Migration cancelled; no files were changed.");
        return;
    };

    println!();
    match outcome.status {
        MigrationStatus::DryRun => {
            println!("Dry run: no changes were made. The migration would:");
            print_operations(output);
        }
        _ => {
            if let Some(writes) = &outcome.writes {
                section("Files written", &writes.written);
                section("Files moved", &writes.moved);
                section("Files deleted", &writes.deleted);
                section("Manifests updated", &writes.manifests);
            }
        }
    }

    let report = &output.report;
    println!(
        "Routes: {} total, {} transformed, {} skipped",
        report.total_routes, report.transformed_routes, report.skipped_routes
    );
    let skipped: Vec<String> = report
        .skipped
        .iter()
        .map(|s| format!("{}: {}", s.source_path, s.reason))
        .collect();
    section("Skipped", &skipped);
    section("Warnings", &report.warnings);
    section("Errors", &report.errors);

    if let Some(path) = &outcome.backup {
        println!("Backup created at {}", path.display());
        for line in backup::rollback_instructions(path) {
            println!("{line}");
        }
        println!();
    }

    if outcome.status == MigrationStatus::Completed {
        section(
            "Next steps",
            &next_steps(outcome.structure.package_manager, &outcome.dev_port),
        );
    }
}

fn print_operations(output: &TransformedOutput) {
    let writes: Vec<String> = output
        .routes
        .iter()
        .map(|r| format!("{} (from {})", r.target_path, r.source_path))
        .chain(output.configs.iter().map(|c| c.path.clone()))
        .collect();
    let moves: Vec<String> = output
        .files_to_move
        .iter()
        .chain(&output.directories_to_move)
        .map(|m| format!("{} → {}", m.from, m.to))
        .collect();
    section("  write", &writes);
    section("  move", &moves);
    section("  delete", &output.files_to_delete);
    section("  remove dependencies", &output.remove_dependencies);
    let added: Vec<String> = output
        .dependencies
        .iter()
        .chain(&output.dev_dependencies)
        .map(|(name, range)| format!("{name}@{range}"))
        .collect();
    section("  add dependencies", &added);
}

fn section(title: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    println!("{title}:");
    for line in lines {
        println!("  - {line}");
    }
    println!();
}

pub fn next_steps(pm: PackageManager, port: &str) -> Vec<String> {
    vec![
        format!("Run `{}`", pm.install_command()),
        "Review the changes and test the application".to_string(),
        format!("Run `{}`", pm.run_command("dev")),
        format!("Visit http://localhost:{port}"),
    ]
}

/// `--json` form of a migration run.
pub fn outcome_json(outcome: &MigrationOutcome) -> Value {
    json!({
        "status": outcome.status,
        "root": outcome.detection.root_path,
        "framework": outcome.detection.framework,
        "packageManager": outcome.structure.package_manager,
        "routes": outcome.output.as_ref().map(|o| &o.routes),
        "configs": outcome.output.as_ref().map(|o| &o.configs),
        "filesToDelete": outcome.output.as_ref().map(|o| &o.files_to_delete),
        "filesToMove": outcome.output.as_ref().map(|o| &o.files_to_move),
        "directoriesToMove": outcome.output.as_ref().map(|o| &o.directories_to_move),
        "report": outcome.output.as_ref().map(|o| &o.report),
        "backup": outcome.backup,
    })
}
