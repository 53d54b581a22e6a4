// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

use crate::model::Framework;

/// Fatal, run-level failures. Anything here stops the migration before the
/// write phase.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("could not detect a supported framework in {}", path.display())]
    FrameworkNotDetected { path: PathBuf },

    #[error("unsupported source framework: {0} (only nextjs is supported)")]
    UnsupportedSource(Framework),

    #[error("unsupported target framework: {0} (only tanstack-start is supported)")]
    UnsupportedTarget(String),

    #[error("migration prerequisites not met:\n{}", bullet_list(.0))]
    Validation(Vec<String>),

    #[error("no routes found under {app_dir}")]
    NoRoutes { app_dir: String },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MigrateError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

/// Per-file failures inside the code transformer. These are recorded in the
/// report and never abort the run.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("{0}")]
    UnexpectedShape(String),

    #[error("failed to print output: {0}")]
    Emit(#[from] std::io::Error),
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("  • {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
