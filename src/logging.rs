//! Tracing setup for gestor.
//!
//! Events go to stdout and, unless `logging.file` is empty, are appended to
//! that file. A set `RUST_LOG` replaces the configured filter.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::{GestorError, Result};

/// Dependencies that log every query or connection at debug level.
const QUIET_TARGETS: &[&str] = &[
    "sqlx=warn",
    "aws_config=warn",
    "aws_smithy_runtime=warn",
    "hyper=warn",
    "h2=warn",
];

/// Filter directives for a configured level.
///
/// The level applies to gestor and to the HTTP request spans from
/// `tower_http`; chatty dependencies stay at `warn`. Unknown levels fall
/// back to `info`.
fn directives(level: &str) -> String {
    let level = level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO)
        .to_string()
        .to_lowercase();
    let mut directives = vec![
        level.clone(),
        format!("gestor={level}"),
        format!("tower_http={level}"),
    ];
    directives.extend(QUIET_TARGETS.iter().map(|d| d.to_string()));
    directives.join(",")
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(level)))
}

/// Open the log file for appending, creating parent directories.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Install the global subscriber described by `config`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let file_layer = if config.file.is_empty() {
        None
    } else {
        let file = open_log_file(Path::new(&config.file))?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false),
        )
    };

    tracing_subscriber::registry()
        .with(build_filter(&config.level))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(file_layer)
        .try_init()
        .map_err(|e| GestorError::Config(format!("cannot install logger: {e}")))
}

/// Install a stdout-only subscriber, used when the log file cannot be opened.
pub fn init_console_only(level: &str) {
    let installed = tracing_subscriber::registry()
        .with(build_filter(level))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init();
    if let Err(e) = installed {
        eprintln!("Logger already installed: {e}");
    }
}
