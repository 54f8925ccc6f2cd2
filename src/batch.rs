//! Batch mode: transform every JS/TS module under a directory.
//!
//! Files are independent, so they are transformed in parallel. A failure in
//! one file is recorded and the rest still run.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::cache::IncrementalCache;
use crate::error::{TransformError, INJ_ERR_IO};
use crate::options::TransformOptions;
use crate::transform::{transform, TransformOutput};

pub const SOURCE_EXTENSIONS: [&str; 6] = ["js", "jsx", "mjs", "cjs", "ts", "tsx"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub transformed: Vec<String>,
    pub cached: Vec<String>,
    pub failed: Vec<TransformError>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name == "node_modules" || name.starts_with('.')
}

fn is_source_file(path: &Path) -> bool {
    let is_declaration = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".d.ts"));
    !is_declaration
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// All module files under `root`, sorted for stable output.
pub fn discover_sources(root: &Path) -> Vec<PathBuf> {
    walk_sources(root, None)
}

/// Like `discover_sources`, but never descends into `excluded` (an output
/// directory nested in the input tree holds already-transformed files).
fn walk_sources(root: &Path, excluded: Option<&Path>) -> Vec<PathBuf> {
    let excluded = excluded.and_then(|dir| fs::canonicalize(dir).ok());
    let is_excluded = |entry: &DirEntry| {
        entry.file_type().is_dir()
            && excluded
                .as_deref()
                .is_some_and(|dir| fs::canonicalize(entry.path()).is_ok_and(|path| path == dir))
    };

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry) && !is_excluded(entry))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_source_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFORM TREE
// ═══════════════════════════════════════════════════════════════════════════════

enum FileOutcome {
    Transformed(String),
    Cached(String),
}

/// Transforms every source under `root` into the mirrored path under `out_dir`.
pub fn transform_tree(
    root: &Path,
    out_dir: &Path,
    options: &TransformOptions,
    cache: Option<&IncrementalCache>,
) -> BatchReport {
    let files = walk_sources(root, Some(out_dir));
    tracing::info!(root = %root.display(), files = files.len(), "discovered sources");

    let outcomes: Vec<Result<FileOutcome, TransformError>> = files
        .par_iter()
        .map(|path| transform_file(root, out_dir, path, options, cache))
        .collect();

    let mut report = BatchReport::default();
    for outcome in outcomes {
        match outcome {
            Ok(FileOutcome::Transformed(path)) => report.transformed.push(path),
            Ok(FileOutcome::Cached(path)) => report.cached.push(path),
            Err(e) => {
                tracing::error!("{}", e);
                report.failed.push(e);
            }
        }
    }

    tracing::info!(
        transformed = report.transformed.len(),
        cached = report.cached.len(),
        failed = report.failed.len(),
        "batch finished"
    );
    report
}

fn transform_file(
    root: &Path,
    out_dir: &Path,
    path: &Path,
    options: &TransformOptions,
    cache: Option<&IncrementalCache>,
) -> Result<FileOutcome, TransformError> {
    let label = path.to_string_lossy().to_string();
    let io_error = |what: &str, e: std::io::Error| {
        TransformError::new(INJ_ERR_IO, &format!("{}: {}", what, e), &label)
    };

    let source = fs::read_to_string(path).map_err(|e| io_error("Failed to read", e))?;
    let options = options.clone().with_file_path(label.clone());

    let (output, cached) = match cache.and_then(|c| c.get(&label, &source, &options)) {
        Some(output) => (output, true),
        None => {
            let output = transform(&source, &options)?;
            if let Some(cache) = cache {
                cache.set(&label, &source, &options, &output);
            }
            (output, false)
        }
    };

    let relative = path.strip_prefix(root).unwrap_or(path);
    let destination = out_dir.join(relative);
    write_output(&destination, &output).map_err(|e| io_error("Failed to write", e))?;

    Ok(if cached {
        FileOutcome::Cached(label)
    } else {
        FileOutcome::Transformed(label)
    })
}

fn write_output(destination: &Path, output: &TransformOutput) -> std::io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(destination, &output.code)
}
