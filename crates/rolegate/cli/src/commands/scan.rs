//! Full marker rescan over view source files

use std::path::{Path, PathBuf};

use clap::Args;
use rolegate_extract::{MarkerExtractor, ViewSource};
use rolegate_hierarchy::build_forest_report;
use rolegate_service::{ConfigClient, ServiceHandle};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::RolegateConfig;
use crate::error::{CliError, CliResult};

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// View source files or directories to scan
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Print the resulting forest without persisting it
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn execute(
    args: ScanArgs,
    config: &RolegateConfig,
    client: &ServiceHandle,
) -> CliResult<()> {
    let files = collect_sources(&args.paths, &config.scan.extensions)?;
    info!(files = files.len(), "Scanning view sources");

    let mut contents = Vec::with_capacity(files.len());
    for file in &files {
        debug!(file = %file.display(), "Reading view source");
        contents.push(std::fs::read_to_string(file)?);
    }

    let extractor = MarkerExtractor::new(config.markers.clone())?;
    let markers = extractor.extract_all(contents.iter().map(|c| ViewSource::Markup(c.as_str())));
    let report = build_forest_report(&markers);

    for warning in &report.warnings {
        println!("warning: {}", warning);
    }
    if report.forest.is_empty() {
        return Err(CliError::EmptyForest(files.len()));
    }

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&report.forest)?);
        return Ok(());
    }

    let updated = client.update_markers(report.forest).await?;
    println!(
        "Persisted {} marker(s) in {} root(s) from {} file(s) (version {})",
        updated.markers.marker_count(),
        updated.markers.root_count(),
        files.len(),
        updated.version
    );
    Ok(())
}

/// Files named directly, plus every file under a named directory whose
/// extension is in `extensions`. Sorted, so repeated scans see the same order.
pub fn collect_sources(paths: &[PathBuf], extensions: &[String]) -> CliResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.exists() {
            return Err(CliError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }

        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}
