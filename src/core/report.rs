// src/core/report.rs

use crate::core::models::ScanResults;
use crate::core::scanner::Scanner;
use crate::error::ReportError;
use futures::stream::{self, StreamExt};
use std::path::Path;
use tracing::{debug, info};

/// Expands the CLI target argument. A path ending in `.txt` that exists is read
/// as one URL per line (blank lines ignored); anything else is the single target.
pub fn load_targets(arg: &str) -> Result<Vec<String>, ReportError> {
    let path = Path::new(arg);
    if !(arg.ends_with(".txt") && path.is_file()) {
        return Ok(vec![arg.to_string()]);
    }

    let content = std::fs::read_to_string(path)
        .map_err(|source| ReportError::Io { path: arg.to_string(), source })?;
    let targets: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    info!(file = arg, count = targets.len(), "Loaded target list.");
    Ok(targets)
}

/// Scans every target and keys the reports by URL. `concurrency` bounds how many
/// targets are in flight at once; one target's failure never stops the others.
pub async fn run_scan(scanner: &Scanner, targets: &[String], concurrency: usize) -> ScanResults {
    info!(targets = targets.len(), concurrency, "Starting scan run.");
    let reports: Vec<_> = stream::iter(targets)
        .map(|target| async move { (target.clone(), scanner.scan_service(target).await) })
        .buffered(concurrency.max(1))
        .collect()
        .await;
    reports.into_iter().collect()
}

/// Serializes the results as 2-space indented JSON.
pub fn render_json(results: &ScanResults) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// Writes the results to `path`, creating parent directories as needed.
pub fn write_report(path: &Path, results: &ScanResults) -> Result<(), ReportError> {
    let io_err = |source| ReportError::Io { path: path.display().to_string(), source };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        debug!(dir = %parent.display(), "Creating report directory.");
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, render_json(results)?).map_err(io_err)?;
    info!(path = %path.display(), reports = results.len(), "Report written.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ScanReport;
    use std::io::Write;

    #[test]
    fn single_url_is_its_own_target() {
        assert_eq!(load_targets("http://abc.onion").unwrap(), vec!["http://abc.onion"]);
    }

    #[test]
    fn missing_list_file_is_treated_as_a_target() {
        assert_eq!(load_targets("/nonexistent/targets.txt").unwrap(), vec!["/nonexistent/targets.txt"]);
    }

    #[test]
    fn list_file_yields_trimmed_non_blank_lines() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "http://a.onion\n\n  http://b.onion  \n").unwrap();

        let targets = load_targets(file.path().to_str().unwrap()).unwrap();
        assert_eq!(targets, vec!["http://a.onion", "http://b.onion"]);
    }

    #[test]
    fn report_is_written_with_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/report.json");
        let mut results = ScanResults::new();
        results.insert("http://a.onion".into(), ScanReport::new("http://a.onion"));

        write_report(&path, &results).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("{\n  \"http://a.onion\": {\n    \"url\""));
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed["http://a.onion"]["errors"], serde_json::json!([]));
    }
}
