//! Display utilities and output for the photoport CLI.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use photoport_lib::{ImportJob, TrackerView};
use std::path::{Path, PathBuf};

/// Name used when a download has no usable file name.
const FALLBACK_FILE_NAME: &str = "download";

/// Creates the import progress bar, hidden in quiet mode.
pub(crate) fn progress_bar(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}",
            )
            .context("Invalid progress template")?
            .progress_chars("=>-"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Ok(pb)
}

/// Updates the progress bar from a tracker view.
///
/// The position never exceeds the length, so the percentage stays at or
/// below 100 even if the backend over-reports progress.
pub(crate) fn render(bar: &ProgressBar, view: &TrackerView) {
    if let Some(job) = &view.job {
        let total = job.total.unwrap_or(0);
        bar.set_length(total);
        bar.set_position(job.progress.min(total));
    }
    if let Some(message) = &view.message {
        bar.set_message(message.to_string());
    }
}

/// Formats progress as `done/total (pct%)`, or just `done` while the total is
/// unknown.
pub(crate) fn progress_summary(job: &ImportJob) -> String {
    match (job.total, job.progress_percent()) {
        (Some(total), Some(percent)) => format!("{}/{total} ({percent}%)", job.progress),
        _ => job.progress.to_string(),
    }
}

/// Prints a job snapshot.
pub(crate) fn print_job(job: &ImportJob) {
    println!("Session: {}", job.session_id);
    println!("Status: {}", job.status);
    println!("Progress: {}", progress_summary(job));
    print_errors(&job.errors);

    if !job.files_to_download.is_empty() {
        println!("\nFiles:");
        for file in &job.files_to_download {
            println!("  {}  (token: {})", file.path, file.download_token);
        }
    }
}

/// Prints backend error messages in order.
pub(crate) fn print_errors(errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    println!("\nErrors:");
    for (i, error) in errors.iter().enumerate() {
        println!("  {}. {error}", i + 1);
    }
}

/// Writes downloaded bytes to `dir`, named after the last segment of `name`.
///
/// Returns the path written.
pub(crate) fn save_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let file_name = Path::new(name)
        .file_name()
        .filter(|n| !n.is_empty())
        .map_or_else(|| FALLBACK_FILE_NAME.into(), ToOwned::to_owned);

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    let path = dir.join(file_name);
    std::fs::write(&path, bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
