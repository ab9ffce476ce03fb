//! Prunes old artifacts of a job.

use crate::artifact::ArtifactName;
use crate::job::Compression;
use glob::Pattern;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A stale artifact that could not be listed or removed. Never fails the job.
#[derive(Debug)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to remove {}: {}", self.path.display(), self.message)
    }
}

#[derive(Debug, Default)]
pub struct RetentionReport {
    pub kept: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub warnings: Vec<CleanupWarning>,
}

/// Artifacts of `job` in `destination`, oldest first.
///
/// Listing matches `<job>_*.<ext>` and keeps only names whose middle part is
/// an artifact timestamp, so order is derived from names alone.
pub fn list_artifacts(
    destination: &Path,
    job: &str,
    compression: Compression,
) -> Result<Vec<PathBuf>, glob::PatternError> {
    let pattern = format!(
        "{}/{}_*.{}",
        Pattern::escape(&destination.to_string_lossy()),
        Pattern::escape(job),
        compression.extension()
    );

    let mut files: Vec<PathBuf> = glob::glob(&pattern)?
        .filter_map(|entry| entry.ok())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| ArtifactName::parse_timestamp(n, job, compression))
                .is_some()
        })
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Keep at most `retain` artifacts, deleting the oldest first.
///
/// `retain == 0` deletes everything, including an artifact that was just
/// written.
pub fn prune(destination: &Path, job: &str, compression: Compression, retain: usize) -> RetentionReport {
    let mut report = RetentionReport::default();

    let files = match list_artifacts(destination, job, compression) {
        Ok(files) => files,
        Err(e) => {
            warn!("Failed to list backup files in {}: {}", destination.display(), e);
            report.warnings.push(CleanupWarning {
                path: destination.to_path_buf(),
                message: e.to_string(),
            });
            return report;
        }
    };

    let excess = files.len().saturating_sub(retain);
    if excess > 0 {
        info!("Removing {} old backup files (retention: {})", excess, retain);
    }

    for (idx, file) in files.into_iter().enumerate() {
        if idx >= excess {
            report.kept.push(file);
            continue;
        }
        match std::fs::remove_file(&file) {
            Ok(()) => {
                info!("Removed old backup: {}", file.display());
                report.removed.push(file);
            }
            Err(e) => {
                let warning = CleanupWarning {
                    path: file,
                    message: e.to_string(),
                };
                warn!("Warning: {}", warning);
                report.warnings.push(warning);
            }
        }
    }

    report
}
