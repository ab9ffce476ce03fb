//! Backup pipeline orchestration.
//!
//! Each job moves through
//! `Validating → Building → Executing → Classifying → Placing → Retaining → Done`.
//! Sync-then-archive jobs first run `Validating → Building → Executing →
//! Classifying` for rsync and then enter the archive stages with the staging
//! directory as their effective source.
//!
//! Jobs run strictly one after another. A failed job is recorded and the run
//! moves on to the next one.

use crate::artifact::ArtifactName;
use crate::catalog::Catalog;
use crate::command::{rsync_command, tar_command};
use crate::executor::classify::{classify_archive, classify_sync, Outcome};
use crate::executor::{self, ExecOutput};
use crate::job::{JobDescriptor, JobKind};
use crate::placement::{place, Placement};
use crate::retention::{prune, RetentionReport};
use crate::utils::{ExecError, JobError, PlacementError};
use chrono::{Local, NaiveDateTime};
use nix::unistd::AccessFlags;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, info_span, warn, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Building,
    Executing,
    Classifying,
    Placing,
    Retaining,
    Done,
}

fn enter(stage: Stage) {
    debug!(?stage, "entering stage");
}

/// Result of a successful job
#[derive(Debug)]
pub struct JobReport {
    pub name: String,
    pub artifact: PathBuf,
    pub placement: Placement,

    /// tar exited with only "file changed as we read it" warnings
    pub had_benign_warnings: bool,

    pub retention: RetentionReport,
}

/// Outcome of a whole invocation, in job order
#[derive(Debug, Default)]
pub struct RunSummary {
    pub succeeded: Vec<JobReport>,
    pub failed: Vec<(String, JobError)>,
}

impl RunSummary {
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs backup jobs against one scratch root.
///
/// The scratch root is shared; each sync job stages into `<scratch>/<name>`.
/// Two concurrent runs of the same job name race on that directory and on
/// their artifact names. No locking is done.
#[derive(Debug, Clone)]
pub struct Pipeline {
    scratch: PathBuf,
}

impl Pipeline {
    pub fn new(scratch: impl Into<PathBuf>) -> Self {
        Self {
            scratch: scratch.into(),
        }
    }

    pub fn scratch(&self) -> &Path {
        &self.scratch
    }

    /// rsync target for a sync-then-archive job
    pub fn staging_dir(&self, job: &JobDescriptor) -> PathBuf {
        self.scratch.join(&job.name)
    }

    /// Resolve and run each named job in order, collecting every outcome.
    pub async fn run(&self, catalog: &Catalog, names: &[String]) -> RunSummary {
        let mut summary = RunSummary::default();

        for name in names {
            info!("Looking up entry for --> {}", name);

            let result = match catalog.lookup(name) {
                Ok(job) => self.run_job(&job).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(report) => summary.succeeded.push(report),
                Err(e) => {
                    error!("Backup failed for '{}': {}", name, e);
                    summary.failed.push((name.clone(), e));
                }
            }
        }

        summary
    }

    /// Run a single job to completion.
    pub async fn run_job(&self, job: &JobDescriptor) -> Result<JobReport, JobError> {
        let span = info_span!("job", name = %job.name);
        async {
            match job.kind {
                JobKind::Archive => self.archive(job, &job.source, now()).await,
                JobKind::SyncThenArchive => {
                    let staging = self.sync(job).await?;
                    info!("Rsync completed, beginning tar");
                    self.archive(job, &staging.to_string_lossy(), now()).await
                }
            }
        }
        .instrument(span)
        .await
    }

    /// rsync the remote source into the job's staging directory.
    async fn sync(&self, job: &JobDescriptor) -> Result<PathBuf, JobError> {
        enter(Stage::Validating);
        validate_destination(&job.destination)?;

        enter(Stage::Building);
        let staging = self.staging_dir(job);
        let cmd = rsync_command(job, &staging);

        enter(Stage::Executing);
        info!("Beginning rsync using command {}", cmd);
        let out = executor::run(&cmd).await?;

        enter(Stage::Classifying);
        if classify_sync(&out).is_fatal() {
            return Err(failed("rsync", cmd.render(), out).into());
        }
        log_output(&out);

        Ok(staging)
    }

    /// Archive `source` into a scratch file, place it, prune old artifacts.
    async fn archive(
        &self,
        job: &JobDescriptor,
        source: &str,
        timestamp: NaiveDateTime,
    ) -> Result<JobReport, JobError> {
        enter(Stage::Validating);
        validate_source(job, source)?;
        validate_destination(&job.destination)?;

        enter(Stage::Building);
        let name = ArtifactName::new(&job.name, timestamp, job.compression);
        let (prefix, suffix) = name.temp_affixes();
        // Dropping `temp` deletes the scratch file on every early return
        let temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(&self.scratch)
            .map_err(|source| ExecError::Prepare {
                what: "temporary archive",
                source,
            })?
            .into_temp_path();
        if job.change_base_dir {
            info!("Changing directory to: {}", source);
        }
        let cmd = tar_command(job, source, &temp);

        enter(Stage::Executing);
        info!("Writing to temporary file: {}", temp.display());
        info!("Executing command: {}", cmd);
        let out = executor::run(&cmd).await?;

        enter(Stage::Classifying);
        let outcome = classify_archive(&out);
        match outcome {
            Outcome::Success => {
                log_output(&out);
                info!("Tar completed");
            }
            Outcome::Benign => {
                warn!(
                    "Tar warnings (files changed during backup, normal for live systems):\n{}",
                    out.output.trim_end()
                );
                info!("Tar completed with warnings (backup is valid)");
            }
            Outcome::Fatal => return Err(failed("tar", cmd.render(), out).into()),
        }

        enter(Stage::Placing);
        let artifact = job.destination.join(name.file_name());
        info!("Moving backup from temporary location to: {}", artifact.display());
        let dest = artifact.clone();
        let placement = tokio::task::spawn_blocking(move || place(temp, &dest))
            .await
            .map_err(|e| PlacementError::Task(e.to_string()))??;

        enter(Stage::Retaining);
        let destination = job.destination.clone();
        let job_name = job.name.clone();
        let (compression, retain) = (job.compression, job.retain);
        let retention =
            tokio::task::spawn_blocking(move || prune(&destination, &job_name, compression, retain))
                .await
                .unwrap_or_else(|e| {
                    warn!("Retention task failed: {}", e);
                    RetentionReport::default()
                });

        enter(Stage::Done);
        Ok(JobReport {
            name: job.name.clone(),
            artifact,
            placement,
            had_benign_warnings: outcome == Outcome::Benign,
            retention,
        })
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn failed(tool: &'static str, command: String, out: ExecOutput) -> ExecError {
    if !out.output.trim().is_empty() {
        error!("{} command output/stderr:\n{}", tool, out.output.trim_end());
    }
    ExecError::Failed {
        tool,
        command,
        exit_code: out.exit_code,
        output: out.output,
    }
}

fn log_output(out: &ExecOutput) {
    let text = out.output.trim_end();
    if !text.is_empty() {
        info!("{}", text);
    }
}

/// With `-C` the source must exist before tar is started.
fn validate_source(job: &JobDescriptor, source: &str) -> Result<(), JobError> {
    if job.change_base_dir && !Path::new(source).exists() {
        return Err(JobError::Validation(format!(
            "source directory does not exist: {}",
            source
        )));
    }
    Ok(())
}

/// The destination is external state, so it is checked before every run.
fn validate_destination(destination: &Path) -> Result<(), JobError> {
    let metadata = match std::fs::metadata(destination) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(JobError::Validation(format!(
                "destination directory does not exist: {}",
                destination.display()
            )))
        }
        Err(e) => {
            return Err(JobError::Validation(format!(
                "failed to check destination directory {}: {}",
                destination.display(),
                e
            )))
        }
    };

    if !metadata.is_dir() {
        return Err(JobError::Validation(format!(
            "destination path is not a directory: {}",
            destination.display()
        )));
    }

    nix::unistd::access(destination, AccessFlags::W_OK).map_err(|e| {
        JobError::Validation(format!(
            "destination directory is not writable: {} ({})",
            destination.display(),
            e
        ))
    })
}
